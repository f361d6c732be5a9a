//! FILENAME: core/formula/src/lib.rs
//! PURPOSE: Library root for the calculated-field formula parser.
//! CONTEXT: This module exposes the lexer, parser, and AST components
//! needed to convert formula strings into evaluatable expression trees.
//!
//! PIPELINE: Formula String --> Lexer --> Tokens --> Parser --> AST --> Evaluator
//!
//! SUPPORTED FEATURES:
//! - Arithmetic: +, -, *, /
//! - Unary negation: -amt_total
//! - Parentheses for grouping
//! - Field references: plain, 'quoted' or [bracketed]
//!
//! Evaluation is not part of this crate; the pivot engine resolves
//! identifiers against a pivot row and walks the tree itself.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;


pub use ast::{BinaryOperator, Expression, UnaryOperator};
pub use lexer::Lexer;
pub use parser::{parse, ParseError, ParseResult, Parser};
pub use token::Token;
