//! FILENAME: core/formula/src/lexer.rs
//! PURPOSE: Scans a raw formula string and produces a stream of Tokens.
//! CONTEXT: This is the first stage of the parsing pipeline. It handles
//! whitespace skipping, number parsing and the three identifier spellings
//! used to reference pivot cells.
//!
//! SUPPORTED OPERATORS:
//! - Single char: + - * / ( )
//! - Quoted identifiers: 'North America_amt_sum' ('' escapes a quote)
//! - Bracketed identifiers: [Sales Total]

use crate::token::Token;
use std::iter::Peekable;
use std::str::Chars;

pub struct Lexer<'a> {
    input: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input: input.chars().peekable(),
        }
    }

    /// Advances the lexer and returns the next token.
    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        match self.input.next() {
            Some('+') => Token::Plus,
            Some('-') => Token::Minus,
            Some('*') => Token::Asterisk,
            Some('/') => Token::Slash,
            Some('(') => Token::LParen,
            Some(')') => Token::RParen,

            Some('\'') => self.read_quoted_identifier(),
            Some('[') => self.read_bracketed_identifier(),

            // Numbers (starts with digit or dot). Column values such as
            // "2024" make keys like 2024_amt_sum, so a digit run followed by
            // identifier characters is read as an identifier.
            Some(ch) if ch.is_ascii_digit() || ch == '.' => self.read_number(ch),

            Some(ch) if is_identifier_start(ch) => self.read_identifier(String::from(ch)),

            None => Token::EOF,

            Some(ch) => Token::Illegal(ch),
        }
    }

    /// Collects every token up to and including EOF.
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token();
            let done = token == Token::EOF;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(&ch) = self.input.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.input.next();
        }
    }

    /// Reads a quoted identifier: 'Field Name'
    fn read_quoted_identifier(&mut self) -> Token {
        let mut result = String::new();
        while let Some(&ch) = self.input.peek() {
            if ch == '\'' {
                self.input.next();
                if self.input.peek() == Some(&'\'') {
                    // Escaped quote
                    result.push('\'');
                    self.input.next();
                } else {
                    return Token::Identifier(result);
                }
            } else {
                result.push(ch);
                self.input.next();
            }
        }
        Token::Unterminated(result)
    }

    /// Reads a bracketed identifier: [Field Name]
    fn read_bracketed_identifier(&mut self) -> Token {
        let mut result = String::new();
        while let Some(ch) = self.input.next() {
            if ch == ']' {
                return Token::Identifier(result);
            }
            result.push(ch);
        }
        Token::Unterminated(result)
    }

    fn read_number(&mut self, first_char: char) -> Token {
        let mut number_str = String::from(first_char);
        let mut has_dot = first_char == '.';

        while let Some(&ch) = self.input.peek() {
            if ch.is_ascii_digit() {
                number_str.push(ch);
                self.input.next();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                number_str.push(ch);
                self.input.next();
            } else {
                break;
            }
        }

        if !has_dot {
            if let Some(&ch) = self.input.peek() {
                if is_identifier_start(ch) {
                    return self.read_identifier(number_str);
                }
            }
        }

        match number_str.parse::<f64>() {
            Ok(n) => Token::Number(n),
            // e.g. a lone "."
            Err(_) => Token::Illegal(first_char),
        }
    }

    fn read_identifier(&mut self, mut ident: String) -> Token {
        while let Some(&ch) = self.input.peek() {
            if is_identifier_continue(ch) {
                ident.push(ch);
                self.input.next();
            } else {
                break;
            }
        }
        // Field names are case-sensitive, so no normalization here.
        Token::Identifier(ident)
    }
}

fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_identifier_continue(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '.'
}
