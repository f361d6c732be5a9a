//! FILENAME: core/pivot-engine/src/error.rs

use thiserror::Error;

/// A configuration the engine refuses to pivot with.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Field separator must not be empty")]
    EmptySeparator,

    #[error("Empty field name in {area} area")]
    EmptyFieldName { area: &'static str },

    #[error("Malformed configuration: {0}")]
    Malformed(String),
}

/// Why a calculated-field cell evaluated to the error sentinel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error(transparent)]
    Parse(#[from] formula::ParseError),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Field '{field}' (cell '{key}') is not numeric")]
    NonNumeric { field: String, key: String },

    #[error("Result is not a finite number")]
    NonFinite,
}
