//! FILENAME: core/pivot-engine/src/lib.rs
//! Pivot transformation engine.
//!
//! Takes flat records and a declarative configuration and produces pivoted
//! rows, an ordered column schema and an independently computed grand total.
//! The engine is pure and synchronous: it performs no I/O and never mutates
//! its inputs, so it can be called from any thread.
//!
//! Layers:
//! - `definition`: Serializable configuration (what the pivot IS)
//! - `plan`: Every cell key and formula, decided once per transform
//! - `view`: Renderable output for the consumer (WHAT we display)
//! - `engine`: Calculation entry points (HOW we calculate)

pub mod aggregation;
pub mod calculated;
pub mod columns;
pub mod definition;
pub mod engine;
pub mod error;
pub mod grouping;
pub mod matrix;
pub mod number_format;
pub mod plan;
pub mod schema;
pub mod totals;
pub mod value;
pub mod view;

pub use aggregation::aggregate;
pub use calculated::{
    evaluate_formula, format_calculated_value, format_row_calculated, validate_formula,
    FormulaValidation,
};
pub use columns::resolve_column_values;
pub use definition::*;
pub use engine::{
    drill_down, records_from_json, transform, transform_json, validate_calculated_fields,
    CalculatedFieldCheck, PivotCalculator,
};
pub use error::{ConfigError, FormulaError};
pub use grouping::{group_records, Group, ALL_GROUP_KEY};
pub use plan::{AvailableField, FieldMapping, PivotPlan};
pub use value::{FieldValue, Record};
pub use view::*;
