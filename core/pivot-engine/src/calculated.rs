//! FILENAME: core/pivot-engine/src/calculated.rs
//! Calculated fields: formulas over the cells of one pivot row.
//!
//! Formulas are parsed by the `formula` crate and evaluated here by walking
//! the AST. Identifiers are resolved through the plan's [`FieldMapping`].
//! Any failure (parse error, unknown field, division by zero, non-numeric
//! operand) turns that single cell into the `"Error"` sentinel.

use formula::{BinaryOperator, Expression, UnaryOperator};
use indexmap::IndexMap;
use serde::Serialize;

use crate::definition::{AggregationType, CalculatedFieldSpec, CalculatedFormat};
use crate::error::FormulaError;
use crate::number_format::{format_currency, format_locale_number, format_percentage};
use crate::plan::{CalculatedCell, FieldMapping};
use crate::value::FieldValue;
use crate::view::{CalculatedFieldMeta, ColumnRole, PivotCell, PivotColumn, PivotRow, ERROR_SENTINEL};

const CALC_PREFIX: &str = "calc_";

// ============================================================================
// VALIDATION
// ============================================================================

/// Outcome of checking a formula against the available fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormulaValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
}

impl FormulaValidation {
    fn from_errors(errors: Vec<String>) -> Self {
        FormulaValidation {
            is_valid: errors.is_empty(),
            errors,
        }
    }
}

/// Parses and checks `formula`: it must parse, and every identifier must
/// resolve to a materialized cell.
pub fn validate_formula(formula: &str, mapping: &FieldMapping) -> FormulaValidation {
    validate_expression(formula, mapping).1
}

/// Like [`validate_formula`], also returning the parsed expression (or the
/// first error) so it can be evaluated for every row without reparsing.
pub fn validate_expression(
    formula: &str,
    mapping: &FieldMapping,
) -> (Result<Expression, FormulaError>, FormulaValidation) {
    let expression = match formula::parse(formula) {
        Ok(expression) => expression,
        Err(e) => {
            let validation = FormulaValidation::from_errors(vec![e.to_string()]);
            return (Err(FormulaError::Parse(e)), validation);
        }
    };

    let unknown: Vec<&str> = expression
        .identifiers()
        .into_iter()
        .filter(|ident| mapping.resolve(ident).is_none())
        .collect();

    if let Some(first) = unknown.first() {
        let error = FormulaError::UnknownField(first.to_string());
        let errors = unknown
            .iter()
            .map(|ident| FormulaError::UnknownField(ident.to_string()).to_string())
            .collect();
        return (Err(error), FormulaValidation::from_errors(errors));
    }

    (Ok(expression), FormulaValidation::from_errors(Vec::new()))
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Evaluates `formula` against one row. Never fails: errors become
/// [`PivotCell::Error`].
pub fn evaluate_formula(formula: &str, row: &PivotRow, mapping: &FieldMapping) -> PivotCell {
    match validate_expression(formula, mapping).0 {
        Ok(expression) => to_cell(evaluate_expression(&expression, row, mapping)),
        Err(_) => PivotCell::Error,
    }
}

/// Walks a parsed expression against one row.
pub fn evaluate_expression(
    expression: &Expression,
    row: &PivotRow,
    mapping: &FieldMapping,
) -> Result<f64, FormulaError> {
    let value = eval(expression, row, mapping)?;
    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::NonFinite)
    }
}

fn eval(expression: &Expression, row: &PivotRow, mapping: &FieldMapping) -> Result<f64, FormulaError> {
    match expression {
        Expression::Number(n) => Ok(*n),
        Expression::Identifier(ident) => {
            let field = mapping
                .resolve(ident)
                .ok_or_else(|| FormulaError::UnknownField(ident.clone()))?;
            cell_number(row.get(&field.key), ident, &field.key)
        }
        Expression::UnaryOp { op, operand } => {
            let value = eval(operand, row, mapping)?;
            match op {
                UnaryOperator::Negate => Ok(-value),
            }
        }
        Expression::BinaryOp { left, op, right } => {
            let l = eval(left, row, mapping)?;
            let r = eval(right, row, mapping)?;
            match op {
                BinaryOperator::Add => Ok(l + r),
                BinaryOperator::Subtract => Ok(l - r),
                BinaryOperator::Multiply => Ok(l * r),
                BinaryOperator::Divide => {
                    if r == 0.0 {
                        Err(FormulaError::DivisionByZero)
                    } else {
                        Ok(l / r)
                    }
                }
            }
        }
    }
}

/// Numeric reading of a referenced cell. Empty cells (null, or the `""`
/// an empty First/Last yields) read as 0; numeric text is parsed.
fn cell_number(cell: Option<&PivotCell>, ident: &str, key: &str) -> Result<f64, FormulaError> {
    let non_numeric = || FormulaError::NonNumeric {
        field: ident.to_string(),
        key: key.to_string(),
    };
    match cell {
        None => Ok(0.0),
        Some(PivotCell::Value(value)) => match value {
            FieldValue::Null => Ok(0.0),
            FieldValue::Number(n) if n.is_nan() => Err(non_numeric()),
            FieldValue::Number(n) => Ok(*n),
            FieldValue::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            FieldValue::Text(s) if s.trim().is_empty() => Ok(0.0),
            FieldValue::Text(s) => s.trim().parse::<f64>().map_err(|_| non_numeric()),
        },
        Some(PivotCell::Error) | Some(PivotCell::Meta(_)) => Err(non_numeric()),
    }
}

fn to_cell(result: Result<f64, FormulaError>) -> PivotCell {
    match result {
        Ok(n) => PivotCell::number(n),
        Err(_) => PivotCell::Error,
    }
}

// ============================================================================
// KEYS AND ROW APPLICATION
// ============================================================================

/// `calc_<slug>` where the slug comes from the id, or the name when the id
/// is blank. An id that already starts with `calc_` is not prefixed again.
pub fn calculated_key(spec: &CalculatedFieldSpec) -> String {
    let source = if spec.id.trim().is_empty() { &spec.name } else { &spec.id };
    let slug = slugify(source);
    if slug.starts_with(CALC_PREFIX) {
        slug
    } else {
        format!("{}{}", CALC_PREFIX, slug)
    }
}

/// Lowercases and replaces each run of characters outside `[a-z0-9_]`
/// with a single underscore.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_gap = false;
    for ch in text.trim().chars().flat_map(char::to_lowercase) {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            if pending_gap && !slug.is_empty() {
                slug.push('_');
            }
            pending_gap = false;
            slug.push(ch);
        } else {
            pending_gap = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("field");
    }
    slug
}

pub(crate) fn meta_cell(spec: &CalculatedFieldSpec) -> PivotCell {
    PivotCell::Meta(CalculatedFieldMeta {
        name: spec.display_name().to_string(),
        formula: spec.formula.clone(),
        format: spec.format,
        description: spec.description.clone(),
    })
}

/// Evaluates every planned calculated field against `row` and appends the
/// result and its `_meta` entry.
pub(crate) fn apply_calculated_fields(row: &mut PivotRow, cells: &[CalculatedCell], mapping: &FieldMapping) {
    for cell in cells {
        let value = match &cell.expression {
            Ok(expression) => to_cell(evaluate_expression(expression, row, mapping)),
            Err(_) => PivotCell::Error,
        };
        row.insert(cell.key.clone(), value);
        row.insert(cell.meta_key.clone(), meta_cell(&cell.spec));
    }
}

/// Grand-total value of a calculated field: the sum of the per-group values.
/// Error cells count as 0, as any non-numeric entry does under Sum.
pub(crate) fn sum_calculated(rows: &[PivotRow], key: &str) -> PivotCell {
    let values: Vec<FieldValue> = rows
        .iter()
        .map(|row| row.value(key).cloned().unwrap_or_default())
        .collect();
    PivotCell::Value(AggregationType::Sum.apply(&values))
}

// ============================================================================
// FORMATTING
// ============================================================================

/// Renders a calculated cell for display.
///
/// - `Number`:   grouped, up to three decimals (`1,234.568`)
/// - `Currency`: dollar sign, grouped, two decimals (`$1,234.57`)
/// - `Percent`:  multiplied by 100, two decimals (`12.50%`)
///
/// The error sentinel always renders as `Error`. Non-numeric cells render
/// their plain text.
pub fn format_calculated_value(cell: &PivotCell, format: CalculatedFormat) -> String {
    let value = match cell {
        PivotCell::Error => return ERROR_SENTINEL.to_string(),
        PivotCell::Meta(meta) => return meta.name.clone(),
        PivotCell::Value(value) => value,
    };
    let Some(n) = value.as_number() else {
        return value.to_key_string();
    };
    match format {
        CalculatedFormat::Number => format_locale_number(n),
        CalculatedFormat::Currency => format_currency(n, 2, "$"),
        CalculatedFormat::Percent => format_percentage(n, 2),
    }
}

/// Display strings for every calculated cell of `row`, keyed by cell key,
/// using the format recorded in the column schema.
pub fn format_row_calculated(row: &PivotRow, columns: &[PivotColumn]) -> IndexMap<String, String> {
    columns
        .iter()
        .filter_map(|column| match &column.role {
            ColumnRole::Calculated { format, .. } => row
                .get(&column.key)
                .map(|cell| (column.key.clone(), format_calculated_value(cell, *format))),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{PivotConfig, ValueSpec};
    use crate::plan::PivotPlan;

    fn mapping() -> FieldMapping {
        let mut config = PivotConfig::new();
        config.row_fields.push("region".to_string());
        config.column_fields.push("q".to_string());
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.values.push(ValueSpec::new("qty", AggregationType::Sum));
        PivotPlan::new(&config, &[FieldValue::from("Q1"), FieldValue::from("North America")]).mapping
    }

    fn row() -> PivotRow {
        let mut row = PivotRow::new();
        row.insert("region", FieldValue::from("A"));
        row.insert("amt_total", PivotCell::number(30.0));
        row.insert("qty_total", PivotCell::number(4.0));
        row.insert("Q1_amt_sum", PivotCell::number(10.0));
        row.insert("Q1_qty_sum", PivotCell::number(0.0));
        row.insert("North America_amt_sum", PivotCell::number(20.0));
        row.insert("North America_qty_sum", FieldValue::text("n/a"));
        row
    }

    #[test]
    fn validate_reports_unknown_fields() {
        let m = mapping();
        assert!(validate_formula("amt_total / qty_total", &m).is_valid);

        let v = validate_formula("amt_total / bogus + other", &m);
        assert!(!v.is_valid);
        assert_eq!(v.errors, vec!["Unknown field: bogus", "Unknown field: other"]);

        let v = validate_formula("amt_total +", &m);
        assert!(!v.is_valid);
        assert_eq!(v.errors.len(), 1);
    }

    #[test]
    fn evaluates_arithmetic_over_cells() {
        let m = mapping();
        let r = row();
        assert_eq!(evaluate_formula("amt_total / qty_total", &r, &m), PivotCell::number(7.5));
        assert_eq!(evaluate_formula("(amt + 2) * -1", &r, &m), PivotCell::number(-32.0));
        assert_eq!(evaluate_formula("Q1_amt_sum + 'North America_amt_sum'", &r, &m), PivotCell::number(30.0));
        assert_eq!(evaluate_formula("[North America_amt_sum] / 4", &r, &m), PivotCell::number(5.0));
    }

    #[test]
    fn failures_become_the_error_sentinel() {
        let m = mapping();
        let r = row();
        assert_eq!(evaluate_formula("amt_total / Q1_qty_sum", &r, &m), PivotCell::Error);
        assert_eq!(evaluate_formula("amt_total / 0", &r, &m), PivotCell::Error);
        assert_eq!(evaluate_formula("nope * 2", &r, &m), PivotCell::Error);
        assert_eq!(evaluate_formula("'North America_qty_sum' + 1", &r, &m), PivotCell::Error);
        assert_eq!(evaluate_formula("((", &r, &m), PivotCell::Error);
    }

    #[test]
    fn non_finite_results_are_errors() {
        let m = mapping();
        let r = row();
        let huge = format!("{} * {}", "9".repeat(300), "9".repeat(300));
        assert_eq!(evaluate_formula(&huge, &r, &m), PivotCell::Error);
    }

    #[test]
    fn calculated_keys_are_slugged_once() {
        let spec = CalculatedFieldSpec::new("Profit Margin %", "x", "1");
        assert_eq!(calculated_key(&spec), "calc_profit_margin");

        let spec = CalculatedFieldSpec::new("calc_ratio", "x", "1");
        assert_eq!(calculated_key(&spec), "calc_ratio");

        let spec = CalculatedFieldSpec::new("", "Avg Price", "1");
        assert_eq!(calculated_key(&spec), "calc_avg_price");

        let spec = CalculatedFieldSpec::new("", "%%", "1");
        assert_eq!(calculated_key(&spec), "calc_field");
    }

    #[test]
    fn formats_by_kind() {
        let n = PivotCell::number(1234.5678);
        assert_eq!(format_calculated_value(&n, CalculatedFormat::Number), "1,234.568");
        assert_eq!(format_calculated_value(&n, CalculatedFormat::Currency), "$1,234.57");
        assert_eq!(format_calculated_value(&PivotCell::number(0.125), CalculatedFormat::Percent), "12.50%");
        assert_eq!(format_calculated_value(&PivotCell::number(-5.0), CalculatedFormat::Currency), "-$5.00");
    }

    #[test]
    fn error_sentinel_is_never_reformatted() {
        for format in [CalculatedFormat::Number, CalculatedFormat::Currency, CalculatedFormat::Percent] {
            assert_eq!(format_calculated_value(&PivotCell::Error, format), "Error");
        }
    }

    #[test]
    fn sum_calculated_treats_errors_as_zero() {
        let mut a = PivotRow::new();
        a.insert("calc_x", PivotCell::number(2.5));
        let mut b = PivotRow::new();
        b.insert("calc_x", PivotCell::Error);
        let mut c = PivotRow::new();
        c.insert("calc_x", PivotCell::number(1.5));

        assert_eq!(sum_calculated(&[a, b, c], "calc_x"), PivotCell::number(4.0));
    }

    #[test]
    fn formats_calculated_cells_of_a_row() {
        let mut config = PivotConfig::new();
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.calculated_fields.push(
            CalculatedFieldSpec::new("fee", "Fee", "amt_total * 0.1").with_format(CalculatedFormat::Currency),
        );
        config.calculated_fields.push(CalculatedFieldSpec::new("broken", "Broken", "amt_total / 0"));
        let plan = PivotPlan::new(&config, &[]);
        let columns = crate::schema::generate_columns(&plan);

        let mut r = PivotRow::new();
        r.insert("amt_total", PivotCell::number(12345.0));
        apply_calculated_fields(&mut r, &plan.calculated, &plan.mapping);

        let formatted = format_row_calculated(&r, &columns);
        assert_eq!(formatted.get("calc_fee").map(String::as_str), Some("$1,234.50"));
        assert_eq!(formatted.get("calc_broken").map(String::as_str), Some("Error"));
        assert!(!formatted.contains_key("amt_total"));
    }
}
