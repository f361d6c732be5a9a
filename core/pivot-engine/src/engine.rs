//! FILENAME: core/pivot-engine/src/engine.rs
//! Pivot Engine - The calculation core that transforms records into a view.
//!
//! This module takes a PivotConfig (configuration) and a slice of records
//! and produces a PivotResult (rows, column schema and grand total).
//!
//! Algorithm:
//! 1. Resolve the distinct column values
//! 2. Plan every cell key once (totals, column cells, metas, calculated)
//! 3. Group records by their row-field values
//! 4. Build one row per group, then evaluate calculated fields on it
//! 5. Aggregate the grand total independently over all records
//! 6. Emit the column schema in its fixed order
//!
//! The engine never fails as a whole. Bad input degrades to a passthrough
//! of the records, and a failing formula only affects its own cell.

use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::calculated::{apply_calculated_fields, FormulaValidation};
use crate::columns::{record_in_column, resolve_column_values};
use crate::definition::PivotConfig;
use crate::grouping::{group_records, Group};
use crate::matrix::build_row;
use crate::plan::PivotPlan;
use crate::schema::generate_columns;
use crate::totals::build_grand_total;
use crate::value::{FieldValue, Record};
use crate::view::{DrillDownResult, PivotResult, PivotRow};

// ============================================================================
// PIVOT CALCULATOR
// ============================================================================

/// The main calculation engine for pivot transformations.
///
/// Construction resolves column values, plans the cell keys and groups the
/// records; `calculate` then builds the output. The calculator only borrows
/// its inputs.
pub struct PivotCalculator<'a> {
    records: &'a [Record],
    config: &'a PivotConfig,

    /// Every cell key and formula, decided once.
    plan: PivotPlan,

    /// Groups in order of first appearance.
    groups: Vec<Group<'a>>,
}

impl<'a> PivotCalculator<'a> {
    /// Creates a new calculator instance.
    pub fn new(records: &'a [Record], config: &'a PivotConfig) -> Self {
        let column_values = resolve_column_values(
            records,
            &config.column_fields,
            config.sort_columns,
            config.sort_direction,
        );
        let plan = PivotPlan::new(config, &column_values);
        let groups = group_records(records, &config.row_fields, &config.field_separator);

        log::debug!(
            target: "pivot",
            "{} records -> {} groups x {} column values",
            records.len(),
            groups.len(),
            column_values.len()
        );

        PivotCalculator {
            records,
            config,
            plan,
            groups,
        }
    }

    /// Executes the full calculation and returns the result.
    pub fn calculate(&self) -> PivotResult {
        let pivot_rows: Vec<PivotRow> = self.groups.iter().map(|g| self.group_row(g)).collect();
        let grand_total = build_grand_total(self.records, self.config, &self.plan, &pivot_rows);
        let pivot_columns = generate_columns(&self.plan);

        PivotResult {
            pivot_rows,
            pivot_columns,
            grand_total,
        }
    }

    fn group_row(&self, group: &Group<'a>) -> PivotRow {
        let dimensions = group
            .dimension_values
            .iter()
            .map(|(field, value)| (field.clone(), value.clone()));
        let mut row = build_row(&group.records, dimensions, &self.plan);
        apply_calculated_fields(&mut row, &self.plan.calculated, &self.plan.mapping);
        row
    }
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Transforms records into a pivot result.
/// This is the main entry point for the calculation engine.
///
/// A disabled config, or one that fails [`PivotConfig::validate`], yields the
/// records unchanged with an empty schema and no grand total.
pub fn transform(records: &[Record], config: &PivotConfig) -> PivotResult {
    if !config.is_active() {
        log::debug!(target: "pivot", "pivot disabled; passing {} records through", records.len());
        return PivotResult::passthrough(records);
    }
    if let Err(e) = config.validate() {
        log::warn!(target: "pivot", "invalid pivot config: {}; passing records through", e);
        return PivotResult::passthrough(records);
    }

    PivotCalculator::new(records, config).calculate()
}

/// Dynamically-typed entry point.
///
/// `records` must be a JSON array of objects; anything else yields an empty
/// passthrough. Array entries that are not objects are skipped. A missing or
/// malformed `config` yields a passthrough of the records.
pub fn transform_json(records: &JsonValue, config: Option<&JsonValue>) -> PivotResult {
    let Some(records) = records_from_json(records) else {
        log::warn!(target: "pivot", "records are not an array; nothing to transform");
        return PivotResult::default();
    };

    let Some(config) = config else {
        log::warn!(target: "pivot", "no pivot config; passing records through");
        return PivotResult::passthrough(&records);
    };

    match PivotConfig::from_json(config) {
        Ok(config) => transform(&records, &config),
        Err(e) => {
            log::warn!(target: "pivot", "{}; passing records through", e);
            PivotResult::passthrough(&records)
        }
    }
}

/// Converts a JSON array of objects into records. Returns `None` when the
/// value is not an array. Nested arrays and objects read as null.
pub fn records_from_json(value: &JsonValue) -> Option<Vec<Record>> {
    let items = value.as_array()?;
    let mut records = Vec::with_capacity(items.len());

    for (index, item) in items.iter().enumerate() {
        match item.as_object() {
            Some(object) => records.push(
                object
                    .iter()
                    .map(|(field, v)| (field.clone(), field_from_json(v)))
                    .collect(),
            ),
            None => log::warn!(target: "pivot", "record {} is not an object; skipped", index),
        }
    }

    Some(records)
}

fn field_from_json(value: &JsonValue) -> FieldValue {
    match value {
        JsonValue::Bool(b) => FieldValue::Bool(*b),
        JsonValue::Number(n) => n.as_f64().map(FieldValue::Number).unwrap_or_default(),
        JsonValue::String(s) => FieldValue::Text(s.clone()),
        JsonValue::Null | JsonValue::Array(_) | JsonValue::Object(_) => FieldValue::Null,
    }
}

/// Performs a drill-down operation to get the source records behind a cell.
///
/// `group` is a row's group key (`"all"` when no row fields are
/// configured). With a `column_value`, only records in that column (by the
/// same OR rule the column cells use) are returned.
pub fn drill_down(
    records: &[Record],
    config: &PivotConfig,
    group: &str,
    column_value: Option<&FieldValue>,
    max_records: usize,
) -> DrillDownResult {
    let mut result = DrillDownResult::new(group, column_value.cloned(), max_records);

    let groups = group_records(records, &config.row_fields, &config.field_separator);
    let Some(target) = groups.iter().find(|g| g.key == group) else {
        log::debug!(target: "pivot", "drill-down: no group '{}'", group);
        return result;
    };

    let mut count = 0;
    for (&index, record) in target.indices.iter().zip(&target.records) {
        let in_column = column_value
            .map(|value| record_in_column(record, &config.column_fields, value))
            .unwrap_or(true);

        if in_column {
            count += 1;
            if result.record_indices.len() < max_records {
                result.record_indices.push(index);
            }
        }
    }

    result.total_count = count;
    result.is_truncated = count > max_records;
    result
}

/// Validation outcome of one configured calculated field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculatedFieldCheck {
    pub key: String,
    pub name: String,
    pub formula: String,
    #[serde(flatten)]
    pub validation: FormulaValidation,
}

/// Checks every calculated field against the cells `config` would produce
/// for `records` (column cells depend on the column values present).
pub fn validate_calculated_fields(config: &PivotConfig, records: &[Record]) -> Vec<CalculatedFieldCheck> {
    let column_values = resolve_column_values(
        records,
        &config.column_fields,
        config.sort_columns,
        config.sort_direction,
    );
    PivotPlan::new(config, &column_values)
        .calculated
        .into_iter()
        .map(|cell| CalculatedFieldCheck {
            key: cell.key,
            name: cell.spec.display_name().to_string(),
            formula: cell.spec.formula,
            validation: cell.validation,
        })
        .collect()
}
