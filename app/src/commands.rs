//! FILENAME: app/src/commands.rs
//! PURPOSE: Command handlers wiring persistence and the pivot engine.
//! CONTEXT: Handlers return serializable outputs; `run` decides where they go.

use std::path::Path;
use std::time::Instant;

use indexmap::IndexMap;
use pivot_engine::{
    drill_down, format_row_calculated, transform, validate_calculated_fields,
    CalculatedFieldCheck, DrillDownResult, FieldValue, PivotConfig, PivotResult, Record,
};
use serde::Serialize;

use crate::cli::InputArgs;
use crate::{log_debug, log_info, log_perf};

// ============================================================================
// OUTPUT TYPES
// ============================================================================

/// Display strings of calculated cells, one map per pivot row.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedCalculated {
    pub rows: Vec<IndexMap<String, String>>,
    pub grand_total: Option<IndexMap<String, String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformOutput {
    #[serde(flatten)]
    pub result: PivotResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_calculated: Option<FormattedCalculated>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_error: Option<String>,
    pub calculated_fields: Vec<CalculatedFieldCheck>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillDownOutput {
    #[serde(flatten)]
    pub result: DrillDownResult,
    pub records: Vec<Record>,
}

// ============================================================================
// COMMANDS
// ============================================================================

fn load_input(input: &InputArgs) -> Result<(Vec<Record>, PivotConfig), String> {
    let records = persistence::load_records(&input.records)
        .map_err(|e| format!("{}: {}", input.records.display(), e))?;
    let config = persistence::load_config(&input.config)
        .map_err(|e| format!("{}: {}", input.config.display(), e))?;
    log_debug!(
        "CMD",
        "loaded {} records from {}",
        records.len(),
        input.records.display()
    );
    Ok((records, config))
}

/// Runs a transform.
pub fn transform_command(input: &InputArgs, format_calculated: bool) -> Result<TransformOutput, String> {
    let (records, config) = load_input(input)?;

    let start = Instant::now();
    let result = transform(&records, &config);
    log_perf!("PIVOT", "transform", start);
    log_info!(
        "PIVOT",
        "transform rows={} columns={} grand_total={}",
        result.pivot_rows.len(),
        result.pivot_columns.len(),
        result.grand_total.is_some()
    );

    let formatted_calculated = format_calculated.then(|| FormattedCalculated {
        rows: result
            .pivot_rows
            .iter()
            .map(|row| format_row_calculated(row, &result.pivot_columns))
            .collect(),
        grand_total: result
            .grand_total
            .as_ref()
            .map(|row| format_row_calculated(row, &result.pivot_columns)),
    });

    Ok(TransformOutput {
        result,
        formatted_calculated,
    })
}

/// Checks a configuration and, with `records`, its formulas against the
/// column values those records produce. A valid config is written to
/// `normalize` when given.
pub fn validate_command(
    config_path: &Path,
    records_path: Option<&Path>,
    normalize: Option<&Path>,
) -> Result<ValidationReport, String> {
    let config = persistence::load_config(config_path)
        .map_err(|e| format!("{}: {}", config_path.display(), e))?;
    let records = match records_path {
        Some(path) => persistence::load_records(path).map_err(|e| format!("{}: {}", path.display(), e))?,
        None => Vec::new(),
    };

    let config_error = config.validate().err().map(|e| e.to_string());
    let calculated_fields = validate_calculated_fields(&config, &records);
    let valid = config_error.is_none() && calculated_fields.iter().all(|c| c.validation.is_valid);

    log_info!(
        "CMD",
        "validate config={} calculated_fields={} valid={}",
        config_path.display(),
        calculated_fields.len(),
        valid
    );

    if let (true, Some(path)) = (valid, normalize) {
        persistence::save_config(&config, path).map_err(|e| format!("{}: {}", path.display(), e))?;
        log_info!("CMD", "saved normalized config to {}", path.display());
    }

    Ok(ValidationReport {
        valid,
        config_error,
        calculated_fields,
    })
}

/// Lists the records behind the cell at `group` (and `column`, if given).
pub fn drill_down_command(
    input: &InputArgs,
    group: &str,
    column: Option<&str>,
    max_records: usize,
) -> Result<DrillDownOutput, String> {
    let (records, config) = load_input(input)?;
    let column_value = column.map(parse_column_value);

    let result = drill_down(&records, &config, group, column_value.as_ref(), max_records);
    log_info!(
        "PIVOT",
        "drill_down group={} total={} truncated={}",
        group,
        result.total_count,
        result.is_truncated
    );

    let selected = result
        .record_indices
        .iter()
        .filter_map(|&i| records.get(i).cloned())
        .collect();

    Ok(DrillDownOutput {
        result,
        records: selected,
    })
}

/// Reads a column value typed on the command line: JSON scalars keep their
/// type (`2024` is a number), anything else is text.
pub fn parse_column_value(raw: &str) -> FieldValue {
    serde_json::from_str::<FieldValue>(raw).unwrap_or_else(|_| FieldValue::text(raw))
}
