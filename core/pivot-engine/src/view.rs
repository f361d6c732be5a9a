//! FILENAME: core/pivot-engine/src/view.rs
//! Pivot View - Renderable output for the consumer.
//!
//! A renderer draws `pivot_rows` using `pivot_columns` as the column schema,
//! optionally pinning `grand_total` below the table. An export utility reads
//! the same shape.

use indexmap::IndexMap;
use serde::ser::{Serialize, Serializer};
use serde::Deserialize;

use crate::definition::{AggregationType, CalculatedFormat};
use crate::value::{FieldValue, Record};

/// Literal written into a calculated cell whose formula could not be evaluated.
pub const ERROR_SENTINEL: &str = "Error";

/// Marker placed in the row-dimension cells of the grand total row.
pub const GRAND_TOTAL_LABEL: &str = "Grand Total";

// ============================================================================
// CELLS AND ROWS
// ============================================================================

/// Describes a calculated field for the renderer; stored under `<key>_meta`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct CalculatedFieldMeta {
    pub name: String,
    pub formula: String,
    pub format: CalculatedFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// One entry of a pivot row.
#[derive(Debug, Clone, PartialEq)]
pub enum PivotCell {
    Value(FieldValue),
    /// A calculated field that failed; serializes as `"Error"`.
    Error,
    Meta(CalculatedFieldMeta),
}

impl PivotCell {
    pub fn number(n: f64) -> Self {
        PivotCell::Value(FieldValue::Number(n))
    }

    pub fn as_value(&self) -> Option<&FieldValue> {
        match self {
            PivotCell::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        self.as_value().and_then(FieldValue::as_number)
    }
}

impl From<FieldValue> for PivotCell {
    fn from(value: FieldValue) -> Self {
        PivotCell::Value(value)
    }
}

impl Serialize for PivotCell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PivotCell::Value(v) => v.serialize(serializer),
            PivotCell::Error => serializer.serialize_str(ERROR_SENTINEL),
            PivotCell::Meta(m) => m.serialize(serializer),
        }
    }
}

/// One output row: ordered cell key -> cell.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
#[serde(transparent)]
pub struct PivotRow {
    cells: IndexMap<String, PivotCell>,
}

impl PivotRow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies a source record into a row unchanged (passthrough output).
    pub fn from_record(record: &Record) -> Self {
        PivotRow {
            cells: record
                .iter()
                .map(|(k, v)| (k.clone(), PivotCell::Value(v.clone())))
                .collect(),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, cell: impl Into<PivotCell>) {
        self.cells.insert(key.into(), cell.into());
    }

    /// Removes a cell, keeping the order of the remaining cells.
    pub fn remove(&mut self, key: &str) -> Option<PivotCell> {
        self.cells.shift_remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&PivotCell> {
        self.cells.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&FieldValue> {
        self.get(key).and_then(PivotCell::as_value)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(PivotCell::as_number)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.cells.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.cells.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PivotCell)> {
        self.cells.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ============================================================================
// COLUMN SCHEMA
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Number,
}

/// What a column holds, with the metadata specific to that role.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ColumnRole {
    RowDimension {
        field: String,
    },
    /// A plain value cell (`column_value` is None) or a column-value cell.
    Value {
        field: String,
        aggregation: AggregationType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        column_value: Option<FieldValue>,
    },
    Total {
        field: String,
        aggregation: AggregationType,
    },
    MetaAggregation {
        field: String,
        source_aggregation: AggregationType,
        meta_aggregation: AggregationType,
    },
    Calculated {
        id: String,
        formula: String,
        format: CalculatedFormat,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

/// One entry of the column schema.
#[derive(Debug, Clone, PartialEq, serde::Serialize, Deserialize)]
pub struct PivotColumn {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    #[serde(flatten)]
    pub role: ColumnRole,
}

// ============================================================================
// RESULT
// ============================================================================

/// The output of one transformation.
#[derive(Debug, Clone, PartialEq, Default, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotResult {
    pub pivot_rows: Vec<PivotRow>,
    pub pivot_columns: Vec<PivotColumn>,
    /// Never part of `pivot_rows`.
    pub grand_total: Option<PivotRow>,
}

impl PivotResult {
    /// Records unchanged, no schema, no grand total.
    pub fn passthrough(records: &[Record]) -> Self {
        PivotResult {
            pivot_rows: records.iter().map(PivotRow::from_record).collect(),
            pivot_columns: Vec::new(),
            grand_total: None,
        }
    }
}

// ============================================================================
// DRILL DOWN
// ============================================================================

/// Source records behind one pivot cell.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrillDownResult {
    pub group_key: String,
    pub column_value: Option<FieldValue>,
    /// Positions in the input record slice, in input order.
    pub record_indices: Vec<usize>,
    pub total_count: usize,
    pub is_truncated: bool,
    pub max_records: usize,
}

impl DrillDownResult {
    pub fn new(group_key: impl Into<String>, column_value: Option<FieldValue>, max_records: usize) -> Self {
        DrillDownResult {
            group_key: group_key.into(),
            column_value,
            record_indices: Vec::new(),
            total_count: 0,
            is_truncated: false,
            max_records,
        }
    }
}
