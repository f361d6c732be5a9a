//! FILENAME: core/pivot-engine/src/columns.rs
//! Column value resolver.
//!
//! With more than one column field, values from all of them are unioned
//! into ONE list of column values, and a record belongs to a column value
//! when ANY of its column fields equals it. This OR reading is the
//! established contract; do not switch it to AND without confirming intent.

use std::cmp::Ordering;

use rustc_hash::FxHashSet;

use crate::definition::SortDirection;
use crate::value::{field_value, FieldValue, Record};

/// Distinct non-null values of `column_fields` across `records`.
///
/// Values are collected field by field in first-seen order and deduplicated
/// by typed identity. When `sort` is set they are ordered by their string
/// form. The sort is stable, so values with equal strings keep their order.
pub fn resolve_column_values(
    records: &[Record],
    column_fields: &[String],
    sort: bool,
    direction: SortDirection,
) -> Vec<FieldValue> {
    let mut seen = FxHashSet::default();
    let mut values = Vec::new();

    for field in column_fields {
        for record in records {
            let value = field_value(record, field);
            if value.is_null() {
                continue;
            }
            if seen.insert(value.key()) {
                values.push(value.clone());
            }
        }
    }

    if sort {
        values.sort_by(|a, b| {
            let ord = compare_as_strings(a, b);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });
    }

    values
}

fn compare_as_strings(a: &FieldValue, b: &FieldValue) -> Ordering {
    a.to_key_string().cmp(&b.to_key_string())
}

/// True when any of the record's column fields equals `column_value`.
pub fn record_in_column(record: &Record, column_fields: &[String], column_value: &FieldValue) -> bool {
    column_fields
        .iter()
        .any(|f| field_value(record, f) == column_value)
}
