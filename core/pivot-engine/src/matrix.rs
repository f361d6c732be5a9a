//! FILENAME: core/pivot-engine/src/matrix.rs
//! Pivot matrix builder: turns a set of records into one pivot row.
//!
//! The same builder serves group rows and the grand total row; only the
//! record set and the dimension cells differ. Calculated fields are applied
//! afterwards by the caller, since group rows and the grand total derive them
//! differently.

use crate::columns::record_in_column;
use crate::plan::{PivotPlan, ValueCell};
use crate::value::{field_value, FieldValue, Record};
use crate::view::PivotRow;

/// Builds the value part of a row over `records`.
///
/// Cell order: dimensions, row totals, column cells (or plain cells),
/// meta-aggregations.
pub fn build_row<I>(records: &[&Record], dimensions: I, plan: &PivotPlan) -> PivotRow
where
    I: IntoIterator<Item = (String, FieldValue)>,
{
    let mut row = PivotRow::new();

    for (field, value) in dimensions {
        row.insert(field, value);
    }

    for cell in &plan.totals {
        row.insert(cell.key.clone(), aggregate_cell(records.iter().copied(), cell));
    }

    for group in &plan.columns {
        let members: Vec<&Record> = records
            .iter()
            .copied()
            .filter(|r| record_in_column(r, &plan.column_fields, &group.value))
            .collect();
        for cell in &group.cells {
            row.insert(cell.key.clone(), aggregate_cell(members.iter().copied(), cell));
        }
    }

    for cell in &plan.plain {
        row.insert(cell.key.clone(), aggregate_cell(records.iter().copied(), cell));
    }

    for meta in &plan.metas {
        let values: Vec<FieldValue> = meta
            .source_keys
            .iter()
            .map(|key| row.value(key).cloned().unwrap_or_default())
            .collect();
        let result = meta.spec.meta_aggregation.apply(&values);
        row.insert(meta.key.clone(), result);
    }

    row
}

fn aggregate_cell<'a, I>(records: I, cell: &ValueCell) -> FieldValue
where
    I: Iterator<Item = &'a Record>,
{
    let field = cell.spec.field.as_str();
    cell.spec
        .aggregation
        .apply(records.map(|record| field_value(record, field)))
}
