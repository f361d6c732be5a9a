//! FILENAME: core/pivot-engine/src/totals.rs
//! Grand totals calculator.
//!
//! Value cells are aggregated again over the full record set rather than
//! rolled up from the group rows, so Average/Min/Max stay correct.
//! Calculated fields are the exception: their grand total is the sum of the
//! group values, not a re-evaluation of the formula.

use crate::calculated::{meta_cell, sum_calculated};
use crate::definition::PivotConfig;
use crate::matrix::build_row;
use crate::plan::PivotPlan;
use crate::value::{FieldValue, Record};
use crate::view::{PivotRow, GRAND_TOTAL_LABEL};

/// Builds the grand total row, or `None` when grand totals are switched off.
pub fn build_grand_total(
    records: &[Record],
    config: &PivotConfig,
    plan: &PivotPlan,
    group_rows: &[PivotRow],
) -> Option<PivotRow> {
    if !config.show_grand_totals {
        return None;
    }

    let all: Vec<&Record> = records.iter().collect();
    let dimensions = plan
        .row_fields
        .iter()
        .map(|field| (field.clone(), FieldValue::from(GRAND_TOTAL_LABEL)));
    let mut row = build_row(&all, dimensions, plan);

    // Metas were already folded from these cells, so they survive the removal.
    if !config.show_column_totals {
        for group in &plan.columns {
            for cell in &group.cells {
                row.remove(&cell.key);
            }
        }
    }

    for cell in &plan.calculated {
        row.insert(cell.key.clone(), sum_calculated(group_rows, &cell.key));
        row.insert(cell.meta_key.clone(), meta_cell(&cell.spec));
    }

    Some(row)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculated::apply_calculated_fields;
    use crate::definition::{AggregationType, CalculatedFieldSpec, MetaAggSpec, ValueSpec};
    use crate::grouping::group_records;
    use crate::value::record;
    use crate::view::PivotCell;

    fn sales() -> Vec<Record> {
        vec![
            record([("region", FieldValue::from("A")), ("q", "Q1".into()), ("amt", 10.0.into()), ("qty", 1.0.into())]),
            record([("region", FieldValue::from("A")), ("q", "Q2".into()), ("amt", 20.0.into()), ("qty", 4.0.into())]),
            record([("region", FieldValue::from("B")), ("q", "Q1".into()), ("amt", 5.0.into()), ("qty", 5.0.into())]),
        ]
    }

    fn group_rows(records: &[Record], plan: &PivotPlan) -> Vec<PivotRow> {
        group_records(records, &plan.row_fields, "|")
            .iter()
            .map(|g| {
                let mut row = build_row(&g.records, g.dimension_values.clone(), plan);
                apply_calculated_fields(&mut row, &plan.calculated, &plan.mapping);
                row
            })
            .collect()
    }

    #[test]
    fn averages_over_all_records_not_group_rows() {
        let mut config = PivotConfig::new();
        config.row_fields.push("region".to_string());
        config.values.push(ValueSpec::new("amt", AggregationType::Average));
        let plan = PivotPlan::new(&config, &[]);
        let records = sales();
        let rows = group_rows(&records, &plan);

        let total = build_grand_total(&records, &config, &plan, &rows).unwrap();
        assert_eq!(total.value("region"), Some(&FieldValue::from("Grand Total")));
        assert_eq!(total.number("amt_total"), Some(35.0 / 3.0));
    }

    #[test]
    fn calculated_fields_sum_group_values() {
        let mut config = PivotConfig::new();
        config.row_fields.push("region".to_string());
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.values.push(ValueSpec::new("qty", AggregationType::Sum));
        config
            .calculated_fields
            .push(CalculatedFieldSpec::new("price", "Price", "amt_total / qty_total"));
        let plan = PivotPlan::new(&config, &[]);
        let records = sales();
        let rows = group_rows(&records, &plan);

        // A: 30 / 5 = 6, B: 5 / 5 = 1; the ratio of grand totals would be 3.5.
        let total = build_grand_total(&records, &config, &plan, &rows).unwrap();
        assert_eq!(total.number("calc_price"), Some(7.0));
        assert!(matches!(total.get("calc_price_meta"), Some(PivotCell::Meta(_))));
    }

    #[test]
    fn column_cells_follow_show_column_totals() {
        let mut config = PivotConfig::new();
        config.row_fields.push("region".to_string());
        config.column_fields.push("q".to_string());
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        let plan = PivotPlan::new(&config, &[FieldValue::from("Q1"), FieldValue::from("Q2")]);
        let records = sales();
        let rows = group_rows(&records, &plan);

        let total = build_grand_total(&records, &config, &plan, &rows).unwrap();
        assert_eq!(total.number("Q1_amt_sum"), Some(15.0));
        assert_eq!(total.number("Q2_amt_sum"), Some(20.0));

        config.show_column_totals = false;
        let total = build_grand_total(&records, &config, &plan, &rows).unwrap();
        assert!(!total.contains_key("Q1_amt_sum"));
        assert_eq!(total.number("amt_total"), Some(35.0));
    }

    #[test]
    fn metas_survive_hidden_column_totals() {
        let mut config = PivotConfig::new();
        config.row_fields.push("region".to_string());
        config.column_fields.push("q".to_string());
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.meta_aggregations.push(MetaAggSpec::new(
            "amt",
            AggregationType::Sum,
            AggregationType::Max,
        ));
        config.show_column_totals = false;
        let plan = PivotPlan::new(&config, &[FieldValue::from("Q1"), FieldValue::from("Q2")]);
        let records = sales();
        let rows = group_rows(&records, &plan);

        let total = build_grand_total(&records, &config, &plan, &rows).unwrap();
        assert!(!total.contains_key("Q1_amt_sum"));
        assert!(!total.contains_key("Q2_amt_sum"));
        // Max over the removed Q1 = 15 and Q2 = 20 cells.
        assert_eq!(total.number("amt_sum_max"), Some(20.0));
        assert_eq!(total.number("amt_total"), Some(35.0));
    }

    #[test]
    fn switched_off() {
        let mut config = PivotConfig::new();
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.show_grand_totals = false;
        let plan = PivotPlan::new(&config, &[]);
        assert!(build_grand_total(&sales(), &config, &plan, &[]).is_none());
    }
}
