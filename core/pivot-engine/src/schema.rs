//! FILENAME: core/pivot-engine/src/schema.rs
//! Column schema generator.
//!
//! Order is fixed and renderers depend on it:
//! row dimensions, value columns, row totals, meta-aggregations,
//! calculated fields.

use crate::definition::AggregationType;
use crate::plan::{PivotPlan, ValueCell};
use crate::view::{ColumnRole, ColumnType, PivotColumn};
use crate::value::FieldValue;

pub fn generate_columns(plan: &PivotPlan) -> Vec<PivotColumn> {
    let mut columns = Vec::new();

    for field in &plan.row_fields {
        columns.push(PivotColumn {
            key: field.clone(),
            title: field.clone(),
            column_type: ColumnType::Text,
            role: ColumnRole::RowDimension { field: field.clone() },
        });
    }

    for cell in &plan.plain {
        columns.push(value_column(cell, None));
    }
    for group in &plan.columns {
        for cell in &group.cells {
            columns.push(value_column(cell, Some(&group.value)));
        }
    }

    for cell in &plan.totals {
        columns.push(PivotColumn {
            key: cell.key.clone(),
            title: cell.title.clone(),
            column_type: type_of(cell.spec.aggregation),
            role: ColumnRole::Total {
                field: cell.spec.field.clone(),
                aggregation: cell.spec.aggregation,
            },
        });
    }

    for meta in &plan.metas {
        columns.push(PivotColumn {
            key: meta.key.clone(),
            title: meta.title.clone(),
            column_type: type_of(meta.spec.meta_aggregation),
            role: ColumnRole::MetaAggregation {
                field: meta.spec.field.clone(),
                source_aggregation: meta.spec.source_aggregation,
                meta_aggregation: meta.spec.meta_aggregation,
            },
        });
    }

    for calc in &plan.calculated {
        columns.push(PivotColumn {
            key: calc.key.clone(),
            title: calc.spec.display_name().to_string(),
            column_type: ColumnType::Number,
            role: ColumnRole::Calculated {
                id: calc.spec.id.clone(),
                formula: calc.spec.formula.clone(),
                format: calc.spec.format,
                description: calc.spec.description.clone(),
            },
        });
    }

    columns
}

fn value_column(cell: &ValueCell, column_value: Option<&FieldValue>) -> PivotColumn {
    PivotColumn {
        key: cell.key.clone(),
        title: cell.title.clone(),
        column_type: type_of(cell.spec.aggregation),
        role: ColumnRole::Value {
            field: cell.spec.field.clone(),
            aggregation: cell.spec.aggregation,
            column_value: column_value.cloned(),
        },
    }
}

fn type_of(aggregation: AggregationType) -> ColumnType {
    if aggregation.is_numeric() {
        ColumnType::Number
    } else {
        ColumnType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{CalculatedFieldSpec, CalculatedFormat, MetaAggSpec, PivotConfig, ValueSpec};

    fn keys(columns: &[PivotColumn]) -> Vec<&str> {
        columns.iter().map(|c| c.key.as_str()).collect()
    }

    #[test]
    fn fixed_order_with_column_dimension() {
        let mut config = PivotConfig::new();
        config.row_fields = vec!["region".to_string(), "product".to_string()];
        config.column_fields.push("q".to_string());
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.values.push(ValueSpec::new("qty", AggregationType::Count));
        config
            .meta_aggregations
            .push(MetaAggSpec::new("amt", AggregationType::Sum, AggregationType::Average));
        config.calculated_fields.push(
            CalculatedFieldSpec::new("share", "Share", "amt_total / qty_total")
                .with_format(CalculatedFormat::Percent),
        );
        let plan = PivotPlan::new(&config, &[FieldValue::from("Q1"), FieldValue::from("Q2")]);

        let columns = generate_columns(&plan);
        assert_eq!(
            keys(&columns),
            vec![
                "region",
                "product",
                "Q1_amt_sum",
                "Q1_qty_count",
                "Q2_amt_sum",
                "Q2_qty_count",
                "amt_total",
                "qty_total",
                "amt_sum_average",
                "calc_share",
            ]
        );
        assert_eq!(columns[2].title, "Q1 - Sum of amt");
        assert_eq!(columns[6].title, "Total Sum of amt");
        assert_eq!(columns[8].title, "Average of Sum of amt");
        assert_eq!(columns[9].title, "Share");
        assert_eq!(columns[0].column_type, ColumnType::Text);
        assert!(matches!(
            columns[9].role,
            ColumnRole::Calculated { format: CalculatedFormat::Percent, .. }
        ));
    }

    #[test]
    fn plain_value_columns_and_text_aggregations() {
        let mut config = PivotConfig::new();
        config.row_fields.push("region".to_string());
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.values.push(ValueSpec::new("note", AggregationType::First));
        config.show_row_totals = false;
        let plan = PivotPlan::new(&config, &[]);

        let columns = generate_columns(&plan);
        assert_eq!(keys(&columns), vec!["region", "amt", "note"]);
        assert_eq!(columns[1].title, "Sum of amt");
        assert_eq!(columns[1].column_type, ColumnType::Number);
        assert_eq!(columns[2].column_type, ColumnType::Text);
    }
}
