//! FILENAME: core/pivot-engine/src/plan.rs
//! Cell plan: every key a pivot row can carry, decided once per transform.
//!
//! The matrix builder, the calculated-field evaluator, the grand totals and
//! the column schema all read from this plan, so a key is generated in one
//! place only. The plan also owns the [`FieldMapping`] that resolves formula
//! identifiers to cell keys.
//!
//! Key shapes:
//! - row total:   `field_total`, or `field_aggregation_total` when the field
//!                is targeted by more than one value spec
//! - column cell: `columnValue_field_aggregation`
//! - plain cell:  `field`, or `field_aggregation` on the same collision rule
//! - meta:        `field_sourceAggregation_metaAggregation`
//! - calculated:  `calc_<slug>` plus `calc_<slug>_meta`

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use crate::calculated::{calculated_key, validate_expression, FormulaValidation};
use crate::definition::{AggregationType, CalculatedFieldSpec, MetaAggSpec, PivotConfig, ValueSpec};
use crate::error::FormulaError;
use crate::value::{FieldValue, ValueKey};

// ============================================================================
// VALUE CELLS AND THE FIELD MAPPING
// ============================================================================

/// Where a value cell sits in the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CellKind {
    /// Aggregate over the whole group, no column dimension configured.
    Plain,
    /// Aggregate over the group records of one column value.
    Column,
    /// Row total: aggregate over the whole group.
    Total,
}

/// A materialized value cell. These are the fields a calculated-field
/// formula may reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableField {
    pub key: String,
    pub field: String,
    pub aggregation: AggregationType,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_value: Option<FieldValue>,
    pub kind: CellKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FieldTuple {
    field: String,
    aggregation: AggregationType,
    column: Option<ValueKey>,
}

/// Typed lookup table from `(field, aggregation, column value?)` to the
/// generated cell key, plus identifier resolution for formulas.
#[derive(Debug, Clone, Default)]
pub struct FieldMapping {
    fields: Vec<AvailableField>,
    by_key: FxHashMap<String, usize>,
    by_tuple: FxHashMap<FieldTuple, usize>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: AvailableField) {
        let index = self.fields.len();
        let tuple = FieldTuple {
            field: field.field.clone(),
            aggregation: field.aggregation,
            column: field.column_value.as_ref().map(FieldValue::key),
        };
        self.by_key.insert(field.key.clone(), index);
        // Plain and total cells share the (field, aggregation, None) tuple;
        // they never coexist, but the first registration wins if they do.
        self.by_tuple.entry(tuple).or_insert(index);
        self.fields.push(field);
    }

    pub fn fields(&self) -> &[AvailableField] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&AvailableField> {
        self.by_key.get(key).map(|&i| &self.fields[i])
    }

    /// The key generated for a `(field, aggregation, column value)` tuple.
    pub fn key_for(
        &self,
        field: &str,
        aggregation: AggregationType,
        column_value: Option<&FieldValue>,
    ) -> Option<&str> {
        let tuple = FieldTuple {
            field: field.to_string(),
            aggregation,
            column: column_value.map(FieldValue::key),
        };
        self.by_tuple
            .get(&tuple)
            .map(|&i| self.fields[i].key.as_str())
    }

    /// Resolves a formula identifier to a materialized cell.
    ///
    /// Resolution order:
    /// 1. exact cell key (`amt_total`, `A_amt_sum`);
    /// 2. bare field name, when exactly one non-column cell exists for it;
    /// 3. `<identifier>_total` (so `amt_sum` finds `amt_sum_total`);
    /// 4. fallback: the text before the first `_`, resolved as in step 2
    ///    (`amt_growth` -> `amt`).
    pub fn resolve(&self, identifier: &str) -> Option<&AvailableField> {
        if let Some(field) = self.get(identifier) {
            return Some(field);
        }
        if let Some(field) = self.unique_bare_field(identifier) {
            return Some(field);
        }
        if let Some(field) = self.get(&format!("{}_total", identifier)) {
            return Some(field);
        }
        let (prefix, _) = identifier.split_once('_')?;
        self.unique_bare_field(prefix)
    }

    fn unique_bare_field(&self, name: &str) -> Option<&AvailableField> {
        let mut candidates = self
            .fields
            .iter()
            .filter(|f| f.field == name && f.column_value.is_none());
        let first = candidates.next()?;
        match candidates.next() {
            None => Some(first),
            Some(_) => None,
        }
    }
}

// ============================================================================
// PLAN ENTRIES
// ============================================================================

/// A planned value cell (plain, column or total).
#[derive(Debug, Clone, PartialEq)]
pub struct ValueCell {
    pub key: String,
    pub title: String,
    pub spec: ValueSpec,
}

/// The value cells of one resolved column value.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnGroup {
    pub value: FieldValue,
    pub cells: Vec<ValueCell>,
}

/// A planned meta-aggregation cell.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaCell {
    pub key: String,
    pub title: String,
    pub spec: MetaAggSpec,
    /// Column cells the meta-aggregation folds, in column order.
    pub source_keys: Vec<String>,
}

/// A planned calculated field, parsed and validated once.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculatedCell {
    pub key: String,
    pub meta_key: String,
    pub spec: CalculatedFieldSpec,
    pub validation: FormulaValidation,
    pub expression: Result<formula::Expression, FormulaError>,
}

/// Everything the row builders need, derived from the config and the
/// resolved column values.
#[derive(Debug, Clone)]
pub struct PivotPlan {
    pub row_fields: Vec<String>,
    pub column_fields: Vec<String>,
    pub totals: Vec<ValueCell>,
    pub columns: Vec<ColumnGroup>,
    pub plain: Vec<ValueCell>,
    pub metas: Vec<MetaCell>,
    pub calculated: Vec<CalculatedCell>,
    pub mapping: FieldMapping,
}

impl PivotPlan {
    pub fn new(config: &PivotConfig, column_values: &[FieldValue]) -> Self {
        let mut claimed: FxHashSet<String> = config.row_fields.iter().cloned().collect();
        let mut mapping = FieldMapping::new();

        let values = distinct_values(&config.values);
        let mut per_field: FxHashMap<&str, usize> = FxHashMap::default();
        for spec in &values {
            *per_field.entry(spec.field.as_str()).or_default() += 1;
        }
        let shared = |spec: &ValueSpec| per_field.get(spec.field.as_str()).copied().unwrap_or(0) > 1;

        let mut totals = Vec::new();
        if config.show_row_totals {
            for spec in &values {
                let key = if shared(spec) {
                    format!("{}_{}_total", spec.field, spec.aggregation)
                } else {
                    format!("{}_total", spec.field)
                };
                if !claim(&mut claimed, &key) {
                    continue;
                }
                let title = format!("Total {}", value_title(spec));
                mapping.push(AvailableField {
                    key: key.clone(),
                    field: spec.field.clone(),
                    aggregation: spec.aggregation,
                    title: title.clone(),
                    column_value: None,
                    kind: CellKind::Total,
                });
                totals.push(ValueCell { key, title, spec: spec.clone() });
            }
        }

        let mut columns = Vec::new();
        let mut plain = Vec::new();
        if !config.column_fields.is_empty() {
            for column_value in column_values {
                let mut cells = Vec::new();
                for spec in &values {
                    let key = format!(
                        "{}_{}_{}",
                        column_value.to_key_string(),
                        spec.field,
                        spec.aggregation
                    );
                    if !claim(&mut claimed, &key) {
                        continue;
                    }
                    let title = format!("{} - {}", column_value, value_title(spec));
                    mapping.push(AvailableField {
                        key: key.clone(),
                        field: spec.field.clone(),
                        aggregation: spec.aggregation,
                        title: title.clone(),
                        column_value: Some(column_value.clone()),
                        kind: CellKind::Column,
                    });
                    cells.push(ValueCell { key, title, spec: spec.clone() });
                }
                columns.push(ColumnGroup {
                    value: column_value.clone(),
                    cells,
                });
            }
        } else if !config.show_row_totals {
            // With row totals on and no column dimension, the totals already
            // hold the whole-group aggregates.
            for spec in &values {
                let key = if shared(spec) {
                    format!("{}_{}", spec.field, spec.aggregation)
                } else {
                    spec.field.clone()
                };
                if !claim(&mut claimed, &key) {
                    continue;
                }
                let title = value_title(spec);
                mapping.push(AvailableField {
                    key: key.clone(),
                    field: spec.field.clone(),
                    aggregation: spec.aggregation,
                    title: title.clone(),
                    column_value: None,
                    kind: CellKind::Plain,
                });
                plain.push(ValueCell { key, title, spec: spec.clone() });
            }
        }

        let mut metas = Vec::new();
        if !config.column_fields.is_empty() {
            for spec in &config.meta_aggregations {
                let source_keys: Vec<String> = columns
                    .iter()
                    .filter_map(|group| {
                        mapping
                            .key_for(&spec.field, spec.source_aggregation, Some(&group.value))
                            .map(str::to_string)
                    })
                    .collect();
                let has_source = values
                    .iter()
                    .any(|v| v.field == spec.field && v.aggregation == spec.source_aggregation);
                if !has_source {
                    log::warn!(
                        target: "pivot",
                        "meta-aggregation {}({} of {}) has no matching value field; skipped",
                        spec.meta_aggregation,
                        spec.source_aggregation,
                        spec.field
                    );
                    continue;
                }
                let key = format!(
                    "{}_{}_{}",
                    spec.field, spec.source_aggregation, spec.meta_aggregation
                );
                if !claim(&mut claimed, &key) {
                    continue;
                }
                let title = format!(
                    "{} of {} of {}",
                    spec.meta_aggregation.label(),
                    spec.source_aggregation.label(),
                    spec.field
                );
                metas.push(MetaCell {
                    key,
                    title,
                    spec: spec.clone(),
                    source_keys,
                });
            }
        } else if !config.meta_aggregations.is_empty() {
            log::debug!(
                target: "pivot",
                "{} meta-aggregation(s) ignored: no column fields",
                config.meta_aggregations.len()
            );
        }

        let mut calculated = Vec::new();
        for spec in &config.calculated_fields {
            if spec.id.trim().is_empty() && spec.name.trim().is_empty() {
                log::warn!(
                    target: "pivot",
                    "calculated field '{}' has neither id nor name",
                    spec.formula
                );
            }
            let base = calculated_key(spec);
            let mut key = base.clone();
            let mut suffix = 2;
            while claimed.contains(&key) || claimed.contains(&format!("{}_meta", key)) {
                key = format!("{}_{}", base, suffix);
                suffix += 1;
            }
            if key != base {
                log::warn!(target: "pivot", "calculated field key '{}' is taken; using '{}'", base, key);
            }
            let meta_key = format!("{}_meta", key);
            claimed.insert(key.clone());
            claimed.insert(meta_key.clone());

            let (expression, validation) = validate_expression(&spec.formula, &mapping);
            if !validation.is_valid {
                log::warn!(
                    target: "pivot",
                    "calculated field '{}' is invalid: {}",
                    spec.display_name(),
                    validation.errors.join("; ")
                );
            }
            calculated.push(CalculatedCell {
                key,
                meta_key,
                spec: spec.clone(),
                validation,
                expression,
            });
        }

        PivotPlan {
            row_fields: config.row_fields.clone(),
            column_fields: config.column_fields.clone(),
            totals,
            columns,
            plain,
            metas,
            calculated,
            mapping,
        }
    }
}

/// "Sum of amt"
pub fn value_title(spec: &ValueSpec) -> String {
    format!("{} of {}", spec.aggregation.label(), spec.field)
}

/// Drops repeated `(field, aggregation)` specs, keeping the first.
fn distinct_values(values: &[ValueSpec]) -> Vec<ValueSpec> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::with_capacity(values.len());
    for spec in values {
        if seen.insert((spec.field.as_str(), spec.aggregation)) {
            out.push(spec.clone());
        } else {
            log::warn!(
                target: "pivot",
                "duplicate value field {}({}) ignored",
                spec.aggregation,
                spec.field
            );
        }
    }
    out
}

fn claim(claimed: &mut FxHashSet<String>, key: &str) -> bool {
    if claimed.insert(key.to_string()) {
        true
    } else {
        log::warn!(target: "pivot", "cell key '{}' is already in use; cell skipped", key);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(values: &[(&str, AggregationType)]) -> PivotConfig {
        let mut config = PivotConfig::new();
        config.row_fields.push("region".to_string());
        config.values = values.iter().map(|(f, a)| ValueSpec::new(*f, *a)).collect();
        config
    }

    #[test]
    fn total_keys_only_carry_aggregation_on_collision() {
        let plan = PivotPlan::new(
            &config(&[
                ("amt", AggregationType::Sum),
                ("amt", AggregationType::Average),
                ("qty", AggregationType::Sum),
            ]),
            &[],
        );
        let keys: Vec<&str> = plan.totals.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["amt_sum_total", "amt_average_total", "qty_total"]);
        assert!(plan.plain.is_empty());
    }

    #[test]
    fn plain_keys_without_row_totals() {
        let mut cfg = config(&[("amt", AggregationType::Sum), ("amt", AggregationType::Max), ("qty", AggregationType::Count)]);
        cfg.show_row_totals = false;
        let plan = PivotPlan::new(&cfg, &[]);

        let keys: Vec<&str> = plan.plain.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["amt_sum", "amt_max", "qty"]);
        assert!(plan.totals.is_empty());
    }

    #[test]
    fn column_keys_always_carry_aggregation() {
        let mut cfg = config(&[("amt", AggregationType::Sum)]);
        cfg.column_fields.push("q".to_string());
        cfg.meta_aggregations.push(MetaAggSpec::new("amt", AggregationType::Sum, AggregationType::Max));
        let plan = PivotPlan::new(&cfg, &[FieldValue::from("Q1"), FieldValue::Number(2024.0)]);

        let keys: Vec<&str> = plan
            .columns
            .iter()
            .flat_map(|g| g.cells.iter().map(|c| c.key.as_str()))
            .collect();
        assert_eq!(keys, vec!["Q1_amt_sum", "2024_amt_sum"]);
        assert_eq!(plan.metas[0].key, "amt_sum_max");
        assert_eq!(plan.metas[0].source_keys, vec!["Q1_amt_sum", "2024_amt_sum"]);
        assert_eq!(
            plan.mapping.key_for("amt", AggregationType::Sum, Some(&FieldValue::Number(2024.0))),
            Some("2024_amt_sum")
        );
        assert_eq!(plan.mapping.key_for("amt", AggregationType::Sum, None), Some("amt_total"));
    }

    #[test]
    fn meta_without_source_value_is_skipped() {
        let mut cfg = config(&[("amt", AggregationType::Sum)]);
        cfg.column_fields.push("q".to_string());
        cfg.meta_aggregations.push(MetaAggSpec::new("amt", AggregationType::Average, AggregationType::Max));
        let plan = PivotPlan::new(&cfg, &[FieldValue::from("Q1")]);
        assert!(plan.metas.is_empty());
    }

    #[test]
    fn colliding_keys_are_not_generated_twice() {
        let mut cfg = config(&[("amt", AggregationType::Sum)]);
        cfg.column_fields.push("q".to_string());
        // Number 1 and text "1" are distinct column values with one key string.
        let plan = PivotPlan::new(&cfg, &[FieldValue::Number(1.0), FieldValue::from("1")]);
        assert_eq!(plan.columns[0].cells.len(), 1);
        assert!(plan.columns[1].cells.is_empty());
    }

    #[test]
    fn calculated_keys_are_unique() {
        let mut cfg = config(&[("amt", AggregationType::Sum)]);
        cfg.calculated_fields.push(CalculatedFieldSpec::new("margin", "Margin", "amt_total"));
        cfg.calculated_fields.push(CalculatedFieldSpec::new("calc_margin", "Margin 2", "amt_total * 2"));
        let plan = PivotPlan::new(&cfg, &[]);

        assert_eq!(plan.calculated[0].key, "calc_margin");
        assert_eq!(plan.calculated[0].meta_key, "calc_margin_meta");
        assert_eq!(plan.calculated[1].key, "calc_margin_2");
        assert!(plan.calculated.iter().all(|c| c.validation.is_valid));
    }

    #[test]
    fn resolution_order() {
        let mut cfg = config(&[
            ("amt", AggregationType::Sum),
            ("amt", AggregationType::Average),
            ("qty", AggregationType::Sum),
        ]);
        cfg.column_fields.push("q".to_string());
        let plan = PivotPlan::new(&cfg, &[FieldValue::from("Q1")]);
        let m = &plan.mapping;
        let resolve = |ident: &str| m.resolve(ident).map(|f| f.key.as_str());

        // exact key
        assert_eq!(resolve("Q1_amt_sum"), Some("Q1_amt_sum"));
        assert_eq!(resolve("amt_average_total"), Some("amt_average_total"));
        // unambiguous bare field
        assert_eq!(resolve("qty"), Some("qty_total"));
        // ambiguous bare field: two aggregations of amt
        assert_eq!(resolve("amt"), None);
        // _total suffix
        assert_eq!(resolve("amt_sum"), Some("amt_sum_total"));
        // prefix fallback
        assert_eq!(resolve("qty_anything"), Some("qty_total"));
        assert_eq!(resolve("amt_anything"), None);
        assert_eq!(resolve("unknown"), None);
    }
}
