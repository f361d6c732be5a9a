//! FILENAME: core/pivot-engine/src/definition.rs
//! Pivot Definition - The serializable configuration.
//!
//! This module contains all the types needed to DESCRIBE a pivot table.
//! These structures are designed to be:
//! - Serializable (stored by the configuration persistence layer as JSON)
//! - Immutable snapshots of user intent
//!
//! Wire names are camelCase (`rowFields`, `showRowTotals`, ...).

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Separator used to join row-field values into a group key.
pub const DEFAULT_FIELD_SEPARATOR: &str = "|";

// ============================================================================
// AGGREGATION
// ============================================================================

/// Supported aggregation functions for value fields and meta-aggregations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AggregationType {
    #[default]
    Sum,
    Count,
    #[serde(alias = "avg")]
    Average,
    Min,
    Max,
    First,
    Last,
}

impl AggregationType {
    pub const ALL: [AggregationType; 7] = [
        AggregationType::Sum,
        AggregationType::Count,
        AggregationType::Average,
        AggregationType::Min,
        AggregationType::Max,
        AggregationType::First,
        AggregationType::Last,
    ];

    /// The lowercase name used inside generated cell keys.
    pub fn as_str(self) -> &'static str {
        match self {
            AggregationType::Sum => "sum",
            AggregationType::Count => "count",
            AggregationType::Average => "average",
            AggregationType::Min => "min",
            AggregationType::Max => "max",
            AggregationType::First => "first",
            AggregationType::Last => "last",
        }
    }

    /// Human-readable name used in column titles ("Sum of amt").
    pub fn label(self) -> &'static str {
        match self {
            AggregationType::Sum => "Sum",
            AggregationType::Count => "Count",
            AggregationType::Average => "Average",
            AggregationType::Min => "Min",
            AggregationType::Max => "Max",
            AggregationType::First => "First",
            AggregationType::Last => "Last",
        }
    }

    /// First/Last pass through whatever scalar they find, so their cells
    /// are not necessarily numeric.
    pub fn is_numeric(self) -> bool {
        !matches!(self, AggregationType::First | AggregationType::Last)
    }
}

impl std::fmt::Display for AggregationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// FIELD DEFINITIONS
// ============================================================================

/// A measure: a field aggregated with one function.
/// Several specs may target the same field with different aggregations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSpec {
    pub field: String,
    #[serde(default)]
    pub aggregation: AggregationType,
}

impl ValueSpec {
    pub fn new(field: impl Into<String>, aggregation: AggregationType) -> Self {
        ValueSpec {
            field: field.into(),
            aggregation,
        }
    }
}

/// How a calculated field is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CalculatedFormat {
    #[default]
    Number,
    Currency,
    #[serde(alias = "percentage")]
    Percent,
}

/// A user-defined formula evaluated over the cells of each pivot row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedFieldSpec {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub formula: String,
    #[serde(default)]
    pub format: CalculatedFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl CalculatedFieldSpec {
    pub fn new(id: impl Into<String>, name: impl Into<String>, formula: impl Into<String>) -> Self {
        CalculatedFieldSpec {
            id: id.into(),
            name: name.into(),
            formula: formula.into(),
            format: CalculatedFormat::Number,
            description: None,
        }
    }

    pub fn with_format(mut self, format: CalculatedFormat) -> Self {
        self.format = format;
        self
    }

    /// Display name, falling back to the id when the name is blank.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// An aggregation applied over already-aggregated column cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaAggSpec {
    pub field: String,
    pub source_aggregation: AggregationType,
    pub meta_aggregation: AggregationType,
}

impl MetaAggSpec {
    pub fn new(
        field: impl Into<String>,
        source_aggregation: AggregationType,
        meta_aggregation: AggregationType,
    ) -> Self {
        MetaAggSpec {
            field: field.into(),
            source_aggregation,
            meta_aggregation,
        }
    }
}

/// Sort direction for resolved column values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

// ============================================================================
// MAIN CONFIGURATION STRUCT
// ============================================================================

/// The complete, serializable configuration of a pivot transformation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PivotConfig {
    /// When false the transformation passes records through untouched.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fields whose value combinations form the pivot rows.
    #[serde(default)]
    pub row_fields: Vec<String>,

    /// Fields whose distinct values split each measure into side-by-side columns.
    #[serde(default)]
    pub column_fields: Vec<String>,

    #[serde(default)]
    pub values: Vec<ValueSpec>,

    #[serde(default)]
    pub calculated_fields: Vec<CalculatedFieldSpec>,

    #[serde(default)]
    pub meta_aggregations: Vec<MetaAggSpec>,

    #[serde(default = "default_true")]
    pub show_row_totals: bool,

    /// Whether the grand total row carries the per-column-value cells.
    #[serde(default = "default_true")]
    pub show_column_totals: bool,

    #[serde(default = "default_true")]
    pub show_grand_totals: bool,

    #[serde(default)]
    pub sort_columns: bool,

    #[serde(default)]
    pub sort_direction: SortDirection,

    /// Joins row-field values into group keys.
    #[serde(default = "default_field_separator")]
    pub field_separator: String,
}

fn default_true() -> bool {
    true
}

fn default_field_separator() -> String {
    DEFAULT_FIELD_SEPARATOR.to_string()
}

impl Default for PivotConfig {
    fn default() -> Self {
        PivotConfig {
            enabled: true,
            row_fields: Vec::new(),
            column_fields: Vec::new(),
            values: Vec::new(),
            calculated_fields: Vec::new(),
            meta_aggregations: Vec::new(),
            show_row_totals: true,
            show_column_totals: true,
            show_grand_totals: true,
            sort_columns: false,
            sort_direction: SortDirection::Asc,
            field_separator: default_field_separator(),
        }
    }
}

impl PivotConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration from a JSON value. Unknown keys are ignored and
    /// absent keys take their defaults.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ConfigError> {
        PivotConfig::deserialize(value).map_err(|e| ConfigError::Malformed(e.to_string()))
    }

    /// False when pivoting is switched off or nothing is placed in any area.
    pub fn is_active(&self) -> bool {
        self.enabled
            && !(self.row_fields.is_empty() && self.column_fields.is_empty() && self.values.is_empty())
    }

    /// Checks the configuration for shapes the engine cannot honour.
    /// Repeated value specs and unnamed or repeated calculated fields are
    /// not errors here; the plan dedupes and renames them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.field_separator.is_empty() {
            return Err(ConfigError::EmptySeparator);
        }

        for (area, fields) in [("row", &self.row_fields), ("column", &self.column_fields)] {
            if fields.iter().any(|f| f.trim().is_empty()) {
                return Err(ConfigError::EmptyFieldName { area });
            }
        }

        if self.values.iter().any(|spec| spec.field.trim().is_empty()) {
            return Err(ConfigError::EmptyFieldName { area: "value" });
        }

        for meta in &self.meta_aggregations {
            if meta.field.trim().is_empty() {
                return Err(ConfigError::EmptyFieldName { area: "meta-aggregation" });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: PivotConfig = serde_json::from_str(
            r#"{"rowFields":["region"],"values":[{"field":"amt","aggregation":"avg"}]}"#,
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.row_fields, vec!["region"]);
        assert_eq!(config.values, vec![ValueSpec::new("amt", AggregationType::Average)]);
        assert!(config.show_row_totals);
        assert!(config.show_grand_totals);
        assert!(!config.sort_columns);
        assert_eq!(config.sort_direction, SortDirection::Asc);
        assert_eq!(config.field_separator, "|");
    }

    #[test]
    fn serializes_camel_case() {
        let mut config = PivotConfig::new();
        config.meta_aggregations.push(MetaAggSpec::new(
            "amt",
            AggregationType::Sum,
            AggregationType::Max,
        ));
        let json = serde_json::to_value(&config).unwrap();

        assert_eq!(json["showRowTotals"], true);
        assert_eq!(json["sortDirection"], "asc");
        assert_eq!(json["metaAggregations"][0]["sourceAggregation"], "sum");
        assert_eq!(json["metaAggregations"][0]["metaAggregation"], "max");
    }

    #[test]
    fn is_active_requires_enabled_and_some_area() {
        let mut config = PivotConfig::new();
        assert!(!config.is_active());

        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        assert!(config.is_active());

        config.enabled = false;
        assert!(!config.is_active());
    }

    #[test]
    fn validate_rejects_malformed_configs() {
        let mut config = PivotConfig::new();
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        assert!(config.validate().is_ok());

        config.values.push(ValueSpec::new(" ", AggregationType::Count));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyFieldName { area: "value" })
        ));
        config.values.pop();

        config.row_fields.push(" ".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyFieldName { area: "row" })
        ));
        config.row_fields.clear();

        config.field_separator.clear();
        assert!(matches!(config.validate(), Err(ConfigError::EmptySeparator)));
        config.field_separator = "|".to_string();
    }

    #[test]
    fn validate_leaves_repeats_to_the_plan() {
        let mut config = PivotConfig::new();
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.values.push(ValueSpec::new("amt", AggregationType::Sum));
        config.calculated_fields.push(CalculatedFieldSpec::new("", "", "amt_total"));
        config.calculated_fields.push(CalculatedFieldSpec::new("x", "X", "1"));
        config.calculated_fields.push(CalculatedFieldSpec::new("x", "Y", "2"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn from_json_reports_malformed_configs() {
        let config = PivotConfig::from_json(&serde_json::json!({
            "rowFields": ["region"],
            "values": [{ "field": "amt", "aggregation": "sum" }],
            "theme": "dark"
        }))
        .unwrap();
        assert_eq!(config.row_fields, vec!["region"]);

        let err = PivotConfig::from_json(&serde_json::json!({ "rowFields": "region" })).unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));

        let err = PivotConfig::from_json(&serde_json::json!({
            "values": [{ "field": "amt", "aggregation": "median" }]
        }))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Malformed(_)));
    }
}
