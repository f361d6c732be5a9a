//! FILENAME: core/pivot-engine/src/value.rs
//! Scalar values and source records.
//!
//! A record is an ordered mapping of field name to scalar. The engine only
//! ever borrows records; nothing here mutates input data.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

// ============================================================================
// FIELD VALUE
// ============================================================================

/// A scalar from a source record, or an aggregated cell value.
/// A field that is absent from a record reads as `Null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

/// A single source row.
pub type Record = IndexMap<String, FieldValue>;

static NULL_VALUE: FieldValue = FieldValue::Null;

/// Reads a field from a record, treating a missing field as `Null`.
pub fn field_value<'a>(record: &'a Record, field: &str) -> &'a FieldValue {
    record.get(field).unwrap_or(&NULL_VALUE)
}

impl FieldValue {
    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Returns the number if this is a numeric, non-NaN value.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) if !n.is_nan() => Some(*n),
            _ => None,
        }
    }

    /// The string form used inside group keys and generated cell keys.
    /// Null renders as the empty string; numbers render without a trailing
    /// `.0` so that `10` and `10.0` produce the same key.
    pub fn to_key_string(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            FieldValue::Bool(b) => b.to_string(),
            FieldValue::Number(n) => format_key_number(*n),
            FieldValue::Text(s) => s.clone(),
        }
    }

    /// Hashable identity of this value (see [`ValueKey`]).
    pub fn key(&self) -> ValueKey {
        ValueKey::from(self)
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_key_string())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

fn format_key_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity".to_string() } else { "-Infinity".to_string() }
    } else if n == 0.0 {
        // -0 and 0 print the same
        "0".to_string()
    } else {
        format!("{}", n)
    }
}

// ============================================================================
// VALUE KEY
// ============================================================================

/// A normalized, hashable representation of a [`FieldValue`].
/// Used for deduplicating column values. Typed: the number `1` and the text
/// `"1"` are different keys. All NaNs are one key, and `-0` equals `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Bool(bool),
    Number(u64),
    Text(String),
}

impl From<&FieldValue> for ValueKey {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Null => ValueKey::Null,
            FieldValue::Bool(b) => ValueKey::Bool(*b),
            FieldValue::Number(n) => ValueKey::Number(number_bits(*n)),
            FieldValue::Text(s) => ValueKey::Text(s.clone()),
        }
    }
}

fn number_bits(n: f64) -> u64 {
    if n.is_nan() {
        u64::MAX
    } else if n == 0.0 {
        0f64.to_bits()
    } else {
        n.to_bits()
    }
}

/// Builds a record from `(field, value)` pairs, keeping their order.
pub fn record<K, V, I>(pairs: I) -> Record
where
    K: Into<String>,
    V: Into<FieldValue>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_read_as_null() {
        let r = record([("a", 1.0)]);
        assert_eq!(field_value(&r, "a"), &FieldValue::Number(1.0));
        assert!(field_value(&r, "b").is_null());
    }

    #[test]
    fn key_strings_match_display_conventions() {
        assert_eq!(FieldValue::Number(10.0).to_key_string(), "10");
        assert_eq!(FieldValue::Number(1.5).to_key_string(), "1.5");
        assert_eq!(FieldValue::Number(-0.0).to_key_string(), "0");
        assert_eq!(FieldValue::Number(f64::INFINITY).to_key_string(), "Infinity");
        assert_eq!(FieldValue::Bool(true).to_key_string(), "true");
        assert_eq!(FieldValue::Null.to_key_string(), "");
    }

    #[test]
    fn value_keys_are_typed() {
        assert_ne!(FieldValue::Number(1.0).key(), FieldValue::text("1").key());
        assert_eq!(FieldValue::Number(f64::NAN).key(), FieldValue::Number(f64::NAN).key());
        assert_eq!(FieldValue::Number(-0.0).key(), FieldValue::Number(0.0).key());
    }

    #[test]
    fn deserializes_json_scalars() {
        let r: Record =
            serde_json::from_str(r#"{"region":"A","amt":10,"ok":true,"note":null}"#).unwrap();
        assert_eq!(r["region"], FieldValue::text("A"));
        assert_eq!(r["amt"], FieldValue::Number(10.0));
        assert_eq!(r["ok"], FieldValue::Bool(true));
        assert!(r["note"].is_null());
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["region", "amt", "ok", "note"]);
    }
}
