//! FILENAME: core/pivot-engine/src/aggregation.rs
//! Aggregator registry: pure folds over a sequence of values.
//!
//! Edge cases are part of the contract and downstream formatting relies on
//! them: empty numeric folds yield 0 (never +/-Infinity), empty First/Last
//! yield the empty string, and Sum counts anything non-numeric as 0.
//! Booleans are not numbers here; only formula evaluation reads them as 1/0.

use crate::definition::AggregationType;
use crate::value::FieldValue;

impl AggregationType {
    /// Folds `values` into one summary value.
    pub fn apply<'a, I>(self, values: I) -> FieldValue
    where
        I: IntoIterator<Item = &'a FieldValue>,
    {
        let mut values = values.into_iter();
        match self {
            AggregationType::Sum => FieldValue::Number(
                values.map(|v| v.as_number().unwrap_or(0.0)).sum(),
            ),
            AggregationType::Count => {
                FieldValue::Number(values.filter(|v| !v.is_null()).count() as f64)
            }
            AggregationType::Average => {
                let (sum, count) = values
                    .filter_map(FieldValue::as_number)
                    .fold((0.0, 0usize), |(s, c), n| (s + n, c + 1));
                FieldValue::Number(if count == 0 { 0.0 } else { sum / count as f64 })
            }
            AggregationType::Min => FieldValue::Number(
                values
                    .filter_map(FieldValue::as_number)
                    .reduce(f64::min)
                    .unwrap_or(0.0),
            ),
            AggregationType::Max => FieldValue::Number(
                values
                    .filter_map(FieldValue::as_number)
                    .reduce(f64::max)
                    .unwrap_or(0.0),
            ),
            AggregationType::First => values
                .find(|v| !v.is_null())
                .cloned()
                .unwrap_or_else(empty_text),
            AggregationType::Last => values
                .filter(|v| !v.is_null())
                .last()
                .cloned()
                .unwrap_or_else(empty_text),
        }
    }
}

fn empty_text() -> FieldValue {
    FieldValue::Text(String::new())
}

/// Applies `kind` to `values`. Free-function form of [`AggregationType::apply`].
pub fn aggregate<'a, I>(kind: AggregationType, values: I) -> FieldValue
where
    I: IntoIterator<Item = &'a FieldValue>,
{
    kind.apply(values)
}
