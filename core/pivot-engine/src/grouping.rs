//! FILENAME: core/pivot-engine/src/grouping.rs
//! Grouping engine: partitions records by their row-field values.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::value::{field_value, FieldValue, Record};

/// Key of the single group produced when no row fields are configured.
pub const ALL_GROUP_KEY: &str = "all";

/// One distinct combination of row-field values and the records carrying it.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    /// Row-field values joined with the field separator.
    pub key: String,

    /// Row field -> value, taken from the first record of the group.
    pub dimension_values: IndexMap<String, FieldValue>,

    /// Member records in input order.
    pub records: Vec<&'a Record>,

    /// Positions of `records` in the input slice (for drill-down).
    pub indices: Vec<usize>,
}

impl<'a> Group<'a> {
    fn new(key: String, dimension_values: IndexMap<String, FieldValue>) -> Self {
        Group {
            key,
            dimension_values,
            records: Vec::new(),
            indices: Vec::new(),
        }
    }

    fn push(&mut self, index: usize, record: &'a Record) {
        self.records.push(record);
        self.indices.push(index);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Builds the group key of one record.
/// Missing and null values contribute an empty string.
pub fn group_key(record: &Record, row_fields: &[String], separator: &str) -> String {
    let parts: SmallVec<[String; 4]> = row_fields
        .iter()
        .map(|f| field_value(record, f).to_key_string())
        .collect();
    parts.join(separator)
}

/// Partitions `records` into groups in order of first appearance.
///
/// With no row fields the result is exactly one group, keyed
/// [`ALL_GROUP_KEY`], holding every record (even when there are none).
pub fn group_records<'a>(
    records: &'a [Record],
    row_fields: &[String],
    separator: &str,
) -> Vec<Group<'a>> {
    if row_fields.is_empty() {
        let mut all = Group::new(ALL_GROUP_KEY.to_string(), IndexMap::new());
        for (index, record) in records.iter().enumerate() {
            all.push(index, record);
        }
        return vec![all];
    }

    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut positions: FxHashMap<String, usize> = FxHashMap::default();

    for (index, record) in records.iter().enumerate() {
        let key = group_key(record, row_fields, separator);
        let position = match positions.get(&key) {
            Some(&position) => position,
            None => {
                let dimension_values = row_fields
                    .iter()
                    .map(|f| (f.clone(), field_value(record, f).clone()))
                    .collect();
                groups.push(Group::new(key.clone(), dimension_values));
                positions.insert(key, groups.len() - 1);
                groups.len() - 1
            }
        };
        groups[position].push(index, record);
    }

    groups
}
