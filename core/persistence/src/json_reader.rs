//! FILENAME: core/persistence/src/json_reader.rs

use crate::{PersistenceError, SavedConfig, SAVED_CONFIG_VERSION};
use pivot_engine::{records_from_json, PivotConfig, Record};
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

fn read_json(path: &Path) -> Result<Value, PersistenceError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Loads source records from a JSON array of objects.
/// Entries that are not objects are skipped.
pub fn load_records(path: &Path) -> Result<Vec<Record>, PersistenceError> {
    let value = read_json(path)?;
    records_from_json(&value).ok_or_else(|| {
        PersistenceError::InvalidFormat("Records file must contain a JSON array".to_string())
    })
}

/// Loads a pivot configuration, either a bare config object or a versioned
/// [`SavedConfig`] document written by `save_config`.
pub fn load_config(path: &Path) -> Result<PivotConfig, PersistenceError> {
    let value = read_json(path)?;
    let Some(object) = value.as_object() else {
        return Err(PersistenceError::InvalidFormat(
            "Config file must contain a JSON object".to_string(),
        ));
    };

    if object.contains_key("version") && object.contains_key("config") {
        let saved: SavedConfig = serde_json::from_value(value)?;
        if saved.version > SAVED_CONFIG_VERSION {
            return Err(PersistenceError::InvalidFormat(format!(
                "Unsupported config version {} (newest known is {})",
                saved.version, SAVED_CONFIG_VERSION
            )));
        }
        return Ok(saved.config);
    }

    PivotConfig::from_json(&value).map_err(|e| PersistenceError::InvalidFormat(e.to_string()))
}
