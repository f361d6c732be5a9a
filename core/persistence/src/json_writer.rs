//! FILENAME: core/persistence/src/json_writer.rs

use crate::{PersistenceError, SavedConfig};
use pivot_engine::{PivotConfig, PivotResult};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), PersistenceError> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Saves a configuration wrapped in a versioned [`SavedConfig`] document.
pub fn save_config(config: &PivotConfig, path: &Path) -> Result<(), PersistenceError> {
    write_json(&SavedConfig::new(config.clone()), path)
}

/// Saves a transform result as pretty-printed JSON.
pub fn save_result(result: &PivotResult, path: &Path) -> Result<(), PersistenceError> {
    write_json(result, path)
}
