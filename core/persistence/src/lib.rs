//! FILENAME: core/persistence/src/lib.rs
//! Pivot Persistence Module
//!
//! Loads source records and pivot configurations from JSON files and saves
//! configurations and transform results back. The engine itself never
//! performs I/O; this crate is the layer around it.

mod error;
mod json_reader;
mod json_writer;

pub use error::PersistenceError;
pub use json_reader::{load_config, load_records};
pub use json_writer::{save_config, save_result};

use pivot_engine::PivotConfig;
use serde::{Deserialize, Serialize};

// ============================================================================
// SAVED CONFIG
// ============================================================================

/// Version written by `save_config`. Files with a newer version are rejected.
pub const SAVED_CONFIG_VERSION: u32 = 1;

/// On-disk envelope for a pivot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedConfig {
    pub version: u32,
    pub config: PivotConfig,
}

impl SavedConfig {
    pub fn new(config: PivotConfig) -> Self {
        Self {
            version: SAVED_CONFIG_VERSION,
            config,
        }
    }
}
