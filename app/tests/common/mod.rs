//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for the pivot CLI integration tests.

use app_lib::InputArgs;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary directory holding input fixtures for one test.
pub struct TestHarness {
    pub dir: TempDir,
}

impl TestHarness {
    /// Create a harness with an empty temporary directory.
    pub fn new() -> Self {
        TestHarness {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// Create a harness with the regional sales records and a sum-by-region config.
    pub fn with_sales() -> Self {
        let harness = Self::new();
        harness.write("records.json", SALES_RECORDS);
        harness.write("config.json", SUM_BY_REGION);
        harness
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn read_json(&self, path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    pub fn input(&self) -> InputArgs {
        InputArgs {
            records: self.path("records.json"),
            config: self.path("config.json"),
        }
    }
}

pub const SALES_RECORDS: &str = r#"[
    { "region": "A", "quarter": "Q1", "amt": 10, "qty": 2 },
    { "region": "A", "quarter": "Q2", "amt": 20, "qty": 2 },
    { "region": "B", "quarter": "Q1", "amt": 5,  "qty": 1 }
]"#;

pub const SUM_BY_REGION: &str = r#"{
    "rowFields": ["region"],
    "values": [
        { "field": "amt", "aggregation": "sum" },
        { "field": "qty", "aggregation": "sum" }
    ],
    "calculatedFields": [
        { "id": "price", "name": "Price", "formula": "amt_total / qty_total", "format": "currency" }
    ]
}"#;
