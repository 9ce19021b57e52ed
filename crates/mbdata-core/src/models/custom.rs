//! Custom (discovered) telemetry fields

use serde::{Deserialize, Serialize};

/// A single labeled value fetched for a discovered resource.
///
/// Rebuilt on every polling cycle; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomDataRecord {
    /// Position of the field in the catalog's iteration order
    pub id: usize,
    /// Resource name as reported by the provider
    pub label: String,
    /// Resource value rendered as a string
    pub value: String,
}

impl CustomDataRecord {
    pub fn new(id: usize, label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Result set of a custom data sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomData {
    pub records: Vec<CustomDataRecord>,
}

impl CustomData {
    /// Look up a record by its label
    pub fn get(&self, label: &str) -> Option<&CustomDataRecord> {
        self.records.iter().find(|r| r.label == label)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl From<Vec<CustomDataRecord>> for CustomData {
    fn from(records: Vec<CustomDataRecord>) -> Self {
        Self { records }
    }
}
