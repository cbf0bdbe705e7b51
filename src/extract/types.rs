//! Extraction types

use serde::{Deserialize, Serialize};

/// A book recognized on one OCR line
///
/// Fields are empty strings when the line did not carry them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub publisher: String,
}

impl BookRecord {
    /// Create a record with only a title
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}
