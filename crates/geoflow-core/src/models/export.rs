use serde::{Deserialize, Serialize};

use super::tier::Tier;

/// A file format the visible layers can be exported to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportFormat {
    pub id: String,
    pub name: String,
    pub description: String,
    /// File extension including the leading dot
    pub extension: String,
    /// Minimum tier allowed to export in this format
    pub tier: Tier,
}

impl ExportFormat {
    pub fn new(id: &str, name: &str, description: &str, extension: &str, tier: Tier) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            extension: extension.to_string(),
            tier,
        }
    }

    /// Default output file name for this format
    pub fn file_name(&self, stem: &str) -> String {
        format!("{}{}", stem, self.extension)
    }
}
