use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::keys;

/// Metadata row for one stored file. The full logical name is the identity;
/// the physical bytes live behind the `DataManager` collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryResource {
    pub full_name: String,
    pub content_length: u64,
    pub last_modified: DateTime<Utc>,
}

impl BinaryResource {
    pub fn new(
        full_name: impl Into<String>,
        content_length: u64,
        last_modified: DateTime<Utc>,
    ) -> Self {
        Self {
            full_name: full_name.into(),
            content_length,
            last_modified,
        }
    }

    /// The bare file name (final segment of the full name).
    pub fn name(&self) -> &str {
        keys::file_name_of(&self.full_name)
    }

    /// Full name this resource would have after renaming the file segment.
    pub fn renamed_full_name(&self, new_name: &str) -> String {
        keys::renamed_full_name(&self.full_name, new_name)
    }
}
