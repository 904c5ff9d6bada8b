use crate::error::ServiceError;
use serde::{Deserialize, Serialize};

use crate::model::Id;

/// Identity of a configuration item: unique per workspace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigurationItemKey {
    pub workspace_id: String,
    pub item_id: Id,
}

impl ConfigurationItemKey {
    pub fn new(workspace_id: impl Into<String>, item_id: impl Into<Id>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            item_id: item_id.into(),
        }
    }
}

/// Identity of a product-instance master: serial numbers are unique per
/// (workspace, configuration item).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductInstanceMasterKey {
    pub workspace_id: String,
    pub item_id: Id,
    pub serial_number: String,
}

impl ProductInstanceMasterKey {
    pub fn new(
        workspace_id: impl Into<String>,
        item_id: impl Into<Id>,
        serial_number: impl Into<String>,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            item_id: item_id.into(),
            serial_number: serial_number.into(),
        }
    }

    pub fn configuration_item(&self) -> ConfigurationItemKey {
        ConfigurationItemKey::new(self.workspace_id.clone(), self.item_id.clone())
    }
}

/// Identity of one numbered snapshot within a product-instance master.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductInstanceIterationKey {
    #[serde(flatten)]
    pub master: ProductInstanceMasterKey,
    pub iteration: u32,
}

impl ProductInstanceIterationKey {
    pub fn new(master: ProductInstanceMasterKey, iteration: u32) -> Self {
        Self { master, iteration }
    }
}

/// Reference to an external document iteration, used by document links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentIterationKey {
    pub workspace_id: String,
    pub document_id: Id,
    pub iteration: u32,
}

impl DocumentIterationKey {
    pub fn new(
        workspace_id: impl Into<String>,
        document_id: impl Into<Id>,
        iteration: u32,
    ) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            document_id: document_id.into(),
            iteration,
        }
    }
}

const INSTANCE_SEGMENT: &str = "product-instances";

/// Full logical name for a file attached to a product-instance iteration:
/// `{workspace}/product-instances/{serial}/iterations/{n}/{file}`.
pub fn instance_file_full_name(
    workspace_id: &str,
    serial_number: &str,
    iteration: u32,
    file_name: &str,
) -> String {
    format!(
        "{}/{}/{}/iterations/{}/{}",
        workspace_id, INSTANCE_SEGMENT, serial_number, iteration, file_name
    )
}

/// Full logical name for a file attached to a path-data iteration:
/// `{workspace}/product-instances/{serial}/pathdata/{id}/iterations/{n}/{file}`.
pub fn path_data_file_full_name(
    workspace_id: &str,
    serial_number: &str,
    path_data_id: &Id,
    iteration: u32,
    file_name: &str,
) -> String {
    format!(
        "{}/{}/{}/pathdata/{}/iterations/{}/{}",
        workspace_id, INSTANCE_SEGMENT, serial_number, path_data_id, iteration, file_name
    )
}

/// Recover the owning workspace from a composed full name.
pub fn parse_workspace_id(full_name: &str) -> Result<&str, ServiceError> {
    let mut segments = full_name.split('/');
    let workspace = segments.next().unwrap_or_default();
    if workspace.is_empty() || segments.next() != Some(INSTANCE_SEGMENT) {
        return Err(ServiceError::InvalidName(full_name.to_string()));
    }
    Ok(workspace)
}

/// Full name with the final segment (the file name) replaced.
pub fn renamed_full_name(full_name: &str, new_name: &str) -> String {
    match full_name.rsplit_once('/') {
        Some((prefix, _)) => format!("{}/{}", prefix, new_name),
        None => new_name.to_string(),
    }
}

/// The final segment of a full name.
pub fn file_name_of(full_name: &str) -> &str {
    full_name.rsplit('/').next().unwrap_or(full_name)
}
