use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::StorageError;
use crate::model::BinaryResource;

/// Record of a storage failure that was swallowed on a destructive path.
/// Returned alongside the successful result instead of being logged from
/// core logic; the caller decides how to report it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StorageWarning {
    pub full_name: String,
    pub detail: String,
}

impl StorageWarning {
    pub fn new(full_name: impl Into<String>, error: &StorageError) -> Self {
        Self {
            full_name: full_name.into(),
            detail: error.to_string(),
        }
    }
}

/// Physical byte store collaborator. Metadata and byte operations are
/// sequenced by the caller; a failed byte operation must leave the old
/// bytes valid.
#[async_trait::async_trait]
pub trait DataManager: Send + Sync {
    async fn delete_data(&self, resource: &BinaryResource) -> Result<(), StorageError>;
    async fn copy_data(
        &self,
        source: &BinaryResource,
        target: &BinaryResource,
    ) -> Result<(), StorageError>;
    async fn rename_file(
        &self,
        resource: &BinaryResource,
        new_name: &str,
    ) -> Result<(), StorageError>;
}

/// Blob store keyed by full logical name, for tests and the demo binary.
#[derive(Debug, Default)]
pub struct MemoryDataManager {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryDataManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage bytes under a full name, as an upload would.
    pub fn put_data(&self, full_name: impl Into<String>, bytes: Vec<u8>) {
        self.blobs.write().insert(full_name.into(), bytes);
    }

    pub fn read_data(&self, full_name: &str) -> Option<Vec<u8>> {
        self.blobs.read().get(full_name).cloned()
    }

    pub fn has_data(&self, full_name: &str) -> bool {
        self.blobs.read().contains_key(full_name)
    }
}

#[async_trait::async_trait]
impl DataManager for MemoryDataManager {
    async fn delete_data(&self, resource: &BinaryResource) -> Result<(), StorageError> {
        self.blobs
            .write()
            .remove(&resource.full_name)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(resource.full_name.clone()))
    }

    async fn copy_data(
        &self,
        source: &BinaryResource,
        target: &BinaryResource,
    ) -> Result<(), StorageError> {
        let mut blobs = self.blobs.write();
        let bytes = blobs
            .get(&source.full_name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(source.full_name.clone()))?;
        blobs.insert(target.full_name.clone(), bytes);
        Ok(())
    }

    async fn rename_file(
        &self,
        resource: &BinaryResource,
        new_name: &str,
    ) -> Result<(), StorageError> {
        let new_full_name = resource.renamed_full_name(new_name);
        let mut blobs = self.blobs.write();
        let bytes = blobs
            .remove(&resource.full_name)
            .ok_or_else(|| StorageError::NotFound(resource.full_name.clone()))?;
        blobs.insert(new_full_name, bytes);
        Ok(())
    }
}
