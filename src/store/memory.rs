use anyhow::{anyhow, Result};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::ServiceError;
use crate::logic::access::UserManager;
use crate::model::{
    BinaryResource, ConfigurationItem, ConfigurationItemKey, Id, PathDataMaster, ProductBaseline,
    ProductInstanceMaster, ProductInstanceMasterKey, User,
};
use crate::store::traits::{BaselineStore, BinaryResourceStore, ProductInstanceStore, Store};

/// Reference store keeping every entity in process memory. Writes are
/// serialized by the lock; the revision check on master upsert is what a
/// database-backed store would express as an optimistic version column.
#[derive(Debug, Default)]
pub struct MemoryStore {
    product_instances: RwLock<HashMap<ProductInstanceMasterKey, ProductInstanceMaster>>,
    configuration_items: RwLock<HashMap<ConfigurationItemKey, ConfigurationItem>>,
    baselines: RwLock<HashMap<Id, ProductBaseline>>,
    binary_resources: RwLock<HashMap<String, BinaryResource>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl ProductInstanceStore for MemoryStore {
    async fn get_product_instance(
        &self,
        key: &ProductInstanceMasterKey,
    ) -> Result<Option<ProductInstanceMaster>> {
        Ok(self.product_instances.read().await.get(key).cloned())
    }

    async fn list_product_instances(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<ProductInstanceMaster>> {
        let mut masters: Vec<ProductInstanceMaster> = self
            .product_instances
            .read()
            .await
            .values()
            .filter(|m| m.instance_of.workspace_id == workspace_id)
            .cloned()
            .collect();
        masters.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
        Ok(masters)
    }

    async fn list_product_instances_for_item(
        &self,
        key: &ConfigurationItemKey,
    ) -> Result<Vec<ProductInstanceMaster>> {
        let mut masters: Vec<ProductInstanceMaster> = self
            .product_instances
            .read()
            .await
            .values()
            .filter(|m| &m.instance_of == key)
            .cloned()
            .collect();
        masters.sort_by(|a, b| a.serial_number.cmp(&b.serial_number));
        Ok(masters)
    }

    async fn upsert_product_instance(&self, mut master: ProductInstanceMaster) -> Result<()> {
        let mut masters = self.product_instances.write().await;
        let key = master.key();
        if let Some(existing) = masters.get(&key) {
            if existing.revision != master.revision {
                return Err(anyhow::Error::new(ServiceError::Conflict(
                    master.serial_number.clone(),
                )));
            }
        }
        master.revision += 1;
        masters.insert(key, master);
        Ok(())
    }

    async fn delete_product_instance(&self, key: &ProductInstanceMasterKey) -> Result<bool> {
        Ok(self.product_instances.write().await.remove(key).is_some())
    }

    async fn find_path_data(
        &self,
        path_data_id: &Id,
    ) -> Result<Option<(ProductInstanceMasterKey, PathDataMaster)>> {
        let masters = self.product_instances.read().await;
        for master in masters.values() {
            if let Some(path_data) = master.path_data(path_data_id) {
                return Ok(Some((master.key(), path_data.clone())));
            }
        }
        Ok(None)
    }
}

#[async_trait::async_trait]
impl BaselineStore for MemoryStore {
    async fn get_configuration_item(
        &self,
        key: &ConfigurationItemKey,
    ) -> Result<Option<ConfigurationItem>> {
        Ok(self.configuration_items.read().await.get(key).cloned())
    }

    async fn upsert_configuration_item(&self, item: ConfigurationItem) -> Result<()> {
        self.configuration_items
            .write()
            .await
            .insert(item.key(), item);
        Ok(())
    }

    async fn get_baseline(&self, baseline_id: &Id) -> Result<Option<ProductBaseline>> {
        Ok(self.baselines.read().await.get(baseline_id).cloned())
    }

    async fn upsert_baseline(&self, baseline: ProductBaseline) -> Result<()> {
        self.baselines
            .write()
            .await
            .insert(baseline.id.clone(), baseline);
        Ok(())
    }
}

#[async_trait::async_trait]
impl BinaryResourceStore for MemoryStore {
    async fn get_binary_resource(&self, full_name: &str) -> Result<Option<BinaryResource>> {
        Ok(self.binary_resources.read().await.get(full_name).cloned())
    }

    async fn create_binary_resource(&self, resource: BinaryResource) -> Result<()> {
        let mut resources = self.binary_resources.write().await;
        if resources.contains_key(&resource.full_name) {
            return Err(anyhow::Error::new(ServiceError::FileAlreadyExists(
                resource.full_name.clone(),
            )));
        }
        resources.insert(resource.full_name.clone(), resource);
        Ok(())
    }

    async fn update_binary_resource(&self, resource: BinaryResource) -> Result<()> {
        let mut resources = self.binary_resources.write().await;
        if !resources.contains_key(&resource.full_name) {
            return Err(anyhow!("binary resource '{}' is not tracked", resource.full_name));
        }
        resources.insert(resource.full_name.clone(), resource);
        Ok(())
    }

    async fn remove_binary_resource(&self, full_name: &str) -> Result<bool> {
        Ok(self.binary_resources.write().await.remove(full_name).is_some())
    }
}

impl Store for MemoryStore {}

/// One workspace member together with workspace-level write membership.
#[derive(Debug, Clone)]
struct Membership {
    user: User,
    write_access: bool,
}

/// User-management collaborator backed by in-memory workspace rosters,
/// used by the server binary, the seed loader and the tests.
#[derive(Debug, Default)]
pub struct MemoryUserManager {
    workspaces: RwLock<HashMap<String, HashMap<String, Membership>>>,
}

impl MemoryUserManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_workspace(&self, workspace_id: impl Into<String>) {
        self.workspaces
            .write()
            .await
            .entry(workspace_id.into())
            .or_default();
    }

    /// Register a member. `write_access` is the workspace-level default an
    /// ACL-less master defers to; administrators always pass.
    pub async fn add_member(&self, user: User, write_access: bool) {
        let mut workspaces = self.workspaces.write().await;
        workspaces
            .entry(user.workspace_id.clone())
            .or_default()
            .insert(user.login.clone(), Membership { user, write_access });
    }

    async fn member(&self, workspace_id: &str, login: &str) -> Result<Membership, ServiceError> {
        let workspaces = self.workspaces.read().await;
        let members = workspaces
            .get(workspace_id)
            .ok_or_else(|| ServiceError::WorkspaceNotFound(workspace_id.to_string()))?;
        let membership = members
            .get(login)
            .ok_or_else(|| ServiceError::UserNotFound(login.to_string()))?;
        if !membership.user.active {
            return Err(ServiceError::UserNotActive(login.to_string()));
        }
        Ok(membership.clone())
    }
}

#[async_trait::async_trait]
impl UserManager for MemoryUserManager {
    async fn check_workspace_read_access(
        &self,
        workspace_id: &str,
        login: &str,
    ) -> Result<User, ServiceError> {
        Ok(self.member(workspace_id, login).await?.user)
    }

    async fn check_workspace_write_access(
        &self,
        workspace_id: &str,
        login: &str,
    ) -> Result<User, ServiceError> {
        let membership = self.member(workspace_id, login).await?;
        if membership.user.administrator || membership.write_access {
            Ok(membership.user)
        } else {
            Err(ServiceError::AccessDenied(login.to_string()))
        }
    }
}
