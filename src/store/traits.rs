use crate::model::{
    BinaryResource, ConfigurationItem, ConfigurationItemKey, Id, PathDataMaster, ProductBaseline,
    ProductInstanceMaster, ProductInstanceMasterKey,
};
use anyhow::Result;

#[async_trait::async_trait]
pub trait ProductInstanceStore: Send + Sync {
    async fn get_product_instance(
        &self,
        key: &ProductInstanceMasterKey,
    ) -> Result<Option<ProductInstanceMaster>>;
    async fn list_product_instances(
        &self,
        workspace_id: &str,
    ) -> Result<Vec<ProductInstanceMaster>>;
    async fn list_product_instances_for_item(
        &self,
        key: &ConfigurationItemKey,
    ) -> Result<Vec<ProductInstanceMaster>>;
    /// Writes are rejected when the incoming revision does not match the
    /// stored row; the typed `Conflict` error crosses this boundary wrapped
    /// in `anyhow`.
    async fn upsert_product_instance(&self, master: ProductInstanceMaster) -> Result<()>;
    async fn delete_product_instance(&self, key: &ProductInstanceMasterKey) -> Result<bool>;
    /// Global path-data lookup, independent of which master the caller
    /// claims owns it. Returns the owning master's key alongside the record.
    async fn find_path_data(
        &self,
        path_data_id: &Id,
    ) -> Result<Option<(ProductInstanceMasterKey, PathDataMaster)>>;
}

#[async_trait::async_trait]
pub trait BaselineStore: Send + Sync {
    async fn get_configuration_item(
        &self,
        key: &ConfigurationItemKey,
    ) -> Result<Option<ConfigurationItem>>;
    async fn upsert_configuration_item(&self, item: ConfigurationItem) -> Result<()>;
    async fn get_baseline(&self, baseline_id: &Id) -> Result<Option<ProductBaseline>>;
    async fn upsert_baseline(&self, baseline: ProductBaseline) -> Result<()>;
}

/// The binary-resource directory: authoritative logical-name → metadata
/// lookup, decoupled from physical byte storage.
#[async_trait::async_trait]
pub trait BinaryResourceStore: Send + Sync {
    async fn get_binary_resource(&self, full_name: &str) -> Result<Option<BinaryResource>>;
    /// Fails when a resource with this full name is already tracked.
    async fn create_binary_resource(&self, resource: BinaryResource) -> Result<()>;
    /// Rewrite the metadata row of an already-tracked resource.
    async fn update_binary_resource(&self, resource: BinaryResource) -> Result<()>;
    /// Returns whether a row was actually removed.
    async fn remove_binary_resource(&self, full_name: &str) -> Result<bool>;
}

pub trait Store: ProductInstanceStore + BaselineStore + BinaryResourceStore + Send + Sync {}
