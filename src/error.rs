use thiserror::Error;

use crate::model::{ConfigurationItemKey, Id, ProductInstanceMasterKey};

/// Failure from the physical byte store collaborator.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("no stored data for '{0}'")]
    NotFound(String),
    #[error("storage failure for '{full_name}': {detail}")]
    Io { full_name: String, detail: String },
}

/// Every failure the service surfaces, with enough context to render a
/// message for the offending key or name.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("product instance '{}' of '{}' not found in workspace '{}'",
        .0.serial_number, .0.item_id, .0.workspace_id)]
    MasterNotFound(ProductInstanceMasterKey),
    #[error("iteration {iteration} not found for product instance '{serial_number}'")]
    IterationNotFound {
        serial_number: String,
        iteration: u32,
    },
    #[error("path data '{0}' not found")]
    PathDataNotFound(Id),
    #[error("path-to-path link '{0}' not found")]
    LinkNotFound(Id),
    #[error("baseline '{0}' not found")]
    BaselineNotFound(Id),
    #[error("configuration item '{}' not found in workspace '{}'", .0.item_id, .0.workspace_id)]
    ConfigurationItemNotFound(ConfigurationItemKey),
    #[error("file '{0}' not found")]
    FileNotFound(String),
    #[error("user '{0}' not found")]
    UserNotFound(String),
    #[error("user '{0}' is not active")]
    UserNotActive(String),
    #[error("workspace '{0}' not found")]
    WorkspaceNotFound(String),

    #[error("access denied for user '{0}'")]
    AccessDenied(String),

    #[error("product instance '{0}' already exists")]
    AlreadyExists(String),
    #[error("file '{0}' already exists")]
    FileAlreadyExists(String),

    #[error("invalid name '{0}'")]
    InvalidName(String),

    #[error("not allowed: {0}")]
    NotAllowed(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("conflicting concurrent update on product instance '{0}'")]
    Conflict(String),

    #[error(transparent)]
    Internal(anyhow::Error),
}

/// Store traits speak `anyhow::Result`; typed failures raised inside a store
/// (e.g. `Conflict`) are recovered here instead of collapsing to `Internal`.
impl From<anyhow::Error> for ServiceError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<ServiceError>() {
            Ok(service_err) => service_err,
            Err(err) => ServiceError::Internal(err),
        }
    }
}
