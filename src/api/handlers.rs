use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::ServiceError;
use crate::logic::access::UserManager;
use crate::logic::instance_ops::{DeleteOutcome, ProductInstanceOperations};
use crate::logic::path_data_ops::{PathDataOperations, PathDataOutcome};
use crate::model::{
    AclPermission, BaselinedPart, BinaryResource, ConfigurationItemKey, Id, NewPathData,
    NewProductInstance, PathDataMaster, PathDataUpdate, PathToPathLink, ProductInstanceIteration,
    ProductInstanceIterationKey, ProductInstanceMaster, ProductInstanceMasterKey,
    ProductInstanceUpdate, UserContext,
};
use crate::store::data::{DataManager, StorageWarning};
use crate::store::traits::Store;

/// Everything a handler needs: the store plus the two collaborators the
/// core treats as external.
pub struct ServiceState<S> {
    pub store: S,
    pub data_manager: Arc<dyn DataManager>,
    pub user_manager: Arc<dyn UserManager>,
}

pub type AppState<S> = Arc<ServiceState<S>>;

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub total: usize,
}

impl<T> ListResponse<T> {
    fn new(items: Vec<T>) -> Self {
        let total = items.len();
        Self { items, total }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: ServiceError) -> ApiError {
    let status = match &err {
        ServiceError::MasterNotFound(_)
        | ServiceError::IterationNotFound { .. }
        | ServiceError::PathDataNotFound(_)
        | ServiceError::LinkNotFound(_)
        | ServiceError::BaselineNotFound(_)
        | ServiceError::ConfigurationItemNotFound(_)
        | ServiceError::FileNotFound(_)
        | ServiceError::UserNotFound(_)
        | ServiceError::WorkspaceNotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::AccessDenied(_)
        | ServiceError::UserNotActive(_)
        | ServiceError::NotAllowed(_) => StatusCode::FORBIDDEN,
        ServiceError::AlreadyExists(_)
        | ServiceError::FileAlreadyExists(_)
        | ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::InvalidName(_) => StatusCode::BAD_REQUEST,
        ServiceError::Storage(_) | ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

/// Links and comments are positional pairs; reject mismatches before they
/// reach the core.
fn check_link_arity(links: Option<&[crate::model::DocumentIterationKey]>, comments: &[String]) -> Result<(), ApiError> {
    let link_count = links.map(|l| l.len()).unwrap_or(0);
    let comment_count = if links.is_some() { comments.len() } else { 0 };
    if link_count != comment_count {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(&format!(
                "{} document links paired with {} comments",
                link_count, comment_count
            ))),
        ));
    }
    Ok(())
}

/// Swallowed storage failures are reported here, at the edge, not inside
/// core logic.
fn log_warnings(warnings: &[StorageWarning]) {
    for warning in warnings {
        log::warn!(
            "storage cleanup left bytes behind for '{}': {}",
            warning.full_name,
            warning.detail
        );
    }
}

fn master_key(workspace_id: String, item_id: Id, serial_number: String) -> ProductInstanceMasterKey {
    ProductInstanceMasterKey::new(workspace_id, item_id, serial_number)
}

// ---- product instances ----

pub async fn list_product_instances<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(workspace_id): Path<String>,
) -> Result<Json<ListResponse<ProductInstanceMaster>>, ApiError> {
    ProductInstanceOperations::get_product_instances(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &workspace_id,
    )
    .await
    .map(|items| Json(ListResponse::new(items)))
    .map_err(error_response)
}

pub async fn list_product_instances_for_item<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id)): Path<(String, Id)>,
) -> Result<Json<ListResponse<ProductInstanceMaster>>, ApiError> {
    let key = ConfigurationItemKey::new(workspace_id, item_id);
    ProductInstanceOperations::get_product_instances_for_item(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &key,
    )
    .await
    .map(|items| Json(ListResponse::new(items)))
    .map_err(error_response)
}

pub async fn create_product_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(workspace_id): Path<String>,
    Json(input): Json<NewProductInstance>,
) -> Result<(StatusCode, Json<ProductInstanceMaster>), ApiError> {
    check_link_arity(Some(input.links.as_slice()), &input.link_comments)?;
    ProductInstanceOperations::create_product_instance(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &workspace_id,
        input,
    )
    .await
    .map(|master| (StatusCode::CREATED, Json(master)))
    .map_err(error_response)
}

pub async fn get_product_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
) -> Result<Json<ProductInstanceMaster>, ApiError> {
    ProductInstanceOperations::get_product_instance(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn update_product_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
    Json(update): Json<ProductInstanceUpdate>,
) -> Result<Json<ProductInstanceMaster>, ApiError> {
    check_link_arity(update.links.as_deref(), &update.link_comments)?;
    ProductInstanceOperations::update_product_instance(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        update,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

#[derive(Debug, Deserialize)]
pub struct RebaseRequest {
    pub baseline_id: Id,
}

pub async fn rebase_product_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
    Json(request): Json<RebaseRequest>,
) -> Result<Json<ProductInstanceMaster>, ApiError> {
    ProductInstanceOperations::rebase_product_instance(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &request.baseline_id,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn delete_product_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let outcome = ProductInstanceOperations::delete_product_instance(
        &state.store,
        state.data_manager.as_ref(),
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
    )
    .await
    .map_err(error_response)?;
    log_warnings(&outcome.warnings);
    Ok(Json(outcome))
}

pub async fn list_product_instance_iterations<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
) -> Result<Json<ListResponse<ProductInstanceIteration>>, ApiError> {
    ProductInstanceOperations::get_product_instance_iterations(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
    )
    .await
    .map(|items| Json(ListResponse::new(items)))
    .map_err(error_response)
}

pub async fn get_product_instance_iteration<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, iteration)): Path<(String, Id, String, u32)>,
) -> Result<Json<ProductInstanceIteration>, ApiError> {
    let key = ProductInstanceIterationKey::new(
        master_key(workspace_id, item_id, serial_number),
        iteration,
    );
    ProductInstanceOperations::get_product_instance_iteration(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &key,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn get_baselined_parts<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, iteration)): Path<(String, Id, String, u32)>,
) -> Result<Json<ListResponse<BaselinedPart>>, ApiError> {
    let key = ProductInstanceIterationKey::new(
        master_key(workspace_id, item_id, serial_number),
        iteration,
    );
    ProductInstanceOperations::get_baselined_parts(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &key,
    )
    .await
    .map(|items| Json(ListResponse::new(items)))
    .map_err(error_response)
}

// ---- ACL administration ----

#[derive(Debug, Deserialize)]
pub struct AclRequest {
    #[serde(default)]
    pub user_entries: BTreeMap<String, AclPermission>,
    #[serde(default)]
    pub group_entries: BTreeMap<String, AclPermission>,
}

pub async fn update_acl<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
    Json(request): Json<AclRequest>,
) -> Result<Json<ProductInstanceMaster>, ApiError> {
    ProductInstanceOperations::update_acl(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        request.user_entries,
        request.group_entries,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn remove_acl<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
) -> Result<Json<ProductInstanceMaster>, ApiError> {
    ProductInstanceOperations::remove_acl(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
    )
    .await
    .map(Json)
    .map_err(error_response)
}

// ---- instance files ----

#[derive(Debug, Deserialize)]
pub struct SaveFileRequest {
    pub file_name: String,
    pub size: u64,
}

#[derive(Debug, Deserialize)]
pub struct RenameFileRequest {
    pub full_name: String,
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub full_name: String,
}

pub async fn save_file_in_product_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, iteration)): Path<(String, Id, String, u32)>,
    Json(request): Json<SaveFileRequest>,
) -> Result<(StatusCode, Json<BinaryResource>), ApiError> {
    let key = ProductInstanceIterationKey::new(
        master_key(workspace_id, item_id, serial_number),
        iteration,
    );
    ProductInstanceOperations::save_file_in_product_instance(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &key,
        &request.file_name,
        request.size,
    )
    .await
    .map(|resource| (StatusCode::CREATED, Json(resource)))
    .map_err(error_response)
}

pub async fn rename_file_in_product_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, iteration)): Path<(String, Id, String, u32)>,
    Json(request): Json<RenameFileRequest>,
) -> Result<Json<BinaryResource>, ApiError> {
    ProductInstanceOperations::rename_file_in_product_instance(
        &state.store,
        state.data_manager.as_ref(),
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        iteration,
        &request.full_name,
        &request.new_name,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn remove_file_from_product_instance<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, iteration)): Path<(String, Id, String, u32)>,
    Query(query): Query<FileQuery>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let outcome = ProductInstanceOperations::remove_file_from_product_instance(
        &state.store,
        state.data_manager.as_ref(),
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        iteration,
        &query.full_name,
    )
    .await
    .map_err(error_response)?;
    log_warnings(&outcome.warnings);
    Ok(Json(outcome))
}

pub async fn get_binary_resource<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(full_name): Path<String>,
) -> Result<Json<BinaryResource>, ApiError> {
    ProductInstanceOperations::get_binary_resource(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &full_name,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

// ---- path data ----

pub async fn add_path_data<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
    Json(input): Json<NewPathData>,
) -> Result<(StatusCode, Json<PathDataOutcome>), ApiError> {
    check_link_arity(input.links.as_deref(), &input.link_comments)?;
    let outcome = PathDataOperations::add_path_data(
        &state.store,
        state.data_manager.as_ref(),
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        input,
    )
    .await
    .map_err(error_response)?;
    log_warnings(&outcome.warnings);
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn get_path_data<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, path_data_id)): Path<(String, Id, String, Id)>,
) -> Result<Json<PathDataMaster>, ApiError> {
    PathDataOperations::get_path_data(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &path_data_id,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

#[derive(Debug, Deserialize)]
pub struct PathQuery {
    pub path: String,
}

pub async fn get_path_data_by_path<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
    Query(query): Query<PathQuery>,
) -> Result<Json<PathDataMaster>, ApiError> {
    PathDataOperations::get_path_data_by_path(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &query.path,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn update_path_data<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, path_data_id)): Path<(String, Id, String, Id)>,
    Json(update): Json<PathDataUpdate>,
) -> Result<Json<PathDataMaster>, ApiError> {
    check_link_arity(update.links.as_deref(), &update.link_comments)?;
    PathDataOperations::update_path_data(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &path_data_id,
        update,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn delete_path_data<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, path_data_id)): Path<(String, Id, String, Id)>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let outcome = PathDataOperations::delete_path_data(
        &state.store,
        state.data_manager.as_ref(),
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &path_data_id,
    )
    .await
    .map_err(error_response)?;
    log_warnings(&outcome.warnings);
    Ok(Json(outcome))
}

// ---- path data files ----

pub async fn save_file_in_path_data<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, path_data_id, iteration)): Path<(
        String,
        Id,
        String,
        Id,
        u32,
    )>,
    Json(request): Json<SaveFileRequest>,
) -> Result<(StatusCode, Json<BinaryResource>), ApiError> {
    PathDataOperations::save_file_in_path_data(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &path_data_id,
        iteration,
        &request.file_name,
        request.size,
    )
    .await
    .map(|resource| (StatusCode::CREATED, Json(resource)))
    .map_err(error_response)
}

pub async fn rename_file_in_path_data<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, path_data_id, iteration)): Path<(
        String,
        Id,
        String,
        Id,
        u32,
    )>,
    Json(request): Json<RenameFileRequest>,
) -> Result<Json<BinaryResource>, ApiError> {
    PathDataOperations::rename_file_in_path_data(
        &state.store,
        state.data_manager.as_ref(),
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &path_data_id,
        iteration,
        &request.full_name,
        &request.new_name,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn remove_file_from_path_data<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, path_data_id, iteration)): Path<(
        String,
        Id,
        String,
        Id,
        u32,
    )>,
    Query(query): Query<FileQuery>,
) -> Result<Json<DeleteOutcome>, ApiError> {
    let outcome = PathDataOperations::remove_file_from_path_data(
        &state.store,
        state.data_manager.as_ref(),
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &path_data_id,
        iteration,
        &query.full_name,
    )
    .await
    .map_err(error_response)?;
    log_warnings(&outcome.warnings);
    Ok(Json(outcome))
}

pub async fn get_path_data_binary_resource<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(full_name): Path<String>,
) -> Result<Json<BinaryResource>, ApiError> {
    PathDataOperations::get_path_data_binary_resource(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &full_name,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

// ---- path-to-path links ----

pub async fn get_path_to_path_link<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number, link_id)): Path<(String, Id, String, Id)>,
) -> Result<Json<PathToPathLink>, ApiError> {
    PathDataOperations::get_path_to_path_link(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &link_id,
    )
    .await
    .map(Json)
    .map_err(error_response)
}

pub async fn get_path_to_path_link_types<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
) -> Result<Json<ListResponse<String>>, ApiError> {
    PathDataOperations::get_path_to_path_link_types(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
    )
    .await
    .map(|items| Json(ListResponse::new(items)))
    .map_err(error_response)
}

#[derive(Debug, Deserialize)]
pub struct SourceTargetQuery {
    pub source: String,
    pub target: String,
}

pub async fn get_path_to_path_links_from_source_and_target<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
    Query(query): Query<SourceTargetQuery>,
) -> Result<Json<ListResponse<PathToPathLink>>, ApiError> {
    PathDataOperations::get_path_to_path_links_from_source_and_target(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &query.source,
        &query.target,
    )
    .await
    .map(|items| Json(ListResponse::new(items)))
    .map_err(error_response)
}

#[derive(Debug, Deserialize)]
pub struct LinkTypeQuery {
    #[serde(rename = "type")]
    pub link_type: String,
}

pub async fn get_root_path_to_path_links<S: Store>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path((workspace_id, item_id, serial_number)): Path<(String, Id, String)>,
    Query(query): Query<LinkTypeQuery>,
) -> Result<Json<ListResponse<PathToPathLink>>, ApiError> {
    PathDataOperations::get_root_path_to_path_links(
        &state.store,
        state.user_manager.as_ref(),
        &user.user_id,
        &master_key(workspace_id, item_id, serial_number),
        &query.link_type,
    )
    .await
    .map(|items| Json(ListResponse::new(items)))
    .map_err(error_response)
}
