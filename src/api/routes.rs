use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::api::handlers::{self, AppState};
use crate::store::traits::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Product instances
        .route(
            "/workspaces/:workspace_id/product-instances",
            get(handlers::list_product_instances::<S>),
        )
        .route(
            "/workspaces/:workspace_id/product-instances",
            post(handlers::create_product_instance::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances",
            get(handlers::list_product_instances_for_item::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number",
            get(handlers::get_product_instance::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number",
            patch(handlers::update_product_instance::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number",
            delete(handlers::delete_product_instance::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/rebase",
            post(handlers::rebase_product_instance::<S>),
        )
        // Iterations
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/iterations",
            get(handlers::list_product_instance_iterations::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/iterations/:iteration",
            get(handlers::get_product_instance_iteration::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/iterations/:iteration/parts",
            get(handlers::get_baselined_parts::<S>),
        )
        // ACL administration
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/acl",
            put(handlers::update_acl::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/acl",
            delete(handlers::remove_acl::<S>),
        )
        // Files attached to instance iterations
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/iterations/:iteration/files",
            post(handlers::save_file_in_product_instance::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/iterations/:iteration/files/rename",
            post(handlers::rename_file_in_product_instance::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/iterations/:iteration/files",
            delete(handlers::remove_file_from_product_instance::<S>),
        )
        .route(
            "/files/*full_name",
            get(handlers::get_binary_resource::<S>),
        )
        .route(
            "/pathdata-files/*full_name",
            get(handlers::get_path_data_binary_resource::<S>),
        )
        // Path data
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/pathdata",
            post(handlers::add_path_data::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/pathdata",
            get(handlers::get_path_data_by_path::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/pathdata/:path_data_id",
            get(handlers::get_path_data::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/pathdata/:path_data_id",
            patch(handlers::update_path_data::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/pathdata/:path_data_id",
            delete(handlers::delete_path_data::<S>),
        )
        // Files attached to path-data iterations
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/pathdata/:path_data_id/iterations/:iteration/files",
            post(handlers::save_file_in_path_data::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/pathdata/:path_data_id/iterations/:iteration/files/rename",
            post(handlers::rename_file_in_path_data::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/pathdata/:path_data_id/iterations/:iteration/files",
            delete(handlers::remove_file_from_path_data::<S>),
        )
        // Path-to-path links, scoped to the last iteration
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/path-links",
            get(handlers::get_path_to_path_links_from_source_and_target::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/path-links/types",
            get(handlers::get_path_to_path_link_types::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/path-links/roots",
            get(handlers::get_root_path_to_path_links::<S>),
        )
        .route(
            "/workspaces/:workspace_id/configuration-items/:item_id/product-instances/:serial_number/path-links/:link_id",
            get(handlers::get_path_to_path_link::<S>),
        )
}
