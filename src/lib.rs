pub mod api;
pub mod config;
pub mod error;
pub mod logic;
pub mod model;
pub mod seed;
pub mod store;

// Export API types
pub use api::handlers;
pub use api::routes;

// Export the error taxonomy
pub use error::{ServiceError, StorageError};

// Export logic types
pub use logic::{
    check_product_instance_read_access, check_product_instance_write_access, DeleteOutcome,
    PathDataOperations, PathDataOutcome, ProductInstanceOperations, UserManager,
};

// Export all model types
pub use model::*;

// Export store types
pub use store::{
    BaselineStore, BinaryResourceStore, DataManager, MemoryDataManager, MemoryStore,
    MemoryUserManager, ProductInstanceStore, StorageWarning, Store,
};

use std::sync::Arc;

/// Build the shared state the router runs against.
pub fn app_state(
    store: MemoryStore,
    data_manager: Arc<dyn DataManager>,
    user_manager: Arc<MemoryUserManager>,
) -> api::handlers::AppState<MemoryStore> {
    Arc::new(api::handlers::ServiceState {
        store,
        data_manager,
        user_manager,
    })
}

// Function for integration testing
pub async fn run_server() -> anyhow::Result<()> {
    use axum::serve;
    use tokio::net::TcpListener;

    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with INFO level only (suppress DEBUG logs)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();

    // Load configuration
    let config = crate::config::AppConfig::load()?;

    let store = MemoryStore::new();
    let data_manager = Arc::new(MemoryDataManager::new());
    let user_manager = Arc::new(MemoryUserManager::new());

    if config.seed.load_demo_data {
        seed::load_seed_data(&store, &user_manager).await?;
    }

    let state = app_state(store, data_manager, user_manager);
    let app = crate::api::routes::create_router().with_state(state);

    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;

    serve(listener, app).await?;

    Ok(())
}
