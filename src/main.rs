use axum::serve;
use piv_db_rust::api::routes::create_router;
use piv_db_rust::config::AppConfig;
use piv_db_rust::seed;
use piv_db_rust::{app_state, MemoryDataManager, MemoryStore, MemoryUserManager};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file if it exists
    dotenvy::dotenv().ok();

    // Initialize logging with an explicit default filter
    use env_logger::Builder;
    use log::LevelFilter;

    Builder::new().filter_level(LevelFilter::Info).init();

    println!("PIV-DB: Product Instance Versioning Server");

    // Load configuration
    let config = AppConfig::load()?;
    println!(
        "Configuration loaded: server={}:{}",
        config.server.host, config.server.port
    );

    let store = MemoryStore::new();
    let data_manager = Arc::new(MemoryDataManager::new());
    let user_manager = Arc::new(MemoryUserManager::new());

    // Load seed data for demonstration (optional)
    if config.seed.load_demo_data || std::env::var("LOAD_SEED_DATA").unwrap_or_default() == "true" {
        println!("Loading seed data...");
        seed::load_seed_data(&store, &user_manager).await?;
        println!("Seed data loaded successfully");
    }

    let state = app_state(store, data_manager, user_manager);
    let app = create_router().with_state(state);

    run_server(app, &config).await?;

    Ok(())
}

async fn run_server(app: axum::Router, config: &AppConfig) -> anyhow::Result<()> {
    let bind_address = config.server_address();
    let listener = TcpListener::bind(&bind_address).await?;
    println!("PIV-DB server running on http://{}", bind_address);

    serve(listener, app).await?;

    Ok(())
}
