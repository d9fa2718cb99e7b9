use club_manager::{
    config::{self, database},
    core::credentials::CredentialStore,
    documents::SqlDocuments,
    errors::Result,
    server::{self, AppState, session::SessionStore},
};
use dotenvy::dotenv;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize tracing (as early as possible)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load .env file; env vars may also be set externally
    dotenv().ok();
    info!("Attempted to load .env file.");

    // 3. Load the main application configuration
    let app_config = config::load_app_configuration()
        .inspect_err(|e| error!("Critical error loading application configuration: {}", e))?;

    // 4. Open the relational pool and ensure the schema
    let db = database::create_connection(&app_config.database)
        .await
        .inspect_err(|e| error!("Failed to connect to database: {}", e))?;
    database::create_tables(&db)
        .await
        .inspect(|()| info!("Database schema ensured."))
        .inspect_err(|e| error!("Failed to create tables: {}", e))?;

    // 5. Seed the bootstrap admin
    let credentials = CredentialStore::new();
    let admin = &app_config.admin;
    credentials
        .ensure_admin(
            &db,
            &admin.username,
            admin.password.as_deref(),
            &admin.full_name,
        )
        .await
        .inspect(|created| {
            if *created {
                info!("Bootstrap admin account created.");
            }
        })
        .inspect_err(|e| error!("Failed to seed admin account: {}", e))?;

    // 6. Serve
    let state = AppState::new(
        db,
        credentials,
        Arc::new(SqlDocuments::new(&app_config.documents)),
        SessionStore::new(app_config.session.ttl_hours),
    );
    server::run_server(&app_config.server, state).await
}
