//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        storage::STORAGE_ROUTE, AdminBootstrap, LocalFunctionRunner, LocalObjectStorage,
        OpenAiAnalysisAdapter, PgAuthAdapter, PgRowStore, UnconfiguredAnalysisModel,
    },
    config::Config,
    error::ApiError,
    web::{self, rest::ApiDoc, state::AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    Router,
};
use campus_portal_core::{
    admin::ensure_admin,
    attendance::AttendanceService,
    ports::{AnalysisModel, AuthProvider, ObjectStorage, RowStore},
    profile::ProfileService,
    pyq::PyqAnalyzer,
    resources::ResourceService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let row_store = Arc::new(PgRowStore::new(db_pool.clone()));
    info!("Running database migrations...");
    row_store.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Adapters & Services ---
    let rows: Arc<dyn RowStore> = row_store;
    let auth: Arc<dyn AuthProvider> =
        Arc::new(PgAuthAdapter::new(db_pool, config.session_ttl_days));
    let storage = LocalObjectStorage::new(config.storage_root.clone(), &config.public_base_url);
    tokio::fs::create_dir_all(storage.root()).await?;
    let storage_dir = storage.root().to_path_buf();
    let storage: Arc<dyn ObjectStorage> = Arc::new(storage);

    let model: Arc<dyn AnalysisModel> = match &config.openai_api_key {
        Some(key) => {
            let client = Client::with_config(OpenAIConfig::new().with_api_key(key));
            Arc::new(OpenAiAnalysisAdapter::new(client, config.analysis_model.clone()))
        }
        None => {
            warn!("OPENAI_API_KEY is not set; question paper analysis is disabled.");
            Arc::new(UnconfiguredAnalysisModel)
        }
    };

    let profiles = Arc::new(ProfileService::new(rows.clone(), storage.clone()));
    let attendance = Arc::new(AttendanceService::new(rows.clone()));
    let resources = Arc::new(ResourceService::new(rows, storage));

    // --- 4. Bootstrap the Admin Account ---
    let admin = match &config.admin {
        Some(identity) => {
            let outcome = ensure_admin(auth.as_ref(), &profiles, identity).await?;
            info!(email = %identity.email, ?outcome, "Admin account ready");
            Some(AdminBootstrap {
                auth: auth.clone(),
                profiles: profiles.clone(),
                identity: identity.clone(),
            })
        }
        None => {
            info!("No admin identity configured; skipping admin bootstrap.");
            None
        }
    };
    let functions = Arc::new(LocalFunctionRunner::new(PyqAnalyzer::new(model), admin));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        auth,
        profiles,
        attendance,
        resources,
        functions,
    });

    let origin = config.cors_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!("Invalid CORS origin '{}': {}", config.cors_origin, e))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    let api_router = web::router(app_state)
        .nest_service(STORAGE_ROUTE, ServeDir::new(storage_dir))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024 + 64 * 1024))
        .layer(cors);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
