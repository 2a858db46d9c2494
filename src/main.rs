//! Tienda - session-authenticated administration backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tienda::{
    api::{self, AppState},
    auth::{GitHubOAuth, SessionManager},
    config::Config,
    db::{
        self,
        repositories::{SqlxProductRepository, SqlxUserRepository},
    },
    services::{ProductService, UserService},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tienda=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting tienda admin backend...");

    // Load configuration (file + TIENDA_* environment overrides)
    let config = Config::load_with_env(Path::new("config.yml"))?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories and services
    let user_service = Arc::new(UserService::new(SqlxUserRepository::boxed(pool.clone())));
    let product_service = Arc::new(ProductService::new(SqlxProductRepository::boxed(
        pool.clone(),
    )));

    let sessions = SessionManager::new(
        &config.auth.session_secret,
        config.auth.session_ttl_hours,
        config.auth.secure_cookies,
    );

    // GitHub OAuth is optional; without credentials the callback fails closed
    let oauth = if config.github.is_configured() {
        let provider = GitHubOAuth::new(
            config.github.client_id.clone(),
            config.github.client_secret.clone(),
        )?;
        tracing::info!("GitHub OAuth enabled");
        Some(Arc::new(provider) as Arc<dyn tienda::auth::OAuthProvider>)
    } else {
        tracing::info!("GitHub OAuth not configured; callback disabled");
        None
    };

    // Build application state
    let state = AppState {
        pool: pool.clone(),
        user_service,
        product_service,
        sessions,
        oauth,
    };

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
