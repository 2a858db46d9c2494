//! API layer - HTTP handlers and routing
//!
//! Route groups:
//! - `/auth` - registration, login, OAuth callback, logout, current user
//! - `/admin/users` - account administration (users resource)
//! - `/products` - catalog reads for any session, writes for the products
//!   resource
//! - `/settings` - self-service profile (settings resource)

pub mod auth;
pub mod common;
pub mod middleware;
pub mod products;
pub mod settings;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    let users_routes = users::router()
        .route_layer(axum_middleware::from_fn(middleware::require_users_access));

    let products_routes = products::read_router().merge(
        products::write_router()
            .route_layer(axum_middleware::from_fn(middleware::require_products_access)),
    );

    let settings_routes = settings::router()
        .route_layer(axum_middleware::from_fn(middleware::require_settings_access));

    // Everything below requires a resolved session
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/admin/users", users_routes)
        .nest("/products", products_routes)
        .nest("/settings", settings_routes)
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            middleware::require_auth,
        ));

    Router::new()
        .nest("/auth", auth::public_router())
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(
            cors_origin
                .parse::<HeaderValue>()
                .unwrap_or_else(|_| HeaderValue::from_static("http://localhost:5173")),
        )
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Router::new()
        .nest("/api/v1", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
