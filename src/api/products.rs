//! Product catalog API endpoints
//!
//! Reads require any authenticated session; writes additionally pass the
//! products resource guard (admins and distributors).

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde_json::json;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateProductInput, UpdateProductInput};

/// Read-only routes (authenticated)
pub fn read_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products_handler))
        .route("/{id}", get(get_product_handler))
}

/// Write routes (products resource guard)
pub fn write_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_product_handler))
        .route("/{id}", put(update_product_handler))
        .route("/{id}", delete(delete_product_handler))
}

/// GET /api/v1/products?page=&limit=
async fn list_products_handler(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = state
        .product_service
        .list_products(query.page, query.limit)
        .await?;

    Ok(Json(page))
}

/// GET /api/v1/products/{id}
async fn get_product_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.product_service.get_product(id).await?;

    Ok(Json(json!({ "product": product })))
}

/// POST /api/v1/products
async fn create_product_handler(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.product_service.create_product(input).await?;

    Ok((StatusCode::CREATED, Json(json!({ "product": product }))))
}

/// PUT /api/v1/products/{id}
async fn update_product_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateProductInput>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state.product_service.update_product(id, input).await?;

    Ok(Json(json!({ "product": product })))
}

/// DELETE /api/v1/products/{id}
async fn delete_product_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.product_service.delete_product(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
