//! User administration API endpoints
//!
//! CRUD over accounts for the users screen. The whole router sits behind
//! `require_auth` plus the users resource guard, so only admins get here.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::json;

use crate::api::common::PaginationQuery;
use crate::api::middleware::{ApiError, AppState};
use crate::models::{CreateUserInput, UpdateUserInput};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users_handler).post(create_user_handler))
        .route("/{id}", put(update_user_handler).delete(delete_user_handler))
}

/// GET /api/v1/admin/users?page=&limit=
async fn list_users_handler(
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let page = query.page.max(1);
    let per_page = query.limit.clamp(1, 100);

    let (users, total) = state.user_service.list_users(page, per_page).await?;

    let total_pages = if total == 0 {
        1
    } else {
        (total + per_page - 1) / per_page
    };

    Ok(Json(json!({
        "users": users,
        "pagination": {
            "current_page": page,
            "total_pages": total_pages,
            "total_users": total,
        },
    })))
}

/// POST /api/v1/admin/users
async fn create_user_handler(
    State(state): State<AppState>,
    Json(input): Json<CreateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.create_user(input).await?;

    Ok((StatusCode::CREATED, Json(json!({ "user": user }))))
}

/// PUT /api/v1/admin/users/{id}
async fn update_user_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(input): Json<UpdateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.update_user(id, input).await?;

    Ok(Json(json!({ "user": user })))
}

/// DELETE /api/v1/admin/users/{id}
///
/// Soft delete: the account disappears from listings and its sessions stop
/// resolving, but the row is retained.
async fn delete_user_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    state.user_service.delete_user(id).await?;

    Ok(StatusCode::NO_CONTENT)
}
