//! Account settings API endpoints
//!
//! Self-service profile read/update behind the settings resource guard.
//! Role changes are silently ignored here; those belong to the users
//! administration endpoints.

use axum::{
    extract::State,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::models::UpdateUserInput;

pub fn router() -> Router<AppState> {
    Router::new().route("/profile", get(get_profile_handler).put(update_profile_handler))
}

/// GET /api/v1/settings/profile
async fn get_profile_handler(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    Json(json!({ "user": user }))
}

/// PUT /api/v1/settings/profile
async fn update_profile_handler(
    State(state): State<AppState>,
    AuthenticatedUser(user): AuthenticatedUser,
    Json(input): Json<UpdateUserInput>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state.user_service.update_profile(user.id, input).await?;

    Ok(Json(json!({ "user": updated })))
}
