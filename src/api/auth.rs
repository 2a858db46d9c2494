//! Authentication API endpoints
//!
//! Registration, credential login, GitHub OAuth callback, logout and the
//! current-user endpoint. Successful login (either kind) sets the session
//! cookie; the login response also carries the role landing route so the
//! client knows where to navigate.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::api::middleware::{ApiError, AppState, AuthenticatedUser};
use crate::auth::landing_route;
use crate::services::user::RegisterInput;

/// Public authentication routes (no session required)
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register_handler))
        .route("/login", post(login_handler))
        .route("/github/callback", get(github_callback_handler))
        .route("/logout", post(logout_handler))
}

/// Authentication routes requiring a valid session
pub fn protected_router() -> Router<AppState> {
    Router::new().route("/me", get(me_handler))
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: String,
}

/// POST /api/v1/auth/register
///
/// Creates an account and logs it in immediately.
async fn register_handler(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.register(input).await?;
    let token = state.sessions.issue(&user);
    let cookie = state.sessions.session_cookie(&token);

    tracing::info!(user_id = user.id, "User registered");

    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "status": "success",
            "user": user,
            "redirect_to": landing_route(user.role),
        })),
    ))
}

/// POST /api/v1/auth/login
///
/// Every failure produces the same generic 401 and sets no cookie.
async fn login_handler(
    State(state): State<AppState>,
    Json(input): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state.user_service.login(&input.email, &input.password).await?;
    let token = state.sessions.issue(&user);
    let cookie = state.sessions.session_cookie(&token);

    tracing::info!(user_id = user.id, "User logged in");

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(json!({
            "status": "success",
            "message": "Login successful",
            "user": user,
            "redirect_to": landing_route(user.role),
        })),
    ))
}

/// GET /api/v1/auth/github/callback?code=...
///
/// Browser navigation endpoint: on success it sets the session cookie and
/// redirects (303) to the role's landing route. Any provider failure
/// surfaces as an opaque error with no cookie.
async fn github_callback_handler(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let oauth = state.oauth.as_ref().ok_or_else(|| {
        tracing::warn!("GitHub OAuth callback hit but no provider is configured");
        ApiError::new("UPSTREAM_ERROR", "Authentication error")
    })?;

    let profile = oauth.exchange_code(&query.code).await?;
    let user = state.user_service.login_github(profile).await?;
    let token = state.sessions.issue(&user);
    let cookie = state.sessions.session_cookie(&token);

    tracing::info!(user_id = user.id, "User logged in via GitHub");

    Ok((
        StatusCode::SEE_OTHER,
        [
            (header::SET_COOKIE, cookie),
            (header::LOCATION, landing_route(user.role).to_string()),
        ],
    ))
}

/// POST /api/v1/auth/logout
///
/// Clears the session cookie. Safe to call without a session.
async fn logout_handler(State(state): State<AppState>) -> impl IntoResponse {
    let cookie = state.sessions.clear_cookie();

    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)])
}

/// GET /api/v1/auth/me
async fn me_handler(AuthenticatedUser(user): AuthenticatedUser) -> impl IntoResponse {
    Json(json!({ "user": user }))
}
