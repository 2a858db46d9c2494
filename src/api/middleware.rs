//! API middleware
//!
//! Authentication middleware resolving the session cookie (or Bearer
//! token) into a request-scoped `AuthenticatedUser` extension, plus the
//! per-resource authorization guards and the shared `ApiError` envelope.
//!
//! A missing token, a tampered token and an expired token all surface as
//! the same 401; the response never reveals which check failed.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::auth::oauth::{OAuthError, OAuthProvider};
use crate::auth::session::{SessionManager, SessionState, SESSION_COOKIE};
use crate::auth::{can_access, Resource};
use crate::models::User;
use crate::services::product::ProductServiceError;
use crate::services::user::UserServiceError;
use crate::services::{ProductService, UserService};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: crate::db::DynDatabasePool,
    pub user_service: Arc<UserService>,
    pub product_service: Arc<ProductService>,
    pub sessions: SessionManager,
    pub oauth: Option<Arc<dyn OAuthProvider>>,
}

/// Authenticated user extracted from request
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))
    }
}

/// Error response for API errors
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error: ApiErrorDetail {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new("UNAUTHORIZED", message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new("FORBIDDEN", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("NOT_FOUND", message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new("CONFLICT", message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new("INTERNAL_ERROR", message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.error.code.as_str() {
            "UNAUTHORIZED" => StatusCode::UNAUTHORIZED,
            "FORBIDDEN" => StatusCode::FORBIDDEN,
            "NOT_FOUND" => StatusCode::NOT_FOUND,
            "VALIDATION_ERROR" => StatusCode::BAD_REQUEST,
            "CONFLICT" => StatusCode::CONFLICT,
            "UPSTREAM_ERROR" => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(self)).into_response()
    }
}

impl From<UserServiceError> for ApiError {
    fn from(err: UserServiceError) -> Self {
        match err {
            UserServiceError::InvalidCredentials => {
                ApiError::unauthorized(err.to_string())
            }
            UserServiceError::Validation(fields) => ApiError::with_details(
                "VALIDATION_ERROR",
                "Validation failed",
                serde_json::json!(fields),
            ),
            UserServiceError::EmailExists(_) => ApiError::conflict(err.to_string()),
            UserServiceError::NotFound => ApiError::not_found(err.to_string()),
            UserServiceError::Internal(e) => {
                tracing::error!(error = %e, "User service failure");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<ProductServiceError> for ApiError {
    fn from(err: ProductServiceError) -> Self {
        match err {
            ProductServiceError::Validation(fields) => ApiError::with_details(
                "VALIDATION_ERROR",
                "Validation failed",
                serde_json::json!(fields),
            ),
            ProductServiceError::NotFound => ApiError::not_found(err.to_string()),
            ProductServiceError::Internal(e) => {
                tracing::error!(error = %e, "Product service failure");
                ApiError::internal_error("Internal server error")
            }
        }
    }
}

impl From<OAuthError> for ApiError {
    fn from(err: OAuthError) -> Self {
        // Log the real cause; the client only learns it was an auth failure
        tracing::warn!(error = %err, "OAuth exchange failed");
        ApiError::new("UPSTREAM_ERROR", "Authentication error")
    }
}

/// Extract session token from request (Bearer header first, then cookie)
fn extract_session_token(request: &Request) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    if let Some(cookie_header) = request.headers().get(header::COOKIE) {
        if let Ok(cookie_str) = cookie_header.to_str() {
            for cookie in cookie_str.split(';') {
                let cookie = cookie.trim();
                if let Some(rest) = cookie.strip_prefix(SESSION_COOKIE) {
                    if let Some(token) = rest.strip_prefix('=') {
                        return Some(token.to_string());
                    }
                }
            }
        }
    }

    None
}

/// Authentication middleware.
///
/// Resolves the session token to its claims, re-checks that the account
/// still exists (soft-deleted accounts lose their sessions immediately) and
/// attaches the user to the request.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request);

    let claims = match state.sessions.resolve(token.as_deref()) {
        SessionState::Authenticated(claims) => claims,
        SessionState::Anonymous | SessionState::Expired => {
            return Err(ApiError::unauthorized("Invalid or expired session"));
        }
    };

    let user = state
        .user_service
        .current_user(claims.user_id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid or expired session"))?;

    request.extensions_mut().insert(AuthenticatedUser(user));
    Ok(next.run(request).await)
}

/// Authorization guard for the users administration resource
pub async fn require_users_access(request: Request, next: Next) -> Result<Response, ApiError> {
    require_resource(Resource::Users, request, next).await
}

/// Authorization guard for the products administration resource
pub async fn require_products_access(request: Request, next: Next) -> Result<Response, ApiError> {
    require_resource(Resource::Products, request, next).await
}

/// Authorization guard for the settings resource
pub async fn require_settings_access(request: Request, next: Next) -> Result<Response, ApiError> {
    require_resource(Resource::Settings, request, next).await
}

async fn require_resource(
    resource: Resource,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthenticatedUser>()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

    if !can_access(user.0.role, resource) {
        return Err(ApiError::forbidden("Insufficient permissions"));
    }

    Ok(next.run(request).await)
}
