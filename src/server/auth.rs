//! Registration, login, and logout endpoints.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::identity::{AuthProvider, LoginRequest, RegisterRequest};

use super::{bearer_token, AppState};

/// POST /api/auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let grant = state.auth.register(&payload)?;
    tracing::info!(user = %grant.user.username, "registered new account");
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": grant }))))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let grant = state.auth.login(&payload)?;
    Ok((StatusCode::OK, Json(json!({ "success": true, "data": grant }))))
}

/// POST /api/auth/logout - revoke the presented bearer token.
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<impl IntoResponse> {
    let Some(token) = bearer_token(&headers) else {
        return Err(AppError::auth("missing_token", "not authorized, no token provided"));
    };
    state.auth.sessions().logout(&token);
    Ok(Json(json!({ "success": true })))
}
