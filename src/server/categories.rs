//! Category endpoints. Reads are public; creation requires authentication
//! and, when the server is configured that way, the admin role.

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::storage::categories::CategoryView;

use super::{require_principal, AppState};

/// GET /api/categories
pub async fn list(State(state): State<AppState>) -> AppResult<Json<Vec<CategoryView>>> {
    let cats = {
        let store = state.store.0.lock();
        store.list_categories()?
    };
    Ok(Json(cats.iter().map(|c| c.view()).collect()))
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryPayload {
    #[serde(default)]
    pub name: String,
    pub slug: Option<String>,
}

/// Creation policy: any authenticated caller by default, admins only when
/// the server is configured that way.
fn create_allowed(admin_only: bool, principal: &crate::identity::Principal) -> bool {
    !admin_only || principal.is_admin()
}

/// POST /api/categories
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateCategoryPayload>,
) -> AppResult<impl IntoResponse> {
    let principal = require_principal(&state, &headers)?;
    if !create_allowed(state.config.admin_categories, &principal) {
        return Err(AppError::forbidden("admin_required", "admin privileges required"));
    }
    let cat = {
        let store = state.store.0.lock();
        store.create_category(&payload.name, payload.slug.as_deref())?
    };
    tracing::info!(category = %cat.slug, by = %principal.username, "created category");
    Ok((StatusCode::CREATED, Json(cat.view())))
}
