//! Comment endpoints. The `{id}` segment is a post id for list/create and a
//! comment id for update/delete, mirroring the resource contract.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::error::AppResult;
use crate::storage::comments::CommentExpanded;

use super::{require_principal, AppState};

#[derive(Debug, Deserialize)]
pub struct CommentPayload {
    #[serde(default)]
    pub content: String,
}

/// GET /api/comments/{postId}
pub async fn list(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> AppResult<Json<Vec<CommentExpanded>>> {
    let comments = {
        let store = state.store.0.lock();
        store.list_comments(&post_id)?
    };
    Ok(Json(comments))
}

/// POST /api/comments/{postId}
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(post_id): Path<String>,
    Json(payload): Json<CommentPayload>,
) -> AppResult<impl IntoResponse> {
    let principal = require_principal(&state, &headers)?;
    let comment = {
        let store = state.store.0.lock();
        store.add_comment(&post_id, &principal.user_id, &payload.content)?
    };
    Ok((StatusCode::CREATED, Json(comment)))
}

/// PUT /api/comments/{id}
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(payload): Json<CommentPayload>,
) -> AppResult<Json<CommentExpanded>> {
    let principal = require_principal(&state, &headers)?;
    let comment = {
        let store = state.store.0.lock();
        store.update_comment(&id, &principal, &payload.content)?
    };
    Ok(Json(comment))
}

/// DELETE /api/comments/{id}
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let principal = require_principal(&state, &headers)?;
    {
        let store = state.store.0.lock();
        store.delete_comment(&id, &principal)?;
    }
    Ok(Json(json!({ "message": "comment deleted successfully" })))
}
