//! Post endpoints. Create and update accept multipart form data so an
//! optional `featuredImage` file can ride along with the text fields; the
//! image is written to disk first and cleaned up again when the record
//! write is rejected.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::query::PostQuery;
use crate::storage::posts::{NewPost, PostPatch, PostStatus};

use super::uploads::UploadedImage;
use super::{require_principal, uploads, AppState};

/// Text fields and the optional image part of a post form.
#[derive(Debug, Default)]
struct PostForm {
    title: Option<String>,
    slug: Option<String>,
    content: Option<String>,
    category: Option<String>,
    status: Option<String>,
    image: Option<UploadedImage>,
}

async fn read_post_form(mut multipart: Multipart) -> AppResult<PostForm> {
    let mut form = PostForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation("invalid_multipart".to_string(), e.to_string()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => form.title = Some(text_field(field).await?),
            "slug" => form.slug = Some(text_field(field).await?),
            "content" => form.content = Some(text_field(field).await?),
            "category" => form.category = Some(text_field(field).await?),
            "status" => form.status = Some(text_field(field).await?),
            "featuredImage" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let content_type = field.content_type().unwrap_or("").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation("invalid_multipart".to_string(), e.to_string()))?;
                if !bytes.is_empty() {
                    form.image = Some(UploadedImage { file_name, content_type, bytes });
                }
            }
            // Unknown parts are drained and ignored.
            _ => {
                let _ = field.bytes().await;
            }
        }
    }
    Ok(form)
}

async fn text_field(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation("invalid_multipart".to_string(), e.to_string()))
}

fn parse_status(raw: Option<&str>) -> AppResult<Option<PostStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(s) => Ok(Some(PostStatus::parse(s)?)),
        None => Ok(None),
    }
}

/// GET /api/posts
pub async fn list(
    State(state): State<AppState>,
    Query(q): Query<PostQuery>,
) -> AppResult<Json<serde_json::Value>> {
    let page = {
        let store = state.store.0.lock();
        store.list_posts(&q)?
    };
    Ok(Json(json!({ "success": true, "data": page.data, "pagination": page.pagination })))
}

/// GET /api/posts/{id}
pub async fn get_one(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let post = {
        let store = state.store.0.lock();
        store.get_post(&id)?
    };
    Ok(Json(json!({ "success": true, "data": post })))
}

/// POST /api/posts
pub async fn create(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let principal = require_principal(&state, &headers)?;
    let form = read_post_form(multipart).await?;
    let status = parse_status(form.status.as_deref())?;

    // Image first, record second; a rejected record removes the image.
    let saved_image = match form.image.as_ref() {
        Some(img) => Some(uploads::save_featured_image(&state.config.upload_root, img)?),
        None => None,
    };

    let new = NewPost {
        title: form.title.unwrap_or_default(),
        content: form.content.unwrap_or_default(),
        category: form.category.unwrap_or_default(),
        slug: form.slug,
        status,
        featured_image: saved_image.clone(),
    };
    let result = {
        let store = state.store.0.lock();
        store.create_post(&principal.user_id, new)
    };
    match result {
        Ok(post) => {
            tracing::info!(post = %post.slug, by = %principal.username, "created post");
            Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": post }))))
        }
        Err(e) => {
            if let Some(path) = saved_image.as_deref() {
                uploads::remove_upload(&state.config.upload_root, path);
            }
            Err(e)
        }
    }
}

/// PUT /api/posts/{id}
pub async fn update(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    multipart: Multipart,
) -> AppResult<Json<serde_json::Value>> {
    let principal = require_principal(&state, &headers)?;
    let form = read_post_form(multipart).await?;
    let status = parse_status(form.status.as_deref())?;

    let saved_image = match form.image.as_ref() {
        Some(img) => Some(uploads::save_featured_image(&state.config.upload_root, img)?),
        None => None,
    };

    let patch = PostPatch {
        title: form.title,
        slug: form.slug,
        content: form.content,
        category: form.category,
        status,
        featured_image: saved_image.clone(),
    };
    let result = {
        let store = state.store.0.lock();
        store.update_post(&id, &principal, patch)
    };
    match result {
        Ok(post) => Ok(Json(json!({ "success": true, "data": post }))),
        Err(e) => {
            if let Some(path) = saved_image.as_deref() {
                uploads::remove_upload(&state.config.upload_root, path);
            }
            Err(e)
        }
    }
}

/// DELETE /api/posts/{id}
pub async fn delete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let principal = require_principal(&state, &headers)?;
    {
        let store = state.store.0.lock();
        store.delete_post(&id, &principal)?;
    }
    Ok(Json(json!({ "success": true, "message": "post deleted successfully" })))
}
