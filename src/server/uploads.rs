//! Featured-image upload handling and static serving.
//!
//! Files are written to the upload folder before the post record is saved;
//! the caller removes the file again when the record write fails, so a
//! rejected post does not leave an orphan behind.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};

use crate::error::{AppError, AppResult};

use super::AppState;

/// Upload cap, matching the original 2 MiB limit.
const MAX_IMAGE_BYTES: usize = 2 * 1024 * 1024;

/// An image part pulled out of a multipart request.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

fn sanitized_extension(file_name: &str) -> String {
    let ext = file_name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    let ext: String = ext
        .chars()
        .take(8)
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    if ext.is_empty() { "bin".to_string() } else { ext }
}

/// Write an uploaded image to the upload folder and return the public path
/// (`/uploads/<file>`) to store on the post.
pub fn save_featured_image(upload_root: &str, img: &UploadedImage) -> AppResult<String> {
    if !img.content_type.starts_with("image/") {
        return Err(AppError::validation("invalid_upload", "featured image must be an image file"));
    }
    if img.bytes.len() > MAX_IMAGE_BYTES {
        return Err(AppError::validation("upload_too_large", "featured image exceeds the 2MB limit"));
    }
    std::fs::create_dir_all(upload_root)
        .map_err(|e| AppError::io("upload_dir".to_string(), e.to_string()))?;
    let name = format!(
        "featuredImage-{}.{}",
        chrono::Utc::now().timestamp_millis(),
        sanitized_extension(&img.file_name)
    );
    let path = std::path::Path::new(upload_root).join(&name);
    std::fs::write(&path, &img.bytes)
        .map_err(|e| AppError::io("upload_write".to_string(), e.to_string()))?;
    Ok(format!("/uploads/{name}"))
}

/// Best-effort removal of a previously saved upload, used when the record
/// write that should have referenced it fails.
pub fn remove_upload(upload_root: &str, public_path: &str) {
    if let Some(name) = public_path.strip_prefix("/uploads/") {
        let path = std::path::Path::new(upload_root).join(name);
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(file = %path.display(), error = %e, "failed to clean up orphaned upload");
        }
    }
}

fn content_type_for(file: &str) -> &'static str {
    match file.rsplit_once('.').map(|(_, e)| e) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

/// GET /uploads/{file} - serve a stored image.
pub async fn serve(State(state): State<AppState>, Path(file): Path<String>) -> Response {
    // Uploaded names are flat; anything path-like is not ours.
    if file.contains("..") || file.contains('/') || file.contains('\\') {
        return AppError::not_found("upload_not_found", "no such file").into_response();
    }
    let path = std::path::Path::new(&state.config.upload_root).join(&file);
    match std::fs::read(&path) {
        Ok(bytes) => ([(CONTENT_TYPE, content_type_for(&file))], bytes).into_response(),
        Err(_) => AppError::not_found("upload_not_found", "no such file").into_response(),
    }
}
