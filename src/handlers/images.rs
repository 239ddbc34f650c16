use super::{access_denied, caption_path_for, required_path, JsonBody};
use crate::{
    errors::{AppError, AppResult},
    security,
    server::AppState,
};
use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

const INVALID_IMAGE: &str = "Invalid image path";

const MEDIA_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "gif", "tiff", "webp", "mp4", "mp3", "wav"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRequest {
    #[serde(default)]
    pub img_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionUpdate {
    #[serde(default)]
    pub img_path: Option<String>,
    #[serde(default)]
    pub caption: String,
}

pub fn is_media_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| MEDIA_EXTENSIONS.iter().any(|m| e.eq_ignore_ascii_case(m)))
        .unwrap_or(false)
}

/// Writes the caption sidecar next to an existing dataset image.
pub async fn save_caption(State(state): State<AppState>, JsonBody(req): JsonBody<CaptionUpdate>) -> AppResult<Json<Value>> {
    let img = required_path(req.img_path.as_deref(), INVALID_IMAGE)?;
    let root = state.settings.datasets_root().await?;

    if !security::is_inside(&root, &img) {
        return Err(access_denied(&img, &[&root]));
    }
    if !img.exists() {
        return Err(AppError::NotFound("Image does not exist".into()));
    }

    let caption_path = caption_path_for(&img);
    if !security::is_inside(&root, &caption_path) {
        return Err(access_denied(&caption_path, &[&root]));
    }
    fs::write(&caption_path, req.caption.as_bytes()).map_err(AppError::io)?;
    tracing::debug!(caption = %caption_path.display(), "caption saved");
    Ok(Json(json!({"success": true})))
}

/// Caption text for a dataset image; empty when no sidecar exists yet.
pub async fn get_caption(State(state): State<AppState>, JsonBody(req): JsonBody<ImageRequest>) -> AppResult<String> {
    let img = required_path(req.img_path.as_deref(), INVALID_IMAGE)?;
    let root = state.settings.datasets_root().await?;

    if !security::is_inside(&root, &img) {
        return Err(access_denied(&img, &[&root]));
    }
    let caption_path = caption_path_for(&img);
    if !security::is_inside(&root, &caption_path) {
        return Err(access_denied(&caption_path, &[&root]));
    }

    if !caption_path.exists() {
        return Ok(String::new());
    }
    let bytes = fs::read(&caption_path).map_err(AppError::io)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Deletes a media file from a dataset or training folder along with its
/// caption sidecar.
pub async fn delete_image(State(state): State<AppState>, JsonBody(req): JsonBody<ImageRequest>) -> AppResult<Json<Value>> {
    let img = required_path(req.img_path.as_deref(), INVALID_IMAGE)?;
    let datasets = state.settings.datasets_root().await?;
    let training = state.settings.training_folder().await?;
    let roots = [datasets.as_path(), training.as_path()];

    if !security::is_inside_any(roots, &img) {
        return Err(access_denied(&img, &roots));
    }
    if !is_media_file(&img) {
        return Err(AppError::InvalidInput("Not an image".into()));
    }
    if !img.exists() {
        return Ok(Json(json!({"success": true})));
    }

    let caption_path = caption_path_for(&img);
    let has_caption = caption_path.exists();
    if has_caption && !security::is_inside_any(roots, &caption_path) {
        return Err(access_denied(&caption_path, &roots));
    }

    fs::remove_file(&img).map_err(AppError::io)?;
    if has_caption {
        fs::remove_file(&caption_path).map_err(AppError::io)?;
    }
    tracing::info!(image = %img.display(), caption = has_caption, "image deleted");
    Ok(Json(json!({"success": true})))
}
