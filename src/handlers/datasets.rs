use super::{access_denied, JsonBody};
use crate::{
    errors::{AppError, AppResult},
    security,
    server::AppState,
};
use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use std::fs;

const INVALID_NAME: &str = "Invalid dataset name";

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    #[serde(default)]
    pub name: Option<String>,
}

/// Lower-cases and collapses every run of characters outside `[a-z0-9]`
/// into one underscore.
pub fn clean_dataset_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_run = false;
    for ch in name.to_lowercase().chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            out.push(ch);
            in_run = false;
        } else if !in_run {
            out.push('_');
            in_run = true;
        }
    }
    out
}

/// Keeps `[A-Za-z0-9.-]`, replacing anything else with `_`.
pub fn clean_file_name(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect()
}

pub async fn create(State(state): State<AppState>, JsonBody(req): JsonBody<NameRequest>) -> AppResult<Json<Value>> {
    let raw = req.name.as_deref().ok_or_else(|| AppError::InvalidInput(INVALID_NAME.into()))?;
    let name = clean_dataset_name(raw);

    let root = state.settings.datasets_root().await?;
    let dataset = root.join(&name);
    if !security::is_strictly_inside(&root, &dataset) {
        return Err(AppError::InvalidInput(INVALID_NAME.into()));
    }

    fs::create_dir_all(&dataset).map_err(AppError::io)?;
    tracing::info!(dataset = %dataset.display(), "dataset created");
    Ok(Json(json!({"success": true, "name": name})))
}

pub async fn delete(State(state): State<AppState>, JsonBody(req): JsonBody<NameRequest>) -> AppResult<Json<Value>> {
    let name = security::get_non_empty_string(req.name.as_deref())
        .ok_or_else(|| AppError::InvalidInput(INVALID_NAME.into()))?;

    let root = state.settings.datasets_root().await?;
    let dataset = root.join(name);
    if !security::is_strictly_inside(&root, &dataset) {
        return Err(AppError::InvalidInput(INVALID_NAME.into()));
    }

    let Ok(meta) = fs::symlink_metadata(&dataset) else {
        return Ok(Json(json!({"success": true})));
    };
    if meta.is_dir() {
        fs::remove_dir_all(&dataset).map_err(AppError::io)?;
    } else {
        fs::remove_file(&dataset).map_err(AppError::io)?;
    }
    tracing::info!(dataset = %dataset.display(), "dataset deleted");
    Ok(Json(json!({"success": true})))
}

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::RequestTooLarge
    } else {
        AppError::InvalidInput(err.body_text())
    }
}

pub async fn upload(State(state): State<AppState>, mut multipart: Multipart) -> AppResult<Json<Value>> {
    let root = state.settings.datasets_root().await?;

    let mut dataset_name: Option<String> = None;
    let mut files: Vec<(Option<String>, Bytes)> = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let field_name = field.name().map(str::to_string);
        match field_name.as_deref() {
            Some("datasetName") => dataset_name = Some(field.text().await.map_err(multipart_error)?),
            Some("files") => {
                let file_name = field.file_name().map(str::to_string);
                let data = field.bytes().await.map_err(multipart_error)?;
                files.push((file_name, data));
            }
            _ => {}
        }
    }

    let name = security::must_be_non_empty_string(dataset_name.as_deref(), "datasetName")?;
    if files.is_empty() {
        return Err(AppError::InvalidInput("No files provided".into()));
    }

    let upload_dir = root.join(name);
    if !security::is_strictly_inside(&root, &upload_dir) {
        return Err(AppError::InvalidInput("Invalid datasetName".into()));
    }

    // validate every name before anything lands on disk
    let mut planned = Vec::with_capacity(files.len());
    for (file_name, data) in files {
        let file_name = file_name
            .filter(|n| !n.is_empty())
            .ok_or_else(|| AppError::InvalidInput("Invalid file upload".into()))?;
        let clean = clean_file_name(&file_name);
        if clean == "." || clean == ".." {
            return Err(AppError::InvalidInput("Invalid filename".into()));
        }
        let target = upload_dir.join(&clean);
        if !security::is_strictly_inside(&upload_dir, &target) {
            return Err(access_denied(&target, &[&upload_dir]));
        }
        planned.push((clean, target, data));
    }

    fs::create_dir_all(&upload_dir).map_err(AppError::io)?;
    let mut saved = Vec::with_capacity(planned.len());
    for (clean, target, data) in planned {
        fs::write(&target, &data).map_err(AppError::io)?;
        saved.push(clean);
    }
    tracing::info!(dataset = %upload_dir.display(), count = saved.len(), "files uploaded");

    Ok(Json(json!({"message": "Files uploaded successfully", "files": saved})))
}
