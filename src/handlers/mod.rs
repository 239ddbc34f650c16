pub mod datasets;
pub mod images;
pub mod settings;

use crate::errors::AppError;
use axum::extract::FromRequest;
use std::path::{Path, PathBuf};

/// JSON request body whose rejections answer in the `{error, code}` shape.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct JsonBody<T>(pub T);

/// Caption sidecar for a media file: the last `.ext` of the file name, if it
/// has a non-empty extension, is swapped for `.txt`; otherwise `.txt` is
/// appended. A dotfile such as `.png` becomes `.txt`.
pub fn caption_path_for(media: &Path) -> PathBuf {
    let Some(name) = media.file_name() else {
        let mut raw = media.as_os_str().to_owned();
        raw.push(".txt");
        return PathBuf::from(raw);
    };
    let name = name.to_string_lossy();
    let stem = match name.rfind('.') {
        Some(dot) if dot + 1 < name.len() => &name[..dot],
        _ => &name[..],
    };
    media.with_file_name(format!("{stem}.txt"))
}

/// Non-blank path from a request body, taken as given.
fn required_path(value: Option<&str>, message: &str) -> Result<PathBuf, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(PathBuf::from(v)),
        _ => Err(AppError::InvalidInput(message.to_string())),
    }
}

fn access_denied(target: &Path, roots: &[&Path]) -> AppError {
    let roots: Vec<String> = roots.iter().map(|r| r.display().to_string()).collect();
    tracing::warn!(target_path = %target.display(), roots = ?roots, "access denied");
    AppError::AccessDenied("Access denied".to_string())
}
