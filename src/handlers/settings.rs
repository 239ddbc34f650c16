use super::JsonBody;
use crate::{
    errors::AppResult,
    server::AppState,
    settings::{SettingKey, SettingsCache},
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub datasets_folder: String,
    pub training_folder: String,
    pub data_root: String,
    pub hf_token_set: bool,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub datasets_folder: Option<String>,
    pub training_folder: Option<String>,
    pub data_root: Option<String>,
    pub hf_token: Option<String>,
}

async fn view(settings: &SettingsCache) -> AppResult<SettingsView> {
    Ok(SettingsView {
        datasets_folder: settings.datasets_root().await?.display().to_string(),
        training_folder: settings.training_folder().await?.display().to_string(),
        data_root: settings.data_root().await?.display().to_string(),
        hf_token_set: !settings.hf_token().await?.is_empty(),
    })
}

pub async fn show(State(state): State<AppState>) -> AppResult<Json<SettingsView>> {
    Ok(Json(view(&state.settings).await?))
}

/// Persists the provided fields, then drops every cached value so the next
/// read sees them. The cache is flushed even when a later write fails, since
/// earlier fields may already be in the store.
pub async fn update(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SettingsUpdate>,
) -> AppResult<Json<SettingsView>> {
    let changes = [
        (SettingKey::DatasetsFolder, req.datasets_folder),
        (SettingKey::TrainingFolder, req.training_folder),
        (SettingKey::DataRoot, req.data_root),
        (SettingKey::HfToken, req.hf_token),
    ];
    let mut failed = None;
    for (key, value) in changes {
        let Some(value) = value else { continue };
        if let Err(err) = state.store.set(key.as_str(), value.trim()).await {
            failed = Some(err);
            break;
        }
    }
    state.settings.flush_all();
    if let Some(err) = failed {
        return Err(err.into());
    }
    Ok(Json(view(&state.settings).await?))
}
