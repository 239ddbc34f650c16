mod config;
mod errors;
mod handlers;
mod logging;
mod paths;
mod security;
mod server;
mod settings;


use crate::config::Config;
use crate::paths::Layout;
use crate::server::AppState;
use crate::settings::{
    store::{JsonFileStore, SettingsStore},
    SettingsCache,
};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<PathBuf> = None;
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                let Some(path) = args.get(i) else {
                    anyhow::bail!("--config requires a path");
                };
                config_path = Some(PathBuf::from(path));
            }
            other => anyhow::bail!("unknown argument: {other}"),
        }
        i += 1;
    }

    let cfg = Config::load_or_default(config_path.as_deref()).context("loading config")?;
    cfg.validate().context("validating config")?;

    let layout = Layout::discover();
    let settings_path = cfg.settings_path(&layout);
    let store: Arc<dyn SettingsStore> = Arc::new(JsonFileStore::new(&settings_path));
    let settings = Arc::new(SettingsCache::new(store.clone(), layout));

    info!(
        toolkit_root = %settings.layout().root().display(),
        settings_path = %settings_path.display(),
        auth = cfg.bearer_token().is_some(),
        "aitk-server ready"
    );

    let state = AppState { cfg: Arc::new(cfg), settings, store };
    server::serve(state).await
}
