pub mod store;

use crate::paths::Layout;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use store::{SettingsStore, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    DatasetsFolder,
    TrainingFolder,
    DataRoot,
    HfToken,
}

impl SettingKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SettingKey::DatasetsFolder => "DATASETS_FOLDER",
            SettingKey::TrainingFolder => "TRAINING_FOLDER",
            SettingKey::DataRoot => "DATA_ROOT",
            SettingKey::HfToken => "HF_TOKEN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    Path(PathBuf),
    Text(String),
}

impl CachedValue {
    fn into_path_buf(self) -> PathBuf {
        match self {
            CachedValue::Path(p) => p,
            CachedValue::Text(t) => PathBuf::from(t),
        }
    }

    fn into_string(self) -> String {
        match self {
            CachedValue::Path(p) => p.to_string_lossy().into_owned(),
            CachedValue::Text(t) => t,
        }
    }
}

#[derive(Default)]
struct Table {
    // bumped on every flush so a fill that raced a flush is dropped
    generation: u64,
    values: HashMap<SettingKey, CachedValue>,
}

/// Read-through cache over a [`SettingsStore`]. Entries never expire; an
/// admin update must call [`SettingsCache::flush_all`].
pub struct SettingsCache {
    store: Arc<dyn SettingsStore>,
    layout: Layout,
    table: RwLock<Table>,
}

impl SettingsCache {
    pub fn new(store: Arc<dyn SettingsStore>, layout: Layout) -> Self {
        Self { store, layout, table: RwLock::new(Table::default()) }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn read(&self) -> RwLockReadGuard<'_, Table> {
        self.table.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        self.table.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub async fn get(&self, key: SettingKey) -> Result<CachedValue, StoreError> {
        let generation = {
            let table = self.read();
            if let Some(hit) = table.values.get(&key) {
                return Ok(hit.clone());
            }
            table.generation
        };

        // concurrent misses on the same key may both land here; the fills agree
        let raw = self.store.get(key.as_str()).await?;
        let value = self.resolve(key, raw.as_deref());

        let mut table = self.write();
        if table.generation == generation {
            table.values.insert(key, value.clone());
        }
        Ok(value)
    }

    fn resolve(&self, key: SettingKey, raw: Option<&str>) -> CachedValue {
        let layout = &self.layout;
        match key {
            SettingKey::DatasetsFolder => {
                CachedValue::Path(layout.resolve_configured_path(raw, &layout.default_datasets_folder()))
            }
            SettingKey::TrainingFolder => {
                CachedValue::Path(layout.resolve_configured_path(raw, &layout.default_training_folder()))
            }
            SettingKey::DataRoot => {
                CachedValue::Path(layout.resolve_configured_path(raw, &layout.default_data_root()))
            }
            SettingKey::HfToken => CachedValue::Text(raw.unwrap_or_default().to_string()),
        }
    }

    /// Drops every entry in one exclusive section.
    pub fn flush_all(&self) {
        let mut table = self.write();
        table.values.clear();
        table.generation = table.generation.wrapping_add(1);
        tracing::debug!(generation = table.generation, "settings cache flushed");
    }

    pub async fn datasets_root(&self) -> Result<PathBuf, StoreError> {
        Ok(self.get(SettingKey::DatasetsFolder).await?.into_path_buf())
    }

    pub async fn training_folder(&self) -> Result<PathBuf, StoreError> {
        Ok(self.get(SettingKey::TrainingFolder).await?.into_path_buf())
    }

    pub async fn data_root(&self) -> Result<PathBuf, StoreError> {
        Ok(self.get(SettingKey::DataRoot).await?.into_path_buf())
    }

    pub async fn hf_token(&self) -> Result<String, StoreError> {
        Ok(self.get(SettingKey::HfToken).await?.into_string())
    }
}
