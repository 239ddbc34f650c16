use crate::paths::Layout;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "aitk-server.toml";

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: Server,
    pub auth: Auth,
    pub limits: Limits,
    pub store: Store,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Server {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for Server {
    fn default() -> Self {
        Self { bind_addr: "127.0.0.1".to_string(), port: 8675 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Auth {
    /// Empty disables the bearer check.
    pub bearer_token: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Limits {
    pub max_request_kb: usize,
    pub max_upload_mb: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self { max_request_kb: 1024, max_upload_mb: 50 }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Store {
    pub settings_path: Option<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)?;
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Ok(serde_json::from_str(&raw)?)
        } else {
            Ok(toml::from_str(&raw)?)
        }
    }

    /// An explicit path must exist; otherwise the default file is used when
    /// present and built-in defaults when not.
    pub fn load_or_default(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => {
                let default = Path::new(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Self::load(default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.bind_addr.trim().is_empty() { anyhow::bail!("bind_addr must not be empty"); }
        if self.limits.max_request_kb == 0 { anyhow::bail!("max_request_kb must be > 0"); }
        if self.limits.max_upload_mb == 0 { anyhow::bail!("max_upload_mb must be > 0"); }
        Ok(())
    }

    pub fn bearer_token(&self) -> Option<&str> {
        Some(self.auth.bearer_token.trim()).filter(|t| !t.is_empty())
    }

    /// Settings file location; relative values hang off the toolkit root.
    pub fn settings_path(&self, layout: &Layout) -> PathBuf {
        layout.resolve_configured_path(self.store.settings_path.as_deref(), &layout.default_settings_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let cfg: Config = toml::from_str("").unwrap();
        assert_eq!(cfg.server.port, 8675);
        assert_eq!(cfg.limits.max_upload_mb, 50);
        assert!(cfg.bearer_token().is_none());
        cfg.validate().unwrap();
    }

    #[test]
    fn parses_toml_and_json() {
        let tmp = tempfile::tempdir().unwrap();
        let toml_path = tmp.path().join("aitk.toml");
        fs::write(
            &toml_path,
            "[server]\nport = 9000\n[auth]\nbearer_token = \" secret \"\n[store]\nsettings_path = \"db/settings.json\"\n",
        )
        .unwrap();
        let cfg = Config::load(&toml_path).unwrap();
        assert_eq!(cfg.server.port, 9000);
        assert_eq!(cfg.server.bind_addr, "127.0.0.1");
        assert_eq!(cfg.bearer_token(), Some("secret"));
        let layout = Layout::new(tmp.path());
        assert_eq!(cfg.settings_path(&layout), tmp.path().join("db").join("settings.json"));

        let json_path = tmp.path().join("aitk.json");
        fs::write(&json_path, r#"{"limits": {"max_request_kb": 0}}"#).unwrap();
        let cfg = Config::load(&json_path).unwrap();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn settings_path_defaults_under_root() {
        let layout = Layout::new(std::env::temp_dir());
        assert_eq!(Config::default().settings_path(&layout), layout.default_settings_file());
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Config::load_or_default(Some(&tmp.path().join("nope.toml"))).is_err());
    }
}
