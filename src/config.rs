use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::domain::{PanelConfig, PanelError};

fn default_page_size() -> usize {
    100
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_page_size")]
    pub scan_page_size: usize,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            scan_page_size: default_page_size(),
        }
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"***")
            .finish()
    }
}

/// Settings for one table shown in the panel.
#[derive(Debug, Clone, Deserialize)]
pub struct TableSettings {
    pub table_name: String,
    pub region: String,
    #[serde(flatten)]
    pub credentials: Credentials,
    #[serde(default)]
    pub datatype: Option<String>,
    /// JSON file that seeds the local store with this table.
    pub seed: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub ui: PanelConfig,
    #[serde(default)]
    pub store: StoreSettings,
    #[serde(default)]
    pub tables: Vec<TableSettings>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, PanelError> {
        let content = fs::read_to_string(path)?;
        let mut settings = Settings::parse(&content)?;
        // Relative seed paths are relative to the config file.
        if let Some(dir) = path.parent() {
            for table in settings.tables.iter_mut() {
                if let Some(seed) = table.seed.as_ref().filter(|s| s.is_relative()) {
                    let resolved = dir.join(seed);
                    table.seed = Some(resolved);
                }
            }
        }
        debug!("Loaded configuration from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    pub fn parse(content: &str) -> Result<Self, PanelError> {
        let mut settings: Settings = toml::from_str(content)?;
        if settings.tables.is_empty() {
            return Err(PanelError::ConfigError("no tables configured".into()));
        }
        if let Some(t) = settings.tables.iter().find(|t| t.table_name.is_empty()) {
            return Err(PanelError::ConfigError(format!(
                "table in region {} has no name",
                t.region
            )));
        }
        for table in settings.tables.iter_mut() {
            table.seed = table.seed.as_deref().map(expand_path);
        }
        Ok(settings)
    }
}

/// Expand `~` and environment variables in `path`.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => path.to_path_buf(),
    }
}
