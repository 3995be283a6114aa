use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::process::DEFAULT_MAX_ASSIGNEES;

/// Applikationskonfiguration, läses från config.toml
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_path: PathBuf,
    /// Lägsta loggnivå (trace, debug, info, warn, error)
    pub log_level: String,
    pub max_assignees: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: crate::utils::path::get_database_path(),
            log_level: "info".to_string(),
            max_assignees: DEFAULT_MAX_ASSIGNEES,
        }
    }
}

impl AppConfig {
    /// Läs konfiguration från fil. Saknad fil ger standardvärden.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            tracing::debug!("Ingen konfigurationsfil på {}, använder standard", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_assignees == 0 {
            anyhow::bail!("max_assignees måste vara minst 1");
        }
        Ok(())
    }
}
