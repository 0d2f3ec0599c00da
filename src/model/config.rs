use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::plugin::descriptor::{PluginDescriptor, PluginRecord};

#[derive(Debug, Deserialize)]
pub struct AppConfig {
    pub general: GeneralConfig,
    /// Official plugins shipped with the host.
    #[serde(default)]
    pub plugins: Vec<PluginRecord>,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    /// Plugin state file; the platform data dir is used when unset.
    #[serde(default)]
    pub state_file: Option<String>,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_log_filter() -> String {
    "plugboard=info".to_string()
}

impl AppConfig {
    /// Load configuration with layering: defaults → user config.
    pub fn load() -> Result<Self> {
        let defaults = include_str!("../../config/default.toml");
        let mut config = Self::from_toml(defaults).context("built-in config")?;

        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "plugboard") {
            let config_path = proj_dirs.config_dir().join("config.toml");
            if config_path.exists() {
                let user_str = fs::read_to_string(&config_path)?;
                config = Self::from_toml(&user_str)
                    .with_context(|| format!("{}", config_path.display()))?;
            }
        }

        Ok(config)
    }

    pub fn from_toml(raw: &str) -> Result<Self> {
        Ok(toml::from_str(raw)?)
    }

    /// Configured default plugins, validated.
    pub fn default_plugins(&self) -> Result<Vec<PluginDescriptor>> {
        self.plugins
            .iter()
            .cloned()
            .map(|record| {
                let name = record.candidate.name.clone();
                PluginDescriptor::try_from(record)
                    .map(|mut plugin| {
                        plugin.official = true;
                        plugin
                    })
                    .with_context(|| format!("default plugin `{name}`"))
            })
            .collect()
    }

    pub fn state_path(&self) -> Result<PathBuf> {
        match self.general.state_file.as_deref() {
            Some(path) if path.starts_with('~') => {
                let home = dirs_home().ok_or_else(|| anyhow!("cannot determine home directory"))?;
                Ok(PathBuf::from(path.replacen('~', &home.to_string_lossy(), 1)))
            }
            Some(path) => Ok(PathBuf::from(path)),
            None => directories::ProjectDirs::from("", "", "plugboard")
                .map(|d| d.data_dir().join("plugins.toml"))
                .ok_or_else(|| anyhow!("cannot determine data directory")),
        }
    }
}

fn dirs_home() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.home_dir().to_path_buf())
}
