use anyhow::{Context, Result};
use sensemusic_bus::LocalBusConfig;
use sensemusic_context::ContextConfig;
use sensemusic_player::PlayerConfig;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Config file picked up from the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "sensemusic.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub context: ContextConfig,
    pub player: PlayerConfig,
    pub bus: LocalBusConfig,
}

impl AppConfig {
    /// Load `path`, else `sensemusic.toml` if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::load_from_path(Path::new(DEFAULT_CONFIG_FILE))
            }
            None => {
                tracing::debug!("No config file, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config
            .context
            .validate()
            .context("Invalid [context] configuration")?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }
}
