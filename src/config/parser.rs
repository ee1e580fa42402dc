//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files and environment
//! variables, with proper precedence and error handling.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, PlanSyncError, Result};

use super::spec::PlanSyncConfig;

/// Environment variable overriding `storage.plan_dir`.
pub const ENV_PLAN_DIR: &str = "PLANSYNC_PLAN_DIR";

/// Environment variable overriding `document.ground_station`.
pub const ENV_GROUND_STATION: &str = "PLANSYNC_GROUND_STATION";

/// Environment variable overriding `simulator.latency_ms`.
pub const ENV_SIM_LATENCY_MS: &str = "PLANSYNC_SIM_LATENCY_MS";

/// Configuration parser.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving the `.env` file.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<PlanSyncConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(PlanSyncError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            PlanSyncError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<PlanSyncConfig> {
        debug!("Parsing YAML configuration");

        if content.trim().is_empty() {
            return Ok(PlanSyncConfig::default());
        }

        let config: PlanSyncConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            PlanSyncError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration, offline profile {}",
            config.offline_editing.profile()
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<PlanSyncConfig> {
        let mut config = self.load_file(path)?;
        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        Ok(config)
    }

    /// Applies environment overrides to a configuration that did not come from a file.
    #[must_use]
    pub fn defaults_with_env() -> PlanSyncConfig {
        let mut config = PlanSyncConfig::default();
        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());
        config
    }

    /// Applies overrides looked up through `lookup`.
    fn apply_env_overrides(config: &mut PlanSyncConfig, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_PLAN_DIR) {
            debug!("Overriding storage.plan_dir from environment");
            config.storage.plan_dir = PathBuf::from(dir);
        }

        if let Some(name) = lookup(ENV_GROUND_STATION) {
            debug!("Overriding document.ground_station from environment");
            config.document.ground_station = name;
        }

        if let Some(latency) = lookup(ENV_SIM_LATENCY_MS) {
            match latency.parse() {
                Ok(ms) => {
                    debug!("Overriding simulator.latency_ms from environment");
                    config.simulator.latency_ms = ms;
                }
                Err(_) => warn!("Ignoring {ENV_SIM_LATENCY_MS}={latency}: not a number"),
            }
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                PlanSyncError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["plansync.yaml", "plansync.yml"];

/// Finds the configuration file in the start directory, its parents, or the
/// user configuration directory.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        if let Some(found) = config_in(&current) {
            return Ok(found);
        }
        if !current.pop() {
            break;
        }
    }

    if let Some(found) = dirs::config_dir().and_then(|dir| config_in(&dir.join("plansync"))) {
        return Ok(found);
    }

    Err(PlanSyncError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}

fn config_in(dir: &Path) -> Option<PathBuf> {
    DEFAULT_CONFIG_FILES
        .iter()
        .map(|filename| dir.join(filename))
        .find(|path| path.exists())
        .inspect(|path| info!("Found configuration file: {}", path.display()))
}
