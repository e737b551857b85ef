//! Startline configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::protocol::ProtocolKind;
use crate::scenario::{DEFAULT_DELAY_MS, DEFAULT_RUNNERS};

/// Main startline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Runner threads per race
    pub runners: usize,

    /// Delay used by the standard scenarios, in milliseconds
    #[serde(rename = "delay-ms")]
    pub delay_ms: u64,

    /// Races per protocol and scenario
    pub rounds: usize,

    /// Protocols to run when none are given on the command line
    pub protocols: Vec<ProtocolKind>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runners: DEFAULT_RUNNERS,
            delay_ms: DEFAULT_DELAY_MS,
            rounds: 1,
            protocols: ProtocolKind::ALL.to_vec(),
            log_level: None,
        }
    }
}

impl Config {
    /// Reject settings no race can run with
    pub fn validate(&self) -> Result<()> {
        if self.runners == 0 {
            return Err(eyre::eyre!("runners must be at least 1"));
        }
        if self.rounds == 0 {
            return Err(eyre::eyre!("rounds must be at least 1"));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try project-local config: .startline.yml
        let local_config = PathBuf::from(".startline.yml");
        if local_config.exists() {
            match Self::load_from_file(&local_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", local_config.display(), e);
                }
            }
        }

        // Try user config: ~/.config/startline/startline.yml
        if let Some(user_config) = Self::user_config_path()
            && user_config.exists()
        {
            match Self::load_from_file(&user_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    tracing::warn!("Failed to load config from {}: {}", user_config.display(), e);
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is set up
    ///
    /// Errors are swallowed; the full [`load`](Self::load) reports them later.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => [Some(PathBuf::from(".startline.yml")), Self::user_config_path()]
                .into_iter()
                .flatten()
                .collect(),
        };

        candidates
            .iter()
            .find(|path| path.exists())
            .and_then(|path| Self::load_from_file(path).ok())
            .and_then(|config| config.log_level)
    }

    fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("startline").join("startline.yml"))
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
