//! Client configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults ([`Config::default`])
//! 2. `config.json` in the config directory, if present
//! 3. Environment variables (`PUSHOVER_KEYS`, `PUSHOVER_ENDPOINT`,
//!    `PUSHOVER_TIMEOUT`)
//!
//! The config directory is `PUSHOVER_CONFIG_DIR` when set, otherwise the
//! platform config dir (`~/.config/pushover` on Linux,
//! `~/Library/Application Support/pushover` on macOS).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    CONFIG_DIR_NAME, CONFIG_FILE_NAME, DEFAULT_SEND_TIMEOUT, ENV_CONFIG_DIR, ENV_ENDPOINT,
    ENV_KEYS, ENV_TIMEOUT, KEYS_FILE_NAME, MESSAGES_ENDPOINT,
};

/// Errors while locating or reading configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// No platform config directory and no override.
    NoConfigDir,
    /// The config file exists but could not be read.
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The config file is not valid JSON for [`Config`].
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying parse error.
        source: serde_json::Error,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoConfigDir => write!(f, "Could not determine config directory"),
            Self::Read { path, source } => {
                write!(f, "Cannot read config {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "Malformed config {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::NoConfigDir => None,
            Self::Read { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

/// Configuration for the pushover client.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Key file location. `None` means `keys.json` in the config directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keys_path: Option<PathBuf>,
    /// Message endpoint URL.
    pub endpoint: String,
    /// Default timeout in seconds for waiting sends. Zero means no timeout.
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keys_path: None,
            endpoint: MESSAGES_ENDPOINT.to_string(),
            timeout_secs: DEFAULT_SEND_TIMEOUT.as_secs(),
        }
    }
}

impl Config {
    /// Returns the configuration directory path.
    ///
    /// Unlike the key file, the directory is never created here; the client
    /// only reads from it.
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
            return Ok(PathBuf::from(dir));
        }
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Loads configuration from file, with environment variable overrides.
    ///
    /// A missing config file is not an error; a malformed one is.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_dir()?.join(CONFIG_FILE_NAME);
        let mut config = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                path: path.clone(),
                source,
            })?;
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?
        } else {
            log::debug!("[Config] No config file at {}, using defaults", path.display());
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Applies overrides from a variable lookup (normally the process env).
    ///
    /// Unparseable values are logged and ignored.
    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(keys) = lookup(ENV_KEYS) {
            self.keys_path = Some(PathBuf::from(keys));
        }

        if let Some(endpoint) = lookup(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT) {
            match timeout.parse::<u64>() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => log::warn!("[Config] Ignoring {ENV_TIMEOUT}={timeout:?}: not a number"),
            }
        }
    }

    /// Key file path: the configured one, or `keys.json` in the config dir.
    pub fn keys_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.keys_path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::config_dir()?.join(KEYS_FILE_NAME)),
        }
    }

    /// Default timeout for waiting sends (`Duration::ZERO` waits forever).
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
