//! Lock configuration, a JSON file created on first boot

use std::fs;
use std::path::{Path, PathBuf};

use bolt_proto::{KeyData, Model, Uuid};
use chrono::{FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
}

const DEFAULT_PENDING_KEY_TIMEOUT: u64 = 24 * 60 * 60;
const DEFAULT_REPLAY_WINDOW: usize = 1024;

fn default_pending_key_timeout() -> u64 {
    DEFAULT_PENDING_KEY_TIMEOUT
}

fn default_replay_window() -> usize {
    DEFAULT_REPLAY_WINDOW
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// The lock's identifier, served by the Identifier characteristic
    pub identifier: Uuid,
    /// Authenticates the Setup command; handed to the installer out-of-band
    pub setup_secret: KeyData,
    #[serde(default)]
    pub model: Model,
    #[serde(default)]
    pub homekit: bool,
    /// Seconds a delegation may wait for its child
    #[serde(default = "default_pending_key_timeout")]
    pub pending_key_timeout: u64,
    /// Number of recent nonces remembered to refuse replays
    #[serde(default = "default_replay_window")]
    pub replay_window: usize,
    /// Offset of the lock's local time from UTC, in minutes
    #[serde(default)]
    pub utc_offset: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unlock_command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub update_command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub homekit_command: Vec<String>,

    #[serde(skip)]
    path: Option<PathBuf>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new()
    }
}

impl Configuration {
    /// Fresh configuration with a new identifier and setup secret
    pub fn new() -> Self {
        Self {
            identifier: Uuid::new_v4(),
            setup_secret: KeyData::random(),
            model: Model::Classic,
            homekit: false,
            pending_key_timeout: DEFAULT_PENDING_KEY_TIMEOUT,
            replay_window: DEFAULT_REPLAY_WINDOW,
            utc_offset: 0,
            unlock_command: Vec::new(),
            update_command: Vec::new(),
            homekit_command: Vec::new(),
            path: None,
        }
    }

    /// Load from `path`, or create and save a fresh configuration there
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let data = fs::read(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let mut config: Configuration =
                serde_json::from_slice(&data).map_err(|source| ConfigError::Json {
                    path: path.to_path_buf(),
                    source,
                })?;
            config.path = Some(path.to_path_buf());
            log::info!("loaded configuration for lock {}", config.identifier);
            Ok(config)
        } else {
            let mut config = Self::new();
            config.path = Some(path.to_path_buf());
            config.persist()?;
            log::info!(
                "created configuration for lock {} at {}",
                config.identifier,
                path.display()
            );
            Ok(config)
        }
    }

    /// Write back to the file this configuration was loaded from, if any
    pub fn persist(&self) -> Result<(), ConfigError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let io = |source| ConfigError::Io {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        let json = serde_json::to_vec_pretty(self).map_err(|source| ConfigError::Json {
            path: path.clone(),
            source,
        })?;
        fs::write(path, json).map_err(io)
    }

    /// New identity and setup secret, HomeKit off; everything else is kept
    pub fn regenerate(&mut self) {
        self.identifier = Uuid::new_v4();
        self.setup_secret = KeyData::random();
        self.homekit = false;
    }

    /// Timeouts beyond what chrono can represent mean pending keys never expire
    pub fn pending_key_timeout(&self) -> chrono::Duration {
        i64::try_from(self.pending_key_timeout)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .unwrap_or(chrono::Duration::MAX)
    }

    /// Local time zone of the lock; out-of-range offsets fall back to UTC
    pub fn time_zone(&self) -> FixedOffset {
        self.utc_offset
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| {
                log::warn!("utc_offset {} out of range, using UTC", self.utc_offset);
                Utc.fix()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_or_create_persists_the_first_configuration() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lock").join("config.json");

        let created = Configuration::load_or_create(&path).unwrap();
        assert!(path.exists());
        let loaded = Configuration::load_or_create(&path).unwrap();
        assert_eq!(loaded, created);
        assert_eq!(loaded.pending_key_timeout, 24 * 60 * 60);
        assert_eq!(loaded.replay_window, 1024);
    }

    #[test]
    fn missing_fields_take_defaults() {
        let json = format!(
            r#"{{"identifier":"{}","setup_secret":"{}"}}"#,
            Uuid::from_u128(1),
            "00".repeat(32)
        );
        let config: Configuration = serde_json::from_str(&json).unwrap();
        assert_eq!(config.model, Model::Classic);
        assert!(!config.homekit);
        assert_eq!(config.pending_key_timeout(), chrono::Duration::hours(24));
        assert!(config.unlock_command.is_empty());
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, b"{ not json").unwrap();
        assert!(matches!(
            Configuration::load_or_create(&path),
            Err(ConfigError::Json { .. })
        ));
    }

    #[test]
    fn regenerate_keeps_settings() {
        let mut config = Configuration::new();
        config.utc_offset = 120;
        config.homekit = true;
        let before = config.clone();
        config.regenerate();
        assert_ne!(config.identifier, before.identifier);
        assert_ne!(config.setup_secret, before.setup_secret);
        assert!(!config.homekit);
        assert_eq!(config.utc_offset, 120);
    }

    #[test]
    fn time_zone_from_minutes() {
        let mut config = Configuration::new();
        config.utc_offset = -300;
        assert_eq!(config.time_zone().local_minus_utc(), -300 * 60);
        config.utc_offset = 100_000;
        assert_eq!(config.time_zone().local_minus_utc(), 0);
        config.utc_offset = i32::MAX;
        assert_eq!(config.time_zone().local_minus_utc(), 0);
        config.utc_offset = i32::MIN;
        assert_eq!(config.time_zone().local_minus_utc(), 0);
    }

    #[test]
    fn huge_pending_key_timeout_saturates() {
        let mut config = Configuration::new();
        config.pending_key_timeout = u64::MAX / 2;
        assert_eq!(config.pending_key_timeout(), chrono::Duration::MAX);
        config.pending_key_timeout = u64::MAX;
        assert_eq!(config.pending_key_timeout(), chrono::Duration::MAX);
        config.pending_key_timeout = 90;
        assert_eq!(config.pending_key_timeout(), chrono::Duration::seconds(90));
    }
}
