// Keyguard — Configuration
//
// JSON config file with serde defaults for every field. An absent file at
// the default location means "use defaults"; an explicitly requested file
// must exist.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::platform::{BiometryAvailability, KdfParams, DEFAULT_KEYRING_SERVICE};
use crate::store::DEFAULT_HANDLE_TTL;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found at {0}")]
    NotFound(PathBuf),

    #[error("Unable to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unable to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Behavior of the console authenticator used by the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleAuthConfig {
    /// Biometric availability the console reports at startup.
    pub biometry: BiometryAvailability,
    /// Identifier of the enrolled biometric set; changing it invalidates
    /// biometry-gated entries and keys.
    pub enrollment_id: String,
}

impl Default for ConsoleAuthConfig {
    fn default() -> Self {
        Self {
            biometry: BiometryAvailability::Available,
            enrollment_id: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OS keyring service name entries are filed under.
    pub keyring_service: String,
    /// Lifetime of an authorization handle, in seconds.
    pub handle_ttl_secs: u64,
    pub kdf: KdfParams,
    pub console: ConsoleAuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            keyring_service: DEFAULT_KEYRING_SERVICE.to_string(),
            handle_ttl_secs: DEFAULT_HANDLE_TTL.as_secs(),
            kdf: KdfParams::default(),
            console: ConsoleAuthConfig::default(),
        }
    }
}

impl Config {
    /// `<config_dir>/keyguard/config.json`.
    pub fn default_path() -> PathBuf {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("keyguard")
            .join("config.json")
    }

    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (Self::default_path(), false),
        };

        if !path.exists() {
            if required {
                return Err(ConfigError::NotFound(path));
            }
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_json(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.clone(),
                source,
            },
            other => other,
        })?;

        tracing::debug!(path = %path.display(), "Config loaded");
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.keyring_service.trim().is_empty() {
            return Err(ConfigError::Invalid("keyring_service must not be empty".to_string()));
        }
        if self.handle_ttl_secs == 0 {
            return Err(ConfigError::Invalid("handle_ttl_secs must be positive".to_string()));
        }
        if self.kdf.t_cost == 0 || self.kdf.p_cost == 0 || self.kdf.m_cost < 8 * self.kdf.p_cost {
            return Err(ConfigError::Invalid(format!(
                "kdf parameters out of range: m={}, t={}, p={}",
                self.kdf.m_cost, self.kdf.t_cost, self.kdf.p_cost
            )));
        }
        Ok(())
    }

    pub fn handle_ttl(&self) -> Duration {
        Duration::from_secs(self.handle_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_yields_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.handle_ttl(), DEFAULT_HANDLE_TTL);
        assert_eq!(config.keyring_service, DEFAULT_KEYRING_SERVICE);
    }

    #[test]
    fn test_partial_document_keeps_other_defaults() {
        let config = Config::from_json(
            r#"{"handle_ttl_secs": 5, "console": {"biometry": "temporarily_locked"}}"#,
        )
        .unwrap();
        assert_eq!(config.handle_ttl_secs, 5);
        assert_eq!(config.console.biometry, BiometryAvailability::TemporarilyLocked);
        assert_eq!(config.console.enrollment_id, "default");
        assert_eq!(config.kdf, KdfParams::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            Config::from_json(r#"{"handle_ttl_secs": 0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"keyring_service": "  "}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json(r#"{"kdf": {"t_cost": 0}}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            Config::from_json("not json"),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let path = std::env::temp_dir().join(format!("keyguard-missing-{}.json", uuid::Uuid::new_v4()));
        assert!(matches!(
            Config::load(Some(&path)),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("keyguard-config-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{"keyring_service": "keyguard-test"}"#).unwrap();

        let config = Config::load(Some(&path));
        let _ = fs::remove_file(&path);

        assert_eq!(config.unwrap().keyring_service, "keyguard-test");
    }
}
