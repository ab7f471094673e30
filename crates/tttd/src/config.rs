//! Server configuration.
//!
//! Values come from, in order of precedence: command-line flag, the
//! `TTT_ADDR` environment variable, an optional TOML file, and built-in
//! defaults. A missing file is only an error when one was asked for.
//!
//! ```toml
//! addr = "0.0.0.0:9000"
//! write_timeout_secs = 5
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use ttt_protocol::{ADDR_ENV, DEFAULT_ADDR};

/// Default bound on a single write to a player (10 seconds)
pub const DEFAULT_WRITE_TIMEOUT_SECS: u64 = 10;

/// Runtime configuration for [`crate::server::GameServer`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// `host:port` to listen on.
    pub addr: String,

    /// Bound on each write to a player, in seconds.
    pub write_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            write_timeout_secs: DEFAULT_WRITE_TIMEOUT_SECS,
        }
    }
}

impl ServerConfig {
    /// Creates a default config listening on `addr`.
    pub fn with_addr(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Self::default()
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs)
    }

    /// Loads a config from a TOML file. Unset keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })
    }

    /// Resolves the effective config from flag, environment, file and defaults.
    pub fn resolve(file: Option<&Path>, addr_flag: Option<String>) -> Result<Self, ConfigError> {
        Self::resolve_with_env(file, addr_flag, std::env::var(ADDR_ENV).ok())
    }

    fn resolve_with_env(
        file: Option<&Path>,
        addr_flag: Option<String>,
        addr_env: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(addr) = addr_flag.or(addr_env) {
            config.addr = addr;
        }

        if config.addr.trim().is_empty() {
            return Err(ConfigError::Invalid("addr must not be empty".to_string()));
        }
        if config.write_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "write_timeout_secs must be at least 1".to_string(),
            ));
        }

        debug!(addr = %config.addr, write_timeout_secs = config.write_timeout_secs, "Configuration resolved");
        Ok(config)
    }
}

/// Errors from loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {}: {error}", path.display())]
    Read { path: PathBuf, error: String },

    #[error("Failed to parse config {}: {error}", path.display())]
    Parse { path: PathBuf, error: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::resolve_with_env(None, None, None).unwrap();
        assert_eq!(config.addr, "localhost:8080");
        assert_eq!(config.write_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_flag_beats_env_beats_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "addr = \"file:1\"").unwrap();

        let from_file = ServerConfig::resolve_with_env(Some(file.path()), None, None).unwrap();
        assert_eq!(from_file.addr, "file:1");

        let from_env =
            ServerConfig::resolve_with_env(Some(file.path()), None, Some("env:2".into())).unwrap();
        assert_eq!(from_env.addr, "env:2");

        let from_flag = ServerConfig::resolve_with_env(
            Some(file.path()),
            Some("flag:3".into()),
            Some("env:2".into()),
        )
        .unwrap();
        assert_eq!(from_flag.addr, "flag:3");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "write_timeout_secs = 3").unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.write_timeout_secs, 3);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9000").unwrap();
        assert!(matches!(
            ServerConfig::from_file(file.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ServerConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
        assert!(err.to_string().contains("nope.toml"));
    }

    #[test]
    fn test_zero_timeout_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "write_timeout_secs = 0").unwrap();
        assert!(matches!(
            ServerConfig::resolve_with_env(Some(file.path()), None, None),
            Err(ConfigError::Invalid(_))
        ));
    }
}
