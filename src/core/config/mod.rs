//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! Configuration is optional. Every value has a built-in default and a
//! missing file is not an error. Explicit client construction always
//! overrides what the file says.
//!
//! # Locations
//!
//! Searched in order, first hit wins:
//! 1. `$LVMKIT_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/lvmkit/config.toml`
//! 3. `~/.lvmkit/config.toml`
//!
//! # Example
//!
//! ```no_run
//! use lvmkit::core::config::Config;
//!
//! let config = Config::load().unwrap();
//! config.apply_process_defaults();
//! println!("lvm binary: {}", config.lvm_path().display());
//! ```

pub mod schema;

pub use schema::FileConfig;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::exec::context::{set_default_wait_delay, set_use_standard_locale};

/// Default `lvm` binary, resolved through `PATH`.
pub const DEFAULT_LVM_PATH: &str = "lvm";

/// Default namespace-entry helper.
pub const DEFAULT_NSENTER_PATH: &str = "/usr/bin/nsenter";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration with defaults applied through accessors.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub file: FileConfig,
    path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed,
    /// or validated.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::find() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let file: FileConfig = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        file.validate()?;

        tracing::debug!(path = %path.display(), "loaded configuration");
        Ok(Self {
            file,
            path: Some(path.to_path_buf()),
        })
    }

    /// Wrap an already parsed file configuration.
    pub fn from_file(file: FileConfig) -> Self {
        Self { file, path: None }
    }

    fn find() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("LVMKIT_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("lvmkit/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".lvmkit/config.toml"))
            .filter(|path| path.exists())
    }

    /// Path the configuration was loaded from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The `lvm` binary to run.
    pub fn lvm_path(&self) -> PathBuf {
        self.file
            .lvm_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LVM_PATH))
    }

    /// The namespace-entry helper to run inside containers.
    pub fn nsenter_path(&self) -> PathBuf {
        self.file
            .nsenter_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_NSENTER_PATH))
    }

    /// Configured default wait delay, if any.
    pub fn wait_delay(&self) -> Option<Duration> {
        self.file.wait_delay_ms.map(Duration::from_millis)
    }

    /// Whether commands should run with the standard locale.
    pub fn standard_locale(&self) -> bool {
        self.file.standard_locale.unwrap_or(false)
    }

    /// Push the process-wide values (locale flag, default wait delay) into
    /// the execution layer. Values absent from the file are left alone.
    pub fn apply_process_defaults(&self) {
        if let Some(locale) = self.file.standard_locale {
            set_use_standard_locale(locale);
        }
        if let Some(delay) = self.wait_delay() {
            set_default_wait_delay(delay);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_without_file() {
        let config = Config::default();
        assert_eq!(config.lvm_path(), PathBuf::from("lvm"));
        assert_eq!(config.nsenter_path(), PathBuf::from("/usr/bin/nsenter"));
        assert_eq!(config.wait_delay(), None);
        assert!(!config.standard_locale());
        assert!(config.path().is_none());
    }

    #[test]
    fn load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "lvm_path = \"/sbin/lvm\"\nwait_delay_ms = 1500\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.lvm_path(), PathBuf::from("/sbin/lvm"));
        assert_eq!(config.wait_delay(), Some(Duration::from_millis(1500)));
        assert_eq!(config.path(), Some(path.as_path()));
    }

    #[test]
    fn load_from_missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = Config::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }

    #[test]
    fn load_from_invalid_toml_is_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "lvm_path = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn load_from_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "nsenter_path = \"\"").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
