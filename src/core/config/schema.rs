//! core::config::schema
//!
//! Configuration file schema.
//!
//! # Example
//!
//! ```toml
//! lvm_path = "/usr/sbin/lvm"
//! nsenter_path = "/usr/bin/nsenter"
//! wait_delay_ms = 3000
//! standard_locale = true
//! ```
//!
//! # Validation
//!
//! Values are validated after parsing: paths cannot be empty and the wait
//! delay is capped so a typo cannot stall callers for hours.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Largest accepted `wait_delay_ms` (10 minutes).
pub const MAX_WAIT_DELAY_MS: u64 = 10 * 60 * 1000;

/// On-disk configuration. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    /// Path or name of the `lvm` binary.
    pub lvm_path: Option<PathBuf>,

    /// Path of the namespace-entry helper used inside containers.
    pub nsenter_path: Option<PathBuf>,

    /// Process-wide default wait delay, in milliseconds.
    pub wait_delay_ms: Option<u64>,

    /// Force `LC_ALL=C` on every command.
    pub standard_locale: Option<bool>,
}

impl FileConfig {
    /// Validate the configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if any value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, path) in [
            ("lvm_path", &self.lvm_path),
            ("nsenter_path", &self.nsenter_path),
        ] {
            if path.as_ref().is_some_and(|p| p.as_os_str().is_empty()) {
                return Err(ConfigError::InvalidValue(format!("{key} cannot be empty")));
            }
        }

        if let Some(ms) = self.wait_delay_ms {
            if ms > MAX_WAIT_DELAY_MS {
                return Err(ConfigError::InvalidValue(format!(
                    "wait_delay_ms cannot exceed {MAX_WAIT_DELAY_MS}, got {ms}"
                )));
            }
        }

        Ok(())
    }
}
