//! client::errors
//!
//! Error type for client operations.
//!
//! # Classification
//!
//! LVM reports most failures as a non-zero exit with a diagnostic on
//! stderr. Rather than have every caller grep stderr, [`ClientError`]
//! exposes named predicates for the conditions callers routinely branch
//! on: "not found", "already exists", cancellation, and errors that are
//! safe to ignore while cleaning up.
//!
//! Nothing here retries. Whether to retry is the caller's decision.
//!
//! # Example
//!
//! ```
//! use lvmkit::client::ClientError;
//! use lvmkit::exec::ExecError;
//!
//! let err = ClientError::Execution {
//!     operation: "vgremove",
//!     resource: "vg0".to_string(),
//!     source: ExecError::Exited {
//!         code: Some(5),
//!         stderr: "  Volume group \"vg0\" not found".to_string(),
//!     },
//! };
//! assert!(err.is_volume_group_not_found());
//! assert!(err.is_skippable_for_cleanup());
//! ```

use thiserror::Error;

use super::locking::LockError;
use crate::core::options::ValidationError;
use crate::exec::ExecError;

/// Errors from client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The option list failed validation. No process was started.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The LVM command failed to start, exited non-zero, or was cancelled.
    #[error("{operation} failed for '{resource}': {source}")]
    Execution {
        operation: &'static str,
        resource: String,
        #[source]
        source: ExecError,
    },

    /// A resource lock could not be acquired.
    #[error(transparent)]
    Locking(#[from] LockError),

    /// LVM output could not be parsed.
    #[error("unexpected report output: {0}")]
    Report(String),

    #[error("volume group '{0}' not found")]
    VolumeGroupNotFound(String),

    #[error("logical volume '{0}' not found")]
    LogicalVolumeNotFound(String),
}

const VG_NOT_FOUND_PATTERNS: &[&str] = &[
    "Cannot process volume group",
    "No volume groups found",
];

const LV_NOT_FOUND_PATTERNS: &[&str] = &["Failed to find logical volume"];

const ALREADY_EXISTS_PATTERNS: &[&str] = &["already exists"];

const SKIPPABLE_CLEANUP_PATTERNS: &[&str] = &[
    "No PV found on device",
    "is not a PV",
    "No device found for",
];

impl ClientError {
    /// Diagnostic output of the failed LVM command, if it ran.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            ClientError::Execution { source, .. } => source.stderr(),
            _ => None,
        }
    }

    fn stderr_matches(&self, patterns: &[&str]) -> bool {
        self.stderr()
            .is_some_and(|stderr| patterns.iter().any(|p| stderr.contains(p)))
    }

    /// Check if this error means the volume group does not exist.
    pub fn is_volume_group_not_found(&self) -> bool {
        if matches!(self, ClientError::VolumeGroupNotFound(_)) {
            return true;
        }
        self.stderr_matches(VG_NOT_FOUND_PATTERNS)
            || self.stderr().is_some_and(|stderr| {
                stderr
                    .lines()
                    .any(|line| line.contains("Volume group \"") && line.contains("not found"))
            })
    }

    /// Check if this error means the logical volume does not exist.
    pub fn is_logical_volume_not_found(&self) -> bool {
        matches!(self, ClientError::LogicalVolumeNotFound(_))
            || self.stderr_matches(LV_NOT_FOUND_PATTERNS)
    }

    /// Check if this error means the target resource does not exist.
    pub fn is_not_found(&self) -> bool {
        self.is_volume_group_not_found() || self.is_logical_volume_not_found()
    }

    /// Check if this error means the resource being created already exists.
    pub fn is_already_exists(&self) -> bool {
        self.stderr_matches(ALREADY_EXISTS_PATTERNS)
    }

    /// Check if the operation was cancelled, while running or while
    /// waiting for its lock.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            ClientError::Execution {
                source: ExecError::Cancelled,
                ..
            } | ClientError::Locking(LockError::Cancelled { .. })
        )
    }

    /// Check if a cleanup path can treat this error as success: the thing
    /// being removed is already gone.
    pub fn is_skippable_for_cleanup(&self) -> bool {
        self.is_not_found() || self.stderr_matches(SKIPPABLE_CLEANUP_PATTERNS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exited(stderr: &str) -> ClientError {
        ClientError::Execution {
            operation: "lvremove",
            resource: "vg0".to_string(),
            source: ExecError::Exited {
                code: Some(5),
                stderr: stderr.to_string(),
            },
        }
    }

    #[test]
    fn volume_group_not_found_classification() {
        assert!(exited("  Volume group \"vg9\" not found\n").is_volume_group_not_found());
        assert!(exited("  Cannot process volume group vg9").is_volume_group_not_found());
        assert!(ClientError::VolumeGroupNotFound("vg9".into()).is_volume_group_not_found());
        assert!(!exited("  Insufficient free space").is_volume_group_not_found());
    }

    #[test]
    fn logical_volume_not_found_classification() {
        let err = exited("  Failed to find logical volume \"vg0/lv9\"");
        assert!(err.is_logical_volume_not_found());
        assert!(err.is_not_found());
        assert!(!err.is_volume_group_not_found());
    }

    #[test]
    fn already_exists_classification() {
        let err = exited("  Logical Volume \"lv0\" already exists in volume group \"vg0\"");
        assert!(err.is_already_exists());
        assert!(!err.is_not_found());
    }

    #[test]
    fn cancellation_classification() {
        let err = ClientError::Execution {
            operation: "vgcreate",
            resource: "vg0".into(),
            source: ExecError::Cancelled,
        };
        assert!(err.is_cancelled());

        let err = ClientError::Locking(LockError::Cancelled {
            resource: "vg0".into(),
        });
        assert!(err.is_cancelled());
        assert!(!exited("boom").is_cancelled());
    }

    #[test]
    fn skippable_for_cleanup_classification() {
        assert!(exited("  No PV found on device /dev/sdz.").is_skippable_for_cleanup());
        assert!(exited("  Volume group \"vg9\" not found").is_skippable_for_cleanup());
        assert!(!exited("  Device or resource busy").is_skippable_for_cleanup());
    }

    #[test]
    fn validation_errors_have_no_stderr() {
        let err = ClientError::from(ValidationError::Invalid("bad".into()));
        assert!(err.stderr().is_none());
        assert!(!err.is_not_found());
    }

    #[test]
    fn execution_display_names_operation_and_resource() {
        let msg = exited("  boom").to_string();
        assert!(msg.contains("lvremove"));
        assert!(msg.contains("vg0"));
    }
}
