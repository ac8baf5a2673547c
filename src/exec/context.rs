//! exec::context
//!
//! Per-call execution context.
//!
//! # Overview
//!
//! An [`ExecContext`] carries the settings that shape how one command is
//! launched: extra environment, the wait delay, a default volume group,
//! the nsenter bypass flag and an optional cancellation token. Contexts
//! are never mutated in place. Every `with_*` method returns a derived
//! copy, so a parent context can be shared freely between concurrent
//! calls.
//!
//! Two values are process-wide rather than per call: the standard-locale
//! flag and the default wait delay.
//!
//! # Example
//!
//! ```
//! use lvmkit::exec::ExecContext;
//! use std::time::Duration;
//!
//! let parent = ExecContext::new();
//! let child = parent
//!     .with_force_no_nsenter(true)
//!     .with_wait_delay(Duration::from_secs(2));
//!
//! assert!(!parent.force_no_nsenter());
//! assert!(child.force_no_nsenter());
//! assert_eq!(child.wait_delay(), Duration::from_secs(2));
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::core::types::VolumeGroupName;

static USE_STANDARD_LOCALE: RwLock<bool> = RwLock::new(false);
static DEFAULT_WAIT_DELAY: RwLock<Duration> = RwLock::new(Duration::ZERO);

/// Force `LC_ALL=C` on every command built from now on.
pub fn set_use_standard_locale(use_standard: bool) {
    let mut guard = USE_STANDARD_LOCALE
        .write()
        .unwrap_or_else(|e| e.into_inner());
    *guard = use_standard;
}

/// Whether commands are built with `LC_ALL=C`.
pub fn use_standard_locale() -> bool {
    *USE_STANDARD_LOCALE.read().unwrap_or_else(|e| e.into_inner())
}

/// Set the wait delay used when a context does not carry its own.
pub fn set_default_wait_delay(delay: Duration) {
    let mut guard = DEFAULT_WAIT_DELAY
        .write()
        .unwrap_or_else(|e| e.into_inner());
    *guard = delay;
}

/// The process-wide default wait delay. Zero means unbounded.
pub fn default_wait_delay() -> Duration {
    *DEFAULT_WAIT_DELAY.read().unwrap_or_else(|e| e.into_inner())
}

/// Immutable execution settings threaded through every call.
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    custom_environment: Option<Arc<BTreeMap<String, String>>>,
    wait_delay: Option<Duration>,
    default_volume_group: Option<VolumeGroupName>,
    force_no_nsenter: bool,
    cancellation: Option<CancellationToken>,
}

impl ExecContext {
    /// A context with every field unset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a context that adds `env` to every command's environment.
    ///
    /// Replaces any custom environment carried by `self`.
    pub fn with_custom_environment(&self, env: BTreeMap<String, String>) -> Self {
        Self {
            custom_environment: Some(Arc::new(env)),
            ..self.clone()
        }
    }

    /// Derive a context that runs commands directly even inside a container.
    pub fn with_force_no_nsenter(&self, force: bool) -> Self {
        Self {
            force_no_nsenter: force,
            ..self.clone()
        }
    }

    /// Derive a context exporting `vg` as `LVM_VG_NAME`.
    pub fn with_default_volume_group(&self, vg: VolumeGroupName) -> Self {
        Self {
            default_volume_group: Some(vg),
            ..self.clone()
        }
    }

    /// Derive a context with its own wait delay.
    pub fn with_wait_delay(&self, delay: Duration) -> Self {
        Self {
            wait_delay: Some(delay),
            ..self.clone()
        }
    }

    /// Derive a context whose commands are killed when `token` fires.
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            cancellation: Some(token),
            ..self.clone()
        }
    }

    /// Caller-supplied environment, if any.
    pub fn custom_environment(&self) -> Option<&BTreeMap<String, String>> {
        self.custom_environment.as_deref()
    }

    pub fn force_no_nsenter(&self) -> bool {
        self.force_no_nsenter
    }

    pub fn default_volume_group(&self) -> Option<&VolumeGroupName> {
        self.default_volume_group.as_ref()
    }

    /// The context's wait delay, else the process-wide default.
    pub fn wait_delay(&self) -> Duration {
        self.wait_delay.unwrap_or_else(default_wait_delay)
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// True once the context's cancellation token has fired.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }
}
