//! exec::detect
//!
//! Container environment detection.
//!
//! # Overview
//!
//! When the process runs inside a container, LVM commands must be
//! executed in the host's namespaces. Detection runs once, on first use,
//! and the answer is kept for the life of the process.
//!
//! Signals are probed in order and the first positive one wins:
//! 1. `/.dockerenv`
//! 2. `/.containerenv`
//! 3. `KUBERNETES_SERVICE_HOST` in the environment
//! 4. `/var/run/secrets/kubernetes.io/serviceaccount/token`
//!
//! A probe that cannot be answered (permission denied, broken path)
//! counts as absent. Detection never fails.

use std::path::Path;
use std::sync::OnceLock;

use super::context::ExecContext;

/// Marker file created by Docker.
pub const DOCKER_MARKER: &str = "/.dockerenv";

/// Marker file created by Podman.
pub const CONTAINER_MARKER: &str = "/.containerenv";

/// Variable set in every Kubernetes pod.
pub const KUBERNETES_ENV: &str = "KUBERNETES_SERVICE_HOST";

/// Service-account token mounted into Kubernetes pods.
pub const SERVICE_ACCOUNT_TOKEN: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Read-only environment probes used by [`Detector`].
pub trait Probes: Send + Sync {
    fn path_exists(&self, path: &Path) -> bool;
    fn env_present(&self, name: &str) -> bool;
}

/// Probes against the real host.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostProbes;

impl Probes for HostProbes {
    fn path_exists(&self, path: &Path) -> bool {
        path.try_exists().unwrap_or(false)
    }

    fn env_present(&self, name: &str) -> bool {
        std::env::var_os(name).is_some()
    }
}

/// Compute-once container detector.
#[derive(Debug)]
pub struct Detector<P> {
    probes: P,
    state: OnceLock<bool>,
}

impl<P: Probes> Detector<P> {
    pub const fn new(probes: P) -> Self {
        Self {
            probes,
            state: OnceLock::new(),
        }
    }

    /// Whether the process runs in a container. Probes only on first call.
    pub fn is_containerized(&self) -> bool {
        *self.state.get_or_init(|| {
            let detected = self.probe();
            if detected {
                tracing::info!("running in container environment, commands will use nsenter");
            }
            detected
        })
    }

    fn probe(&self) -> bool {
        self.probes.path_exists(Path::new(DOCKER_MARKER))
            || self.probes.path_exists(Path::new(CONTAINER_MARKER))
            || self.probes.env_present(KUBERNETES_ENV)
            || self.probes.path_exists(Path::new(SERVICE_ACCOUNT_TOKEN))
    }
}

static HOST: Detector<HostProbes> = Detector::new(HostProbes);

/// Whether this process runs inside a container.
pub fn is_containerized() -> bool {
    HOST.is_containerized()
}

/// Whether a command built for `ctx` would be wrapped in nsenter.
pub fn will_use_nsenter(ctx: &ExecContext) -> bool {
    is_containerized() && !ctx.force_no_nsenter()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingProbes {
        paths: HashSet<&'static str>,
        env: HashSet<&'static str>,
        calls: AtomicUsize,
    }

    impl CountingProbes {
        fn with_path(mut self, path: &'static str) -> Self {
            self.paths.insert(path);
            self
        }

        fn with_env(mut self, name: &'static str) -> Self {
            self.env.insert(name);
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Probes for CountingProbes {
        fn path_exists(&self, path: &Path) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            path.to_str().is_some_and(|p| self.paths.contains(p))
        }

        fn env_present(&self, name: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.env.contains(name)
        }
    }

    #[test]
    fn no_signals_means_not_containerized() {
        let detector = Detector::new(CountingProbes::default());
        assert!(!detector.is_containerized());
        assert_eq!(detector.probes.calls(), 4);
    }

    #[test]
    fn first_signal_short_circuits() {
        let detector = Detector::new(CountingProbes::default().with_path(DOCKER_MARKER));
        assert!(detector.is_containerized());
        assert_eq!(detector.probes.calls(), 1);
    }

    #[test]
    fn kubernetes_env_detected_after_markers() {
        let detector = Detector::new(CountingProbes::default().with_env(KUBERNETES_ENV));
        assert!(detector.is_containerized());
        assert_eq!(detector.probes.calls(), 3);
    }

    #[test]
    fn token_is_last_probe() {
        let detector =
            Detector::new(CountingProbes::default().with_path(SERVICE_ACCOUNT_TOKEN));
        assert!(detector.is_containerized());
        assert_eq!(detector.probes.calls(), 4);
    }

    #[test]
    fn detection_runs_once() {
        let detector = Detector::new(CountingProbes::default());
        for _ in 0..10 {
            assert!(!detector.is_containerized());
        }
        assert_eq!(detector.probes.calls(), 4);
    }

    #[test]
    fn detection_runs_once_across_threads() {
        let detector = Arc::new(Detector::new(
            CountingProbes::default().with_path(CONTAINER_MARKER),
        ));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let detector = Arc::clone(&detector);
                std::thread::spawn(move || detector.is_containerized())
            })
            .collect();
        for handle in handles {
            assert!(handle.join().unwrap());
        }
        assert_eq!(detector.probes.calls(), 2);
    }

    #[test]
    fn bypass_disables_nsenter() {
        let ctx = ExecContext::new().with_force_no_nsenter(true);
        assert!(!will_use_nsenter(&ctx));
    }

    #[test]
    fn host_detection_is_stable() {
        assert_eq!(is_containerized(), is_containerized());
    }
}
