//! exec::command
//!
//! Command construction.
//!
//! # Overview
//!
//! [`CommandBuilder::build`] turns an [`ExecContext`], a program and its
//! arguments into a [`CommandSpec`]: the exact process to launch. Building
//! never fails and never touches the process table.
//!
//! Inside a container (and unless the context sets the bypass flag) the
//! program is wrapped so it runs in the host's namespaces:
//!
//! ```text
//! /usr/bin/nsenter -m -u -i -n -p -t 1 <program> <args...>
//! ```
//!
//! # Environment
//!
//! Commands inherit the caller's environment. These entries are added on
//! top, in order, and a later entry wins over an earlier one with the same
//! key:
//! 1. `LVM_VG_NAME` when the context has a default volume group
//! 2. `LC_ALL=C` when the standard locale is enabled
//! 3. the context's custom environment, in key order

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::context::{use_standard_locale, ExecContext};
use super::detect::is_containerized;

/// Default namespace-entry helper.
pub const NSENTER_PATH: &str = "/usr/bin/nsenter";

/// Environment variable carrying the default volume group.
pub const DEFAULT_VOLUME_GROUP_ENV: &str = "LVM_VG_NAME";

/// Locale forced when the standard locale is enabled.
pub const STANDARD_LOCALE: (&str, &str) = ("LC_ALL", "C");

/// Arguments placed before the wrapped program when entering host namespaces.
pub const NSENTER_ARGS: [&str; 7] = ["-m", "-u", "-i", "-n", "-p", "-t", "1"];

/// A fully resolved process invocation.
#[derive(Debug, Clone)]
pub struct CommandSpec {
    program: PathBuf,
    args: Vec<String>,
    env: Vec<(String, String)>,
    wait_delay: Duration,
    cancellation: Option<CancellationToken>,
    bridged: bool,
}

impl CommandSpec {
    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Environment entries added on top of the inherited environment.
    pub fn env(&self) -> &[(String, String)] {
        &self.env
    }

    /// Resolved value of `key` among the added entries (last one wins).
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// How long to wait for output pipes after exit or kill. Zero means unbounded.
    pub fn wait_delay(&self) -> Duration {
        self.wait_delay
    }

    pub fn cancellation(&self) -> Option<&CancellationToken> {
        self.cancellation.as_ref()
    }

    /// Whether the program is wrapped in nsenter.
    pub fn is_bridged(&self) -> bool {
        self.bridged
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Builds [`CommandSpec`]s.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    nsenter_path: PathBuf,
    containerized: Option<bool>,
}

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::detect()
    }
}

impl CommandBuilder {
    /// A builder that consults process-wide container detection.
    pub fn detect() -> Self {
        Self {
            nsenter_path: PathBuf::from(NSENTER_PATH),
            containerized: None,
        }
    }

    /// Pin the containerization state instead of detecting it.
    pub fn with_containerized(mut self, containerized: bool) -> Self {
        self.containerized = Some(containerized);
        self
    }

    pub fn with_nsenter_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.nsenter_path = path.into();
        self
    }

    pub fn nsenter_path(&self) -> &Path {
        &self.nsenter_path
    }

    fn containerized(&self) -> bool {
        self.containerized.unwrap_or_else(is_containerized)
    }

    /// Whether a command built for `ctx` would be wrapped in nsenter.
    pub fn will_use_nsenter(&self, ctx: &ExecContext) -> bool {
        self.containerized() && !ctx.force_no_nsenter()
    }

    /// Resolve `program args...` for `ctx`.
    pub fn build<I, A>(&self, ctx: &ExecContext, program: impl AsRef<Path>, args: I) -> CommandSpec
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let program = program.as_ref();
        let bridged = self.will_use_nsenter(ctx);

        let (program, args) = if bridged {
            let mut wrapped: Vec<String> = NSENTER_ARGS.iter().map(|a| a.to_string()).collect();
            wrapped.push(program.to_string_lossy().into_owned());
            wrapped.extend(args.into_iter().map(Into::into));
            (self.nsenter_path.clone(), wrapped)
        } else {
            (
                program.to_path_buf(),
                args.into_iter().map(Into::into).collect(),
            )
        };

        let mut env = Vec::new();
        if let Some(vg) = ctx.default_volume_group() {
            env.push((DEFAULT_VOLUME_GROUP_ENV.to_string(), vg.to_string()));
        }
        if use_standard_locale() {
            env.push((STANDARD_LOCALE.0.to_string(), STANDARD_LOCALE.1.to_string()));
        }
        if let Some(custom) = ctx.custom_environment() {
            env.extend(custom.iter().map(|(k, v)| (k.clone(), v.clone())));
        }

        let spec = CommandSpec {
            program,
            args,
            env,
            wait_delay: ctx.wait_delay(),
            cancellation: ctx.cancellation().cloned(),
            bridged,
        };
        tracing::debug!(command = %spec, bridged, "built command");
        spec
    }
}

/// Build a command with a detecting [`CommandBuilder`].
pub fn build_command<I, A>(ctx: &ExecContext, program: impl AsRef<Path>, args: I) -> CommandSpec
where
    I: IntoIterator<Item = A>,
    A: Into<String>,
{
    CommandBuilder::detect().build(ctx, program, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::VolumeGroupName;
    use std::collections::BTreeMap;

    fn host() -> CommandBuilder {
        CommandBuilder::detect().with_containerized(false)
    }

    fn container() -> CommandBuilder {
        CommandBuilder::detect().with_containerized(true)
    }

    #[test]
    fn direct_execution_outside_container() {
        let spec = host().build(&ExecContext::new(), "toolX", ["list"]);
        assert_eq!(spec.program(), Path::new("toolX"));
        assert_eq!(spec.args(), ["list"]);
        assert!(!spec.is_bridged());
    }

    #[test]
    fn nsenter_prefix_inside_container() {
        let spec = container().build(&ExecContext::new(), "toolX", ["list"]);
        assert_eq!(spec.program(), Path::new(NSENTER_PATH));
        assert_eq!(
            spec.args(),
            ["-m", "-u", "-i", "-n", "-p", "-t", "1", "toolX", "list"]
        );
        assert!(spec.is_bridged());
    }

    #[test]
    fn bypass_matches_direct_execution() {
        let ctx = ExecContext::new().with_force_no_nsenter(true);
        let bypassed = container().build(&ctx, "toolX", ["list"]);
        let direct = host().build(&ExecContext::new(), "toolX", ["list"]);
        assert_eq!(bypassed.program(), direct.program());
        assert_eq!(bypassed.args(), direct.args());
    }

    #[test]
    fn custom_nsenter_path() {
        let spec = container()
            .with_nsenter_path("/host/nsenter")
            .build(&ExecContext::new(), "lvm", ["vgs"]);
        assert_eq!(spec.program(), Path::new("/host/nsenter"));
    }

    #[test]
    fn default_volume_group_is_exported() {
        let ctx = ExecContext::new().with_default_volume_group(VolumeGroupName::new("vg0").unwrap());
        let spec = host().build(&ctx, "lvm", ["lvs"]);
        assert_eq!(spec.env_value(DEFAULT_VOLUME_GROUP_ENV), Some("vg0"));
    }

    #[test]
    fn custom_environment_wins_over_automatic_entries() {
        let env = BTreeMap::from([
            ("LVM_VG_NAME".to_string(), "override".to_string()),
            ("LVM_SYSTEM_DIR".to_string(), "/etc/lvm".to_string()),
        ]);
        let ctx = ExecContext::new()
            .with_default_volume_group(VolumeGroupName::new("vg0").unwrap())
            .with_custom_environment(env);
        let spec = host().build(&ctx, "lvm", ["lvs"]);

        assert_eq!(spec.env_value("LVM_VG_NAME"), Some("override"));
        assert_eq!(spec.env_value("LVM_SYSTEM_DIR"), Some("/etc/lvm"));
        assert_eq!(spec.env()[0].0, "LVM_VG_NAME");
    }

    #[test]
    fn wait_delay_and_cancellation_are_carried() {
        let token = CancellationToken::new();
        let ctx = ExecContext::new()
            .with_wait_delay(Duration::from_millis(250))
            .with_cancellation(token);
        let spec = host().build(&ctx, "lvm", Vec::<String>::new());
        assert_eq!(spec.wait_delay(), Duration::from_millis(250));
        assert!(spec.cancellation().is_some());
    }

    #[test]
    fn display_joins_program_and_args() {
        let spec = host().build(&ExecContext::new(), "lvm", ["vgs", "--units=b"]);
        assert_eq!(spec.to_string(), "lvm vgs --units=b");
    }
}
