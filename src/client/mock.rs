//! client::mock
//!
//! Mock client implementation for deterministic testing.
//!
//! # Design
//!
//! [`MockClient`] implements [`Client`] without running anything. It
//! validates and renders option lists exactly like the real client, then
//! records each call: the command, its rendered arguments, a snapshot of
//! the context it received, and when it started and finished. Reads are
//! served from canned volume groups, logical volumes and physical volumes.
//!
//! A per-call delay makes overlap observable, which is how the locking
//! client's guarantees are tested. Failures can be injected per command.
//!
//! # Example
//!
//! ```
//! use lvmkit::client::mock::MockClient;
//! use lvmkit::client::Client;
//! use lvmkit::core::options::{OptionList, VgRemoveOptions};
//! use lvmkit::core::types::VolumeGroupName;
//! use lvmkit::exec::ExecContext;
//!
//! # tokio_test::block_on(async {
//! let client = MockClient::new();
//! let opts = OptionList::<VgRemoveOptions>::new().with(VolumeGroupName::new("vg0").unwrap());
//! client.vg_remove(&ExecContext::new(), opts).await.unwrap();
//!
//! let ops = client.operations();
//! assert_eq!(ops[0].command, "vgremove");
//! assert_eq!(ops[0].args, ["vg0", "--yes"]);
//! # });
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;

use super::errors::ClientError;
use super::report::{
    DeviceListEntry, LogicalVolume, PhysicalVolume, Version, VolumeGroup,
};
use super::lvm::lv_target;
use super::Client;
use crate::core::options::{
    DevCheckOptions, DevListOptions, DevModifyOptions, DevUpdateOptions, LvChangeOptions,
    LvCreateOptions, LvExtendOptions, LvReduceOptions, LvRemoveOptions, LvRenameOptions,
    LvResizeOptions, LvsOptions, OptionList, OptionSet, PvChangeOptions, PvCreateOptions,
    PvMoveOptions, PvRemoveOptions, PvResizeOptions, PvsOptions, ValidationError, VersionOptions,
    VgChangeOptions, VgCreateOptions, VgExtendOptions, VgReduceOptions, VgRemoveOptions,
    VgRenameOptions, VgsOptions,
};
use crate::exec::{ExecContext, ExecError};

/// Exit code reported by injected failures (LVM's generic failure code).
pub const MOCK_FAILURE_CODE: i32 = 5;

/// Mock client for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockClient {
    inner: Arc<Mutex<MockClientInner>>,
}

#[derive(Debug, Default)]
struct MockClientInner {
    version: Version,
    volume_groups: Vec<VolumeGroup>,
    logical_volumes: Vec<LogicalVolume>,
    physical_volumes: Vec<PhysicalVolume>,
    devices: Vec<DeviceListEntry>,
    delay: Option<Duration>,
    fail_on: Option<(&'static str, String)>,
    operations: Vec<MockOperation>,
}

/// Recorded call for test verification.
#[derive(Debug, Clone)]
pub struct MockOperation {
    /// LVM subcommand, e.g. `vgcreate`.
    pub command: &'static str,
    /// Rendered arguments, without the subcommand.
    pub args: Vec<String>,
    pub force_no_nsenter: bool,
    pub default_volume_group: Option<String>,
    pub environment: BTreeMap<String, String>,
    pub wait_delay: Duration,
    pub started: Instant,
    pub finished: Instant,
}

impl MockOperation {
    /// Whether the two calls were in flight at the same time.
    pub fn overlaps(&self, other: &MockOperation) -> bool {
        self.started < other.finished && other.started < self.finished
    }
}

impl MockClient {
    /// Create a mock client with no canned data.
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockClientInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_version(self, version: Version) -> Self {
        self.state().version = version;
        self
    }

    pub fn with_volume_groups(self, vgs: Vec<VolumeGroup>) -> Self {
        self.state().volume_groups = vgs;
        self
    }

    pub fn with_logical_volumes(self, lvs: Vec<LogicalVolume>) -> Self {
        self.state().logical_volumes = lvs;
        self
    }

    pub fn with_physical_volumes(self, pvs: Vec<PhysicalVolume>) -> Self {
        self.state().physical_volumes = pvs;
        self
    }

    /// Entries returned by `dev_list`, whatever devices file is named.
    pub fn with_devices(self, devices: Vec<DeviceListEntry>) -> Self {
        self.state().devices = devices;
        self
    }

    /// Make every call take `delay` before completing.
    pub fn with_delay(self, delay: Duration) -> Self {
        self.state().delay = Some(delay);
        self
    }

    /// Make calls to `command` fail as if LVM exited non-zero with `stderr`.
    pub fn fail_on(self, command: &'static str, stderr: impl Into<String>) -> Self {
        self.state().fail_on = Some((command, stderr.into()));
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Get all recorded operations, in completion order.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Recorded operations for one command.
    pub fn operations_for(&self, command: &str) -> Vec<MockOperation> {
        self.state()
            .operations
            .iter()
            .filter(|op| op.command == command)
            .cloned()
            .collect()
    }

    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Validate and render `opts`, wait out the configured delay, record
    /// the call and apply any injected failure.
    async fn call<S: OptionSet>(
        &self,
        ctx: &ExecContext,
        opts: &OptionList<S>,
    ) -> Result<(), ClientError> {
        let args = opts
            .as_args_scoped(ctx.default_volume_group())?
            .into_vec();
        let started = Instant::now();
        let delay = self.state().delay;

        let mut cancelled = false;
        if let Some(delay) = delay {
            match ctx.cancellation() {
                Some(token) => {
                    tokio::select! {
                        () = token.cancelled() => cancelled = true,
                        () = tokio::time::sleep(delay) => {}
                    }
                }
                None => tokio::time::sleep(delay).await,
            }
        }

        let mut state = self.state();
        state.operations.push(MockOperation {
            command: S::COMMAND,
            args,
            force_no_nsenter: ctx.force_no_nsenter(),
            default_volume_group: ctx.default_volume_group().map(ToString::to_string),
            environment: ctx.custom_environment().cloned().unwrap_or_default(),
            wait_delay: ctx.wait_delay(),
            started,
            finished: Instant::now(),
        });

        let source = match &state.fail_on {
            _ if cancelled => ExecError::Cancelled,
            Some((command, stderr)) if *command == S::COMMAND => ExecError::Exited {
                code: Some(MOCK_FAILURE_CODE),
                stderr: stderr.clone(),
            },
            _ => return Ok(()),
        };
        Err(ClientError::Execution {
            operation: S::COMMAND,
            resource: String::new(),
            source,
        })
    }
}

#[async_trait]
impl Client for MockClient {
    async fn version(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VersionOptions>,
    ) -> Result<Version, ClientError> {
        self.call(ctx, &opts).await?;
        Ok(self.state().version.clone())
    }

    async fn vg(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<VolumeGroup, ClientError> {
        let name = opts
            .aggregate()
            .volume_group_name
            .or_else(|| ctx.default_volume_group().cloned());
        let Some(name) = name else {
            return Err(ValidationError::MissingRequired {
                command: VgsOptions::COMMAND,
                option: "VolumeGroupName",
            }
            .into());
        };
        self.vgs(ctx, opts.with(name.clone()))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::VolumeGroupNotFound(name.to_string()))
    }

    async fn vgs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<Vec<VolumeGroup>, ClientError> {
        self.call(ctx, &opts).await?;
        let name = opts.aggregate().volume_group_name;
        Ok(self
            .state()
            .volume_groups
            .iter()
            .filter(|vg| name.as_ref().map_or(true, |n| vg.name == *n))
            .cloned()
            .collect())
    }

    async fn vg_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgCreateOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn vg_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn vg_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgExtendOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn vg_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgReduceOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn vg_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRenameOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn vg_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgChangeOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn lv(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<LogicalVolume, ClientError> {
        let (vg, lv) = lv_target(&opts, ctx)?;
        self.lvs(ctx, opts)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::LogicalVolumeNotFound(lv.qualified(&vg)))
    }

    async fn lvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<Vec<LogicalVolume>, ClientError> {
        self.call(ctx, &opts).await?;
        let scope = opts.aggregate_scoped(ctx.default_volume_group());
        Ok(self
            .state()
            .logical_volumes
            .iter()
            .filter(|lv| {
                scope
                    .volume_group_name
                    .as_ref()
                    .map_or(true, |vg| lv.volume_group_name == *vg)
                    && scope
                        .logical_volume_name
                        .as_ref()
                        .map_or(true, |name| lv.name == *name)
            })
            .cloned()
            .collect())
    }

    async fn lv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvCreateOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn lv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn lv_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvExtendOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn lv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvResizeOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn lv_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvReduceOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn lv_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRenameOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn lv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvChangeOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn pvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvsOptions>,
    ) -> Result<Vec<PhysicalVolume>, ClientError> {
        self.call(ctx, &opts).await?;
        let names = opts.aggregate().physical_volume_names;
        Ok(self
            .state()
            .physical_volumes
            .iter()
            .filter(|pv| names.is_empty() || names.0.contains(&pv.name))
            .cloned()
            .collect())
    }

    async fn pv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvCreateOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn pv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn pv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvResizeOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn pv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvChangeOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn pv_move(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvMoveOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn dev_list(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevListOptions>,
    ) -> Result<Vec<DeviceListEntry>, ClientError> {
        self.call(ctx, &opts).await?;
        Ok(self.state().devices.clone())
    }

    async fn dev_check(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevCheckOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn dev_update(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevUpdateOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }

    async fn dev_modify(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevModifyOptions>,
    ) -> Result<(), ClientError> {
        self.call(ctx, &opts).await
    }
}
