//! client
//!
//! The LVM client contract and its implementations.
//!
//! # Overview
//!
//! [`Client`] is the set of LVM operations. Every method takes an
//! [`ExecContext`] and an [`OptionList`] for its command:
//!
//! - [`LvmClient`] runs the real `lvm` binary
//! - [`LayeredClient`] derives a new context before delegating (the
//!   nsenter bypass, uniform environment or wait delay)
//! - [`LockingClient`] serializes mutating operations per volume group
//! - [`mock::MockClient`] records calls in memory for tests
//!
//! Decorators implement [`Client`] themselves, so they stack freely.
//!
//! # Example
//!
//! ```no_run
//! use lvmkit::client::{with_no_nsenter, Client, LockingClient, LvmClient};
//! use lvmkit::core::options::{OptionList, VgsOptions};
//! use lvmkit::exec::ExecContext;
//!
//! # async fn example() -> Result<(), lvmkit::client::ClientError> {
//! let client = LockingClient::new(with_no_nsenter(LvmClient::new()));
//! let vgs = client
//!     .vgs(&ExecContext::new(), OptionList::<VgsOptions>::new())
//!     .await?;
//! for vg in vgs {
//!     println!("{} {} bytes free", vg.name, vg.free);
//! }
//! # Ok(())
//! # }
//! ```

pub mod errors;
pub mod layered;
pub mod locking;
pub mod lvm;
pub mod mock;
pub mod report;

pub use errors::ClientError;
pub use layered::{with_no_nsenter, ContextLayer, LayeredClient, NoNsenter, Overrides};
pub use locking::{LockError, LockRegistry, LockingClient, ResourceLock};
pub use lvm::LvmClient;
pub use report::{
    DeviceIdType, DeviceListEntry, LogicalVolume, PhysicalVolume, Version, VolumeGroup,
};

use async_trait::async_trait;

use crate::core::options::{
    DevCheckOptions, DevListOptions, DevModifyOptions, DevUpdateOptions, LvChangeOptions,
    LvCreateOptions, LvExtendOptions, LvReduceOptions, LvRemoveOptions, LvRenameOptions,
    LvResizeOptions, LvsOptions, OptionList, PvChangeOptions, PvCreateOptions, PvMoveOptions,
    PvRemoveOptions, PvResizeOptions, PvsOptions, VersionOptions, VgChangeOptions,
    VgCreateOptions, VgExtendOptions, VgReduceOptions, VgRemoveOptions, VgRenameOptions,
    VgsOptions,
};
use crate::exec::ExecContext;

/// LVM operations.
///
/// Read-only operations are `version`, `vg`, `vgs`, `lv`, `lvs`, `pvs`,
/// `dev_list` and `dev_check`. Everything else mutates LVM metadata or a
/// devices file.
///
/// # Errors
///
/// Every method returns:
/// - `Validation` if the option list is invalid (no process is started)
/// - `Execution` if the command fails, carrying the operation name, the
///   target resource and the tool's stderr
#[async_trait]
pub trait Client: Send + Sync {
    /// Report the LVM, library and driver versions.
    async fn version(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VersionOptions>,
    ) -> Result<Version, ClientError>;

    /// Fetch a single volume group. Requires a [`VolumeGroupName`].
    ///
    /// [`VolumeGroupName`]: crate::core::types::VolumeGroupName
    async fn vg(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<VolumeGroup, ClientError>;

    async fn vgs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<Vec<VolumeGroup>, ClientError>;

    async fn vg_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgCreateOptions>,
    ) -> Result<(), ClientError>;

    async fn vg_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRemoveOptions>,
    ) -> Result<(), ClientError>;

    async fn vg_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgExtendOptions>,
    ) -> Result<(), ClientError>;

    async fn vg_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgReduceOptions>,
    ) -> Result<(), ClientError>;

    async fn vg_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRenameOptions>,
    ) -> Result<(), ClientError>;

    async fn vg_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgChangeOptions>,
    ) -> Result<(), ClientError>;

    /// Fetch a single logical volume. Requires both the volume group and
    /// logical volume names.
    async fn lv(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<LogicalVolume, ClientError>;

    async fn lvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<Vec<LogicalVolume>, ClientError>;

    async fn lv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvCreateOptions>,
    ) -> Result<(), ClientError>;

    async fn lv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRemoveOptions>,
    ) -> Result<(), ClientError>;

    async fn lv_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvExtendOptions>,
    ) -> Result<(), ClientError>;

    async fn lv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvResizeOptions>,
    ) -> Result<(), ClientError>;

    async fn lv_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvReduceOptions>,
    ) -> Result<(), ClientError>;

    async fn lv_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRenameOptions>,
    ) -> Result<(), ClientError>;

    async fn lv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvChangeOptions>,
    ) -> Result<(), ClientError>;

    async fn pvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvsOptions>,
    ) -> Result<Vec<PhysicalVolume>, ClientError>;

    async fn pv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvCreateOptions>,
    ) -> Result<(), ClientError>;

    async fn pv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvRemoveOptions>,
    ) -> Result<(), ClientError>;

    async fn pv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvResizeOptions>,
    ) -> Result<(), ClientError>;

    async fn pv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvChangeOptions>,
    ) -> Result<(), ClientError>;

    /// Move allocated extents off a physical volume. May run for a long
    /// time on large volumes.
    async fn pv_move(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvMoveOptions>,
    ) -> Result<(), ClientError>;

    /// List the entries of a devices file.
    async fn dev_list(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevListOptions>,
    ) -> Result<Vec<DeviceListEntry>, ClientError>;

    async fn dev_check(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevCheckOptions>,
    ) -> Result<(), ClientError>;

    async fn dev_update(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevUpdateOptions>,
    ) -> Result<(), ClientError>;

    /// Add or remove a single devices file entry.
    async fn dev_modify(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevModifyOptions>,
    ) -> Result<(), ClientError>;
}
