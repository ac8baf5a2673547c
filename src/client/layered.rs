//! client::layered
//!
//! Context-deriving client decorators.
//!
//! # Design
//!
//! A [`LayeredClient`] holds another client and a [`ContextLayer`]. Every
//! call derives a new context through the layer, then delegates with
//! unchanged options. Signatures, return values and errors pass through
//! untouched.
//!
//! This lets a long-lived component hold one client whose every call, for
//! example, skips nsenter, without touching any call site:
//!
//! ```
//! use lvmkit::client::{with_no_nsenter, ContextLayer, NoNsenter};
//! use lvmkit::client::mock::MockClient;
//! use lvmkit::exec::ExecContext;
//!
//! let _client = with_no_nsenter(MockClient::new());
//! assert!(NoNsenter.layer(&ExecContext::new()).force_no_nsenter());
//! ```
//!
//! Layers stack: a `LayeredClient<LayeredClient<C, A>, B>` applies `B`
//! first, then `A`.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::ClientError;
use super::report::{
    DeviceListEntry, LogicalVolume, PhysicalVolume, Version, VolumeGroup,
};
use super::Client;
use crate::core::options::{
    DevCheckOptions, DevListOptions, DevModifyOptions, DevUpdateOptions, LvChangeOptions,
    LvCreateOptions, LvExtendOptions, LvReduceOptions, LvRemoveOptions, LvRenameOptions,
    LvResizeOptions, LvsOptions, OptionList, PvChangeOptions, PvCreateOptions, PvMoveOptions,
    PvRemoveOptions, PvResizeOptions, PvsOptions, VersionOptions, VgChangeOptions, VgCreateOptions,
    VgExtendOptions, VgReduceOptions, VgRemoveOptions, VgRenameOptions, VgsOptions,
};
use crate::core::types::VolumeGroupName;
use crate::exec::ExecContext;

/// Derives the context a wrapped client sees.
pub trait ContextLayer: Send + Sync {
    fn layer(&self, ctx: &ExecContext) -> ExecContext;
}

/// Forces the nsenter bypass on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNsenter;

impl ContextLayer for NoNsenter {
    fn layer(&self, ctx: &ExecContext) -> ExecContext {
        ctx.with_force_no_nsenter(true)
    }
}

/// Applies the same environment, wait delay or default volume group to
/// every call. Unset fields leave the caller's context alone.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    environment: Option<BTreeMap<String, String>>,
    wait_delay: Option<Duration>,
    default_volume_group: Option<VolumeGroupName>,
}

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the custom environment of every call.
    pub fn environment(mut self, env: BTreeMap<String, String>) -> Self {
        self.environment = Some(env);
        self
    }

    pub fn wait_delay(mut self, delay: Duration) -> Self {
        self.wait_delay = Some(delay);
        self
    }

    pub fn default_volume_group(mut self, vg: VolumeGroupName) -> Self {
        self.default_volume_group = Some(vg);
        self
    }
}

impl ContextLayer for Overrides {
    fn layer(&self, ctx: &ExecContext) -> ExecContext {
        let mut ctx = ctx.clone();
        if let Some(env) = &self.environment {
            ctx = ctx.with_custom_environment(env.clone());
        }
        if let Some(delay) = self.wait_delay {
            ctx = ctx.with_wait_delay(delay);
        }
        if let Some(vg) = &self.default_volume_group {
            ctx = ctx.with_default_volume_group(vg.clone());
        }
        ctx
    }
}

/// A client whose every call sees a context derived by `L`.
#[derive(Debug, Clone)]
pub struct LayeredClient<C, L> {
    inner: C,
    layer: L,
}

impl<C: Client, L: ContextLayer> LayeredClient<C, L> {
    pub fn new(inner: C, layer: L) -> Self {
        Self { inner, layer }
    }

    pub fn inner(&self) -> &C {
        &self.inner
    }

    pub fn layer(&self) -> &L {
        &self.layer
    }
}

/// Wrap `client` so no command it runs goes through nsenter.
pub fn with_no_nsenter<C: Client>(client: C) -> LayeredClient<C, NoNsenter> {
    LayeredClient::new(client, NoNsenter)
}

#[async_trait]
impl<C: Client, L: ContextLayer> Client for LayeredClient<C, L> {
    async fn version(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VersionOptions>,
    ) -> Result<Version, ClientError> {
        self.inner.version(&self.layer.layer(ctx), opts).await
    }

    async fn vg(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<VolumeGroup, ClientError> {
        self.inner.vg(&self.layer.layer(ctx), opts).await
    }

    async fn vgs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<Vec<VolumeGroup>, ClientError> {
        self.inner.vgs(&self.layer.layer(ctx), opts).await
    }

    async fn vg_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgCreateOptions>,
    ) -> Result<(), ClientError> {
        self.inner.vg_create(&self.layer.layer(ctx), opts).await
    }

    async fn vg_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.inner.vg_remove(&self.layer.layer(ctx), opts).await
    }

    async fn vg_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgExtendOptions>,
    ) -> Result<(), ClientError> {
        self.inner.vg_extend(&self.layer.layer(ctx), opts).await
    }

    async fn vg_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgReduceOptions>,
    ) -> Result<(), ClientError> {
        self.inner.vg_reduce(&self.layer.layer(ctx), opts).await
    }

    async fn vg_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRenameOptions>,
    ) -> Result<(), ClientError> {
        self.inner.vg_rename(&self.layer.layer(ctx), opts).await
    }

    async fn vg_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgChangeOptions>,
    ) -> Result<(), ClientError> {
        self.inner.vg_change(&self.layer.layer(ctx), opts).await
    }

    async fn lv(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<LogicalVolume, ClientError> {
        self.inner.lv(&self.layer.layer(ctx), opts).await
    }

    async fn lvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<Vec<LogicalVolume>, ClientError> {
        self.inner.lvs(&self.layer.layer(ctx), opts).await
    }

    async fn lv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvCreateOptions>,
    ) -> Result<(), ClientError> {
        self.inner.lv_create(&self.layer.layer(ctx), opts).await
    }

    async fn lv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.inner.lv_remove(&self.layer.layer(ctx), opts).await
    }

    async fn lv_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvExtendOptions>,
    ) -> Result<(), ClientError> {
        self.inner.lv_extend(&self.layer.layer(ctx), opts).await
    }

    async fn lv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvResizeOptions>,
    ) -> Result<(), ClientError> {
        self.inner.lv_resize(&self.layer.layer(ctx), opts).await
    }

    async fn lv_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvReduceOptions>,
    ) -> Result<(), ClientError> {
        self.inner.lv_reduce(&self.layer.layer(ctx), opts).await
    }

    async fn lv_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRenameOptions>,
    ) -> Result<(), ClientError> {
        self.inner.lv_rename(&self.layer.layer(ctx), opts).await
    }

    async fn lv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvChangeOptions>,
    ) -> Result<(), ClientError> {
        self.inner.lv_change(&self.layer.layer(ctx), opts).await
    }

    async fn pvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvsOptions>,
    ) -> Result<Vec<PhysicalVolume>, ClientError> {
        self.inner.pvs(&self.layer.layer(ctx), opts).await
    }

    async fn pv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvCreateOptions>,
    ) -> Result<(), ClientError> {
        self.inner.pv_create(&self.layer.layer(ctx), opts).await
    }

    async fn pv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.inner.pv_remove(&self.layer.layer(ctx), opts).await
    }

    async fn pv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvResizeOptions>,
    ) -> Result<(), ClientError> {
        self.inner.pv_resize(&self.layer.layer(ctx), opts).await
    }

    async fn pv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvChangeOptions>,
    ) -> Result<(), ClientError> {
        self.inner.pv_change(&self.layer.layer(ctx), opts).await
    }

    async fn pv_move(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvMoveOptions>,
    ) -> Result<(), ClientError> {
        self.inner.pv_move(&self.layer.layer(ctx), opts).await
    }

    async fn dev_list(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevListOptions>,
    ) -> Result<Vec<DeviceListEntry>, ClientError> {
        self.inner.dev_list(&self.layer.layer(ctx), opts).await
    }

    async fn dev_check(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevCheckOptions>,
    ) -> Result<(), ClientError> {
        self.inner.dev_check(&self.layer.layer(ctx), opts).await
    }

    async fn dev_update(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevUpdateOptions>,
    ) -> Result<(), ClientError> {
        self.inner.dev_update(&self.layer.layer(ctx), opts).await
    }

    async fn dev_modify(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevModifyOptions>,
    ) -> Result<(), ClientError> {
        self.inner.dev_modify(&self.layer.layer(ctx), opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_nsenter_sets_only_the_bypass() {
        let parent = ExecContext::new().with_wait_delay(Duration::from_secs(1));
        let derived = NoNsenter.layer(&parent);
        assert!(derived.force_no_nsenter());
        assert_eq!(derived.wait_delay(), Duration::from_secs(1));
        assert!(!parent.force_no_nsenter());
    }

    #[test]
    fn overrides_leave_unset_fields_alone() {
        let vg = VolumeGroupName::new("vg0").unwrap();
        let parent = ExecContext::new()
            .with_force_no_nsenter(true)
            .with_default_volume_group(vg.clone());
        let derived = Overrides::new()
            .wait_delay(Duration::from_millis(300))
            .layer(&parent);

        assert!(derived.force_no_nsenter());
        assert_eq!(derived.default_volume_group(), Some(&vg));
        assert_eq!(derived.wait_delay(), Duration::from_millis(300));
    }

    #[test]
    fn overrides_replace_environment() {
        let env = BTreeMap::from([("LVM_SYSTEM_DIR".to_string(), "/etc/lvm".to_string())]);
        let derived = Overrides::new()
            .environment(env.clone())
            .layer(&ExecContext::new());
        assert_eq!(derived.custom_environment(), Some(&env));
    }
}
