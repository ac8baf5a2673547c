//! client::lvm
//!
//! Client backed by the `lvm` binary.
//!
//! # Design
//!
//! Every operation renders its option list, prefixes the LVM subcommand
//! and runs `lvm <subcommand> <args...>` through the command builder and
//! runner. Report commands ask for JSON output which is parsed into the
//! models in [`super::report`]. Execution failures are wrapped with the
//! operation name and target resource so callers can classify them.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::errors::ClientError;
use super::report::{
    parse_device_list, parse_logical_volumes, parse_physical_volumes, parse_volume_groups,
    DeviceListEntry, LogicalVolume, PhysicalVolume, Version, VolumeGroup,
};
use super::Client;
use crate::core::config::{Config, DEFAULT_LVM_PATH};
use crate::core::options::{
    CommonOptions, DevCheckOptions, DevListOptions, DevModifyOptions, DevUpdateOptions,
    LvChangeOptions, LvCreateOptions, LvExtendOptions, LvReduceOptions, LvRemoveOptions,
    LvRenameOptions, LvResizeOptions, LvsOptions, OptionList, OptionSet, PvChangeOptions,
    PvCreateOptions, PvMoveOptions, PvRemoveOptions, PvResizeOptions, PvsOptions, ResourceScope,
    ValidationError, VersionOptions, VgChangeOptions, VgCreateOptions, VgExtendOptions,
    VgReduceOptions, VgRemoveOptions, VgRenameOptions, VgsOptions, SYSTEM_DEVICES_FILE,
};
use crate::core::types::{LogicalVolumeName, VolumeGroupName};
use crate::exec::{run, CommandBuilder, ExecContext, Output};

/// Runs LVM commands on the host.
#[derive(Debug, Clone)]
pub struct LvmClient {
    lvm_path: PathBuf,
    builder: CommandBuilder,
}

impl Default for LvmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl LvmClient {
    /// A client running `lvm` from `PATH`, wrapped in nsenter when the
    /// process is containerized.
    pub fn new() -> Self {
        Self {
            lvm_path: PathBuf::from(DEFAULT_LVM_PATH),
            builder: CommandBuilder::detect(),
        }
    }

    /// A client using the binary paths from `config`.
    pub fn from_config(config: &Config) -> Self {
        Self {
            lvm_path: config.lvm_path(),
            builder: CommandBuilder::detect().with_nsenter_path(config.nsenter_path()),
        }
    }

    pub fn with_lvm_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lvm_path = path.into();
        self
    }

    /// Replace the command builder, e.g. to pin containerization.
    pub fn with_builder(mut self, builder: CommandBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn lvm_path(&self) -> &Path {
        &self.lvm_path
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    async fn run_lvm<S: OptionSet>(
        &self,
        ctx: &ExecContext,
        opts: &OptionList<S>,
        resource: String,
    ) -> Result<Output, ClientError> {
        let args = opts.as_args_scoped(ctx.default_volume_group())?;
        let spec = self.builder.build(
            ctx,
            &self.lvm_path,
            std::iter::once(S::COMMAND.to_string()).chain(args),
        );
        run(&spec).await.map_err(|source| ClientError::Execution {
            operation: S::COMMAND,
            resource,
            source,
        })
    }

    async fn mutate<S: OptionSet + ResourceScope>(
        &self,
        ctx: &ExecContext,
        opts: OptionList<S>,
    ) -> Result<(), ClientError> {
        let resource = opts
            .aggregate_scoped(ctx.default_volume_group())
            .lock_keys()
            .join(",");
        self.run_lvm(ctx, &opts, resource).await?;
        Ok(())
    }
}

fn name_or_empty<T: ToString>(name: &Option<T>) -> String {
    name.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Both names `lv` needs, with the volume group defaulted from `ctx`.
pub(super) fn lv_target(
    opts: &OptionList<LvsOptions>,
    ctx: &ExecContext,
) -> Result<(VolumeGroupName, LogicalVolumeName), ClientError> {
    let scope = opts.aggregate_scoped(ctx.default_volume_group());
    let missing = |option| ValidationError::MissingRequired {
        command: LvsOptions::COMMAND,
        option,
    };
    let vg = scope
        .volume_group_name
        .ok_or_else(|| missing("VolumeGroupName"))?;
    let lv = scope
        .logical_volume_name
        .ok_or_else(|| missing("LogicalVolumeName"))?;
    Ok((vg, lv))
}

fn devices_file_name(common: &CommonOptions) -> String {
    common
        .devices_file
        .as_ref()
        .map(|file| file.0.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| SYSTEM_DEVICES_FILE.to_string())
}

#[async_trait]
impl Client for LvmClient {
    async fn version(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VersionOptions>,
    ) -> Result<Version, ClientError> {
        let output = self.run_lvm(ctx, &opts, String::new()).await?;
        Version::parse(&output.stdout)
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
            .find(|vg| vg.name == name)
            .ok_or_else(|| ClientError::VolumeGroupNotFound(name.to_string()))
    }

    async fn vgs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgsOptions>,
    ) -> Result<Vec<VolumeGroup>, ClientError> {
        let resource = name_or_empty(&opts.aggregate().volume_group_name);
        let output = self.run_lvm(ctx, &opts, resource).await?;
        parse_volume_groups(&output.stdout)
    }

    async fn vg_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgCreateOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn vg_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn vg_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgExtendOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn vg_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgReduceOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn vg_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgRenameOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn vg_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<VgChangeOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
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
            .find(|found| found.name == lv && found.volume_group_name == vg)
            .ok_or_else(|| ClientError::LogicalVolumeNotFound(lv.qualified(&vg)))
    }

    async fn lvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvsOptions>,
    ) -> Result<Vec<LogicalVolume>, ClientError> {
        let scope = opts.aggregate_scoped(ctx.default_volume_group());
        let resource = name_or_empty(&scope.volume_group_name);
        let output = self.run_lvm(ctx, &opts, resource).await?;
        parse_logical_volumes(&output.stdout)
    }

    async fn lv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvCreateOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn lv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn lv_extend(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvExtendOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn lv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvResizeOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn lv_reduce(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvReduceOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn lv_rename(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvRenameOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn lv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<LvChangeOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn pvs(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvsOptions>,
    ) -> Result<Vec<PhysicalVolume>, ClientError> {
        let resource = opts
            .aggregate()
            .physical_volume_names
            .0
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let output = self.run_lvm(ctx, &opts, resource).await?;
        parse_physical_volumes(&output.stdout)
    }

    async fn pv_create(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvCreateOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn pv_remove(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvRemoveOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn pv_resize(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvResizeOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn pv_change(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvChangeOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn pv_move(
        &self,
        ctx: &ExecContext,
        opts: OptionList<PvMoveOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn dev_list(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevListOptions>,
    ) -> Result<Vec<DeviceListEntry>, ClientError> {
        let output = self.run_lvm(ctx, &opts, devices_file_name(&opts.aggregate().common)).await?;
        parse_device_list(&output.stdout)
    }

    async fn dev_check(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevCheckOptions>,
    ) -> Result<(), ClientError> {
        self.run_lvm(ctx, &opts, devices_file_name(&opts.aggregate().common)).await?;
        Ok(())
    }

    async fn dev_update(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevUpdateOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }

    async fn dev_modify(
        &self,
        ctx: &ExecContext,
        opts: OptionList<DevModifyOptions>,
    ) -> Result<(), ClientError> {
        self.mutate(ctx, opts).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::FileConfig;

    #[test]
    fn defaults() {
        let client = LvmClient::new();
        assert_eq!(client.lvm_path(), Path::new("lvm"));
        assert_eq!(client.builder().nsenter_path(), Path::new("/usr/bin/nsenter"));
    }

    #[test]
    fn from_config_uses_configured_paths() {
        let config = Config::from_file(FileConfig {
            lvm_path: Some(PathBuf::from("/sbin/lvm")),
            nsenter_path: Some(PathBuf::from("/host/nsenter")),
            ..Default::default()
        });
        let client = LvmClient::from_config(&config);
        assert_eq!(client.lvm_path(), Path::new("/sbin/lvm"));
        assert_eq!(client.builder().nsenter_path(), Path::new("/host/nsenter"));
    }

    #[tokio::test]
    async fn vg_requires_a_name() {
        let err = LvmClient::new()
            .vg(&ExecContext::new(), OptionList::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn lv_reports_the_missing_volume_group() {
        let client = LvmClient::new().with_lvm_path("/nonexistent/lvm");
        let opts = OptionList::<LvsOptions>::new().with(LogicalVolumeName::new("data").unwrap());
        let err = client.lv(&ExecContext::new(), opts).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Validation(ValidationError::MissingRequired {
                option: "VolumeGroupName",
                ..
            })
        ));
    }

    #[tokio::test]
    async fn invalid_options_never_spawn() {
        let client = LvmClient::new().with_lvm_path("/nonexistent/lvm");
        let err = client
            .vg_create(&ExecContext::new(), OptionList::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn spawn_failure_is_wrapped() {
        let client = LvmClient::new()
            .with_lvm_path("/nonexistent/lvm")
            .with_builder(CommandBuilder::detect().with_containerized(false));
        let err = client
            .version(&ExecContext::new(), OptionList::new())
            .await
            .unwrap_err();
        match err {
            ClientError::Execution { operation, .. } => assert_eq!(operation, "version"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
