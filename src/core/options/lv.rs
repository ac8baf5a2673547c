//! core::options::lv
//!
//! Options for the logical volume commands.
//!
//! Logical volumes are addressed as `vg/lv`, so every mutating command
//! here needs both names, and all of them lock on the volume group whose
//! metadata they change.

use super::common::validate_tag_lists;
use super::{
    render_report, Activate, CommonOptions, DelTags, Extents, Force, NewLogicalVolumeName,
    OptionSet, PhysicalVolumeNames, ResizeFs, ResourceScope, Select, Size, Tags, ValidationError,
    Zero,
};
use crate::core::args::Arguments;
use crate::core::types::{LogicalVolumeName, VolumeGroupName};

/// Report columns requested from `lvs`.
pub(crate) const LV_REPORT_FIELDS: &[&str] = &[
    "lv_name",
    "vg_name",
    "lv_uuid",
    "lv_attr",
    "lv_size",
    "lv_path",
    "lv_active",
    "lv_tags",
];

fn require_target(
    command: &'static str,
    vg: &Option<VolumeGroupName>,
    lv: &Option<LogicalVolumeName>,
) -> Result<(), ValidationError> {
    if vg.is_none() {
        return Err(ValidationError::MissingRequired {
            command,
            option: "VolumeGroupName",
        });
    }
    if lv.is_none() {
        return Err(ValidationError::MissingRequired {
            command,
            option: "LogicalVolumeName",
        });
    }
    Ok(())
}

/// Exactly one of size or extents.
fn require_one_size(
    command: &'static str,
    size: &Option<Size>,
    extents: &Option<Extents>,
) -> Result<(), ValidationError> {
    match (size, extents) {
        (Some(_), Some(_)) => Err(ValidationError::Conflict {
            command,
            first: "Size",
            second: "Extents",
        }),
        (None, None) => Err(ValidationError::AtLeastOne {
            command,
            options: &["Size", "Extents"],
        }),
        (None, Some(extents)) => extents.validate(),
        (Some(_), None) => Ok(()),
    }
}

/// Render `vg/lv`, or just `vg` when no logical volume is named.
fn render_target(
    args: &mut Arguments,
    vg: &Option<VolumeGroupName>,
    lv: &Option<LogicalVolumeName>,
) {
    match (vg, lv) {
        (Some(vg), Some(lv)) => args.add_or_replace(lv.qualified(vg)),
        (Some(vg), None) => args.add_or_replace(vg.as_str()),
        _ => {}
    }
}

fn vg_lock_keys(vg: &Option<VolumeGroupName>) -> Vec<String> {
    vg.iter().map(|vg| vg.to_string()).collect()
}

/// Options for `lvs`.
///
/// Without names every logical volume is reported; a logical volume name
/// requires its volume group.
#[derive(Debug, Clone, Default)]
pub struct LvsOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub select: Option<Select>,
    pub common: CommonOptions,
}

impl OptionSet for LvsOptions {
    const COMMAND: &'static str = "lvs";

    /// Only a named logical volume needs its group.
    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        if self.logical_volume_name.is_some() {
            self.volume_group_name.get_or_insert_with(|| vg.clone());
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.logical_volume_name.is_some() && self.volume_group_name.is_none() {
            return Err(ValidationError::MissingRequired {
                command: Self::COMMAND,
                option: "VolumeGroupName",
            });
        }
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        render_report(args, LV_REPORT_FIELDS);
        args.apply(&self.select);
        render_target(args, &self.volume_group_name, &self.logical_volume_name);
        args.apply(&self.common);
    }
}

apply_fields!(LvsOptions {
    VolumeGroupName => volume_group_name,
    LogicalVolumeName => logical_volume_name,
    Select => select,
});
common_fields!(LvsOptions);

/// Options for `lvcreate`.
///
/// Exactly one of [`Size`] or [`Extents`] is required.
#[derive(Debug, Clone, Default)]
pub struct LvCreateOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub size: Option<Size>,
    pub extents: Option<Extents>,
    pub tags: Tags,
    pub activate: Option<Activate>,
    pub zero: Option<Zero>,
    pub physical_volume_names: PhysicalVolumeNames,
    pub common: CommonOptions,
}

impl OptionSet for LvCreateOptions {
    const COMMAND: &'static str = "lvcreate";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_target(
            Self::COMMAND,
            &self.volume_group_name,
            &self.logical_volume_name,
        )?;
        require_one_size(Self::COMMAND, &self.size, &self.extents)?;
        if let Some(extents) = &self.extents {
            if extents.is_relative() {
                return Err(ValidationError::Invalid(
                    "relative extents cannot be used to create a logical volume".into(),
                ));
            }
        }
        validate_tag_lists(&self.tags, &DelTags::default())
    }

    fn render(&self, args: &mut Arguments) {
        if let Some(lv) = &self.logical_volume_name {
            args.add_or_replace(format!("--name={lv}"));
        }
        args.apply(&self.size)
            .apply(&self.extents)
            .apply(&self.tags)
            .apply(&self.activate)
            .apply(&self.zero)
            .apply(&self.volume_group_name)
            .apply(&self.physical_volume_names)
            .apply(&self.common);
    }
}

impl ResourceScope for LvCreateOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(LvCreateOptions {
    VolumeGroupName => volume_group_name,
    LogicalVolumeName => logical_volume_name,
    Size => size,
    Extents => extents,
    Tags => tags,
    Activate => activate,
    Zero => zero,
    PhysicalVolumeNames => physical_volume_names,
});
common_fields!(LvCreateOptions);

/// Options for `lvremove`.
#[derive(Debug, Clone, Default)]
pub struct LvRemoveOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub force: Force,
    pub common: CommonOptions,
}

impl OptionSet for LvRemoveOptions {
    const COMMAND: &'static str = "lvremove";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_target(
            Self::COMMAND,
            &self.volume_group_name,
            &self.logical_volume_name,
        )
    }

    fn render(&self, args: &mut Arguments) {
        render_target(args, &self.volume_group_name, &self.logical_volume_name);
        args.apply(&self.force).apply(&self.common);
    }
}

impl ResourceScope for LvRemoveOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(LvRemoveOptions {
    VolumeGroupName => volume_group_name,
    LogicalVolumeName => logical_volume_name,
    Force => force,
});
common_fields!(LvRemoveOptions);

/// Options for `lvextend`.
///
/// Exactly one of [`Size`] (the new total size) or [`Extents`] (absolute,
/// or relative with a leading `+`) is required.
#[derive(Debug, Clone, Default)]
pub struct LvExtendOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub size: Option<Size>,
    pub extents: Option<Extents>,
    pub resize_fs: ResizeFs,
    pub physical_volume_names: PhysicalVolumeNames,
    pub common: CommonOptions,
}

impl OptionSet for LvExtendOptions {
    const COMMAND: &'static str = "lvextend";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_target(
            Self::COMMAND,
            &self.volume_group_name,
            &self.logical_volume_name,
        )?;
        require_one_size(Self::COMMAND, &self.size, &self.extents)
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.size)
            .apply(&self.extents)
            .apply(&self.resize_fs);
        render_target(args, &self.volume_group_name, &self.logical_volume_name);
        args.apply(&self.physical_volume_names).apply(&self.common);
    }
}

impl ResourceScope for LvExtendOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(LvExtendOptions {
    VolumeGroupName => volume_group_name,
    LogicalVolumeName => logical_volume_name,
    Size => size,
    Extents => extents,
    ResizeFs => resize_fs,
    PhysicalVolumeNames => physical_volume_names,
});
common_fields!(LvExtendOptions);

/// Options for `lvresize`.
///
/// Like [`LvExtendOptions`], but the new size may also be smaller than
/// the current one.
#[derive(Debug, Clone, Default)]
pub struct LvResizeOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub size: Option<Size>,
    pub extents: Option<Extents>,
    pub resize_fs: ResizeFs,
    pub physical_volume_names: PhysicalVolumeNames,
    pub common: CommonOptions,
}

impl OptionSet for LvResizeOptions {
    const COMMAND: &'static str = "lvresize";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_target(
            Self::COMMAND,
            &self.volume_group_name,
            &self.logical_volume_name,
        )?;
        require_one_size(Self::COMMAND, &self.size, &self.extents)
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.size)
            .apply(&self.extents)
            .apply(&self.resize_fs);
        render_target(args, &self.volume_group_name, &self.logical_volume_name);
        args.apply(&self.physical_volume_names).apply(&self.common);
    }
}

impl ResourceScope for LvResizeOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(LvResizeOptions {
    VolumeGroupName => volume_group_name,
    LogicalVolumeName => logical_volume_name,
    Size => size,
    Extents => extents,
    ResizeFs => resize_fs,
    PhysicalVolumeNames => physical_volume_names,
});
common_fields!(LvResizeOptions);

/// Options for `lvreduce`.
///
/// The target is an absolute [`Size`] or extent count. Without
/// [`ResizeFs`], LVM refuses to shrink a volume holding a filesystem
/// unless [`Force`] is given.
#[derive(Debug, Clone, Default)]
pub struct LvReduceOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub size: Option<Size>,
    pub extents: Option<Extents>,
    pub resize_fs: ResizeFs,
    pub force: Force,
    pub common: CommonOptions,
}

impl OptionSet for LvReduceOptions {
    const COMMAND: &'static str = "lvreduce";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_target(
            Self::COMMAND,
            &self.volume_group_name,
            &self.logical_volume_name,
        )?;
        require_one_size(Self::COMMAND, &self.size, &self.extents)?;
        if self.extents.is_some_and(|extents| extents.is_relative()) {
            return Err(ValidationError::Invalid(
                "relative extents would grow the logical volume, not reduce it".into(),
            ));
        }
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.size)
            .apply(&self.extents)
            .apply(&self.resize_fs)
            .apply(&self.force);
        render_target(args, &self.volume_group_name, &self.logical_volume_name);
        args.apply(&self.common);
    }
}

impl ResourceScope for LvReduceOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(LvReduceOptions {
    VolumeGroupName => volume_group_name,
    LogicalVolumeName => logical_volume_name,
    Size => size,
    Extents => extents,
    ResizeFs => resize_fs,
    Force => force,
});
common_fields!(LvReduceOptions);

/// Options for `lvrename`.
#[derive(Debug, Clone, Default)]
pub struct LvRenameOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub new_logical_volume_name: Option<NewLogicalVolumeName>,
    pub common: CommonOptions,
}

impl OptionSet for LvRenameOptions {
    const COMMAND: &'static str = "lvrename";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_target(
            Self::COMMAND,
            &self.volume_group_name,
            &self.logical_volume_name,
        )?;
        let Some(NewLogicalVolumeName(new_name)) = &self.new_logical_volume_name else {
            return Err(ValidationError::MissingRequired {
                command: Self::COMMAND,
                option: "NewLogicalVolumeName",
            });
        };
        if self.logical_volume_name.as_ref() == Some(new_name) {
            return Err(ValidationError::Invalid(format!(
                "logical volume {new_name} cannot be renamed to itself"
            )));
        }
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        // lvrename VG OLD NEW
        if let Some(vg) = &self.volume_group_name {
            args.add(vg.as_str());
        }
        if let Some(old) = &self.logical_volume_name {
            args.add(old.as_str());
        }
        if let Some(NewLogicalVolumeName(new_name)) = &self.new_logical_volume_name {
            args.add(new_name.as_str());
        }
        args.apply(&self.common);
    }
}

impl ResourceScope for LvRenameOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(LvRenameOptions {
    VolumeGroupName => volume_group_name,
    LogicalVolumeName => logical_volume_name,
    NewLogicalVolumeName => new_logical_volume_name,
});
common_fields!(LvRenameOptions);

/// Options for `lvchange`. At least one change must be requested.
#[derive(Debug, Clone, Default)]
pub struct LvChangeOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub activate: Option<Activate>,
    pub tags: Tags,
    pub del_tags: DelTags,
    pub common: CommonOptions,
}

impl OptionSet for LvChangeOptions {
    const COMMAND: &'static str = "lvchange";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_target(
            Self::COMMAND,
            &self.volume_group_name,
            &self.logical_volume_name,
        )?;
        if self.activate.is_none() && self.tags.0.is_empty() && self.del_tags.0.is_empty() {
            return Err(ValidationError::AtLeastOne {
                command: Self::COMMAND,
                options: &["Activate", "Tags", "DelTags"],
            });
        }
        validate_tag_lists(&self.tags, &self.del_tags)
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.activate)
            .apply(&self.tags)
            .apply(&self.del_tags);
        render_target(args, &self.volume_group_name, &self.logical_volume_name);
        args.apply(&self.common);
    }
}

impl ResourceScope for LvChangeOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(LvChangeOptions {
    VolumeGroupName => volume_group_name,
    LogicalVolumeName => logical_volume_name,
    Activate => activate,
    Tags => tags,
    DelTags => del_tags,
});
common_fields!(LvChangeOptions);
