//! core::options::vg
//!
//! Options for the volume group commands.

use super::common::validate_tag_lists;
use super::{
    render_report, Activate, CommonOptions, DelTags, Force, NewVolumeGroupName, OptionSet,
    PhysicalExtentSize, PhysicalVolumeNames, RemoveMissing, ResourceScope, Select, Tags,
    ValidationError,
};
use crate::core::args::Arguments;
use crate::core::types::VolumeGroupName;

/// Report columns requested from `vgs`.
pub(crate) const VG_REPORT_FIELDS: &[&str] = &[
    "vg_name",
    "vg_uuid",
    "vg_attr",
    "vg_size",
    "vg_free",
    "vg_extent_size",
    "vg_extent_count",
    "vg_free_count",
    "pv_count",
    "lv_count",
    "vg_tags",
];

fn require_vg(
    command: &'static str,
    vg: &Option<VolumeGroupName>,
) -> Result<(), ValidationError> {
    if vg.is_none() {
        return Err(ValidationError::MissingRequired {
            command,
            option: "VolumeGroupName",
        });
    }
    Ok(())
}

fn vg_lock_keys(vg: &Option<VolumeGroupName>) -> Vec<String> {
    vg.iter().map(|vg| vg.to_string()).collect()
}

/// The group plus every device it gains or loses, so these commands also
/// serialize with physical volume commands on the same devices.
fn vg_and_pv_lock_keys(vg: &Option<VolumeGroupName>, pvs: &PhysicalVolumeNames) -> Vec<String> {
    let mut keys = vg_lock_keys(vg);
    keys.extend(pvs.0.iter().map(ToString::to_string));
    keys
}

/// Options for `vgs`. Without a name, every volume group is reported.
#[derive(Debug, Clone, Default)]
pub struct VgsOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub select: Option<Select>,
    pub common: CommonOptions,
}

impl OptionSet for VgsOptions {
    const COMMAND: &'static str = "vgs";

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        render_report(args, VG_REPORT_FIELDS);
        args.apply(&self.select)
            .apply(&self.volume_group_name)
            .apply(&self.common);
    }
}

apply_fields!(VgsOptions {
    VolumeGroupName => volume_group_name,
    Select => select,
});
common_fields!(VgsOptions);

/// Options for `vgcreate`.
#[derive(Debug, Clone, Default)]
pub struct VgCreateOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub physical_volume_names: PhysicalVolumeNames,
    pub physical_extent_size: Option<PhysicalExtentSize>,
    pub tags: Tags,
    pub force: Force,
    pub common: CommonOptions,
}

impl OptionSet for VgCreateOptions {
    const COMMAND: &'static str = "vgcreate";

    fn validate(&self) -> Result<(), ValidationError> {
        require_vg(Self::COMMAND, &self.volume_group_name)?;
        if self.physical_volume_names.is_empty() {
            return Err(ValidationError::MissingRequired {
                command: Self::COMMAND,
                option: "PhysicalVolumeNames",
            });
        }
        if let Some(pe_size) = &self.physical_extent_size {
            pe_size.validate()?;
        }
        validate_tag_lists(&self.tags, &DelTags::default())
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.volume_group_name)
            .apply(&self.physical_volume_names)
            .apply(&self.physical_extent_size)
            .apply(&self.tags)
            .apply(&self.force)
            .apply(&self.common);
    }
}

impl ResourceScope for VgCreateOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_and_pv_lock_keys(&self.volume_group_name, &self.physical_volume_names)
    }
}

apply_fields!(VgCreateOptions {
    VolumeGroupName => volume_group_name,
    PhysicalVolumeNames => physical_volume_names,
    PhysicalExtentSize => physical_extent_size,
    Tags => tags,
    Force => force,
});
common_fields!(VgCreateOptions);

/// Options for `vgremove`.
#[derive(Debug, Clone, Default)]
pub struct VgRemoveOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub force: Force,
    pub common: CommonOptions,
}

impl OptionSet for VgRemoveOptions {
    const COMMAND: &'static str = "vgremove";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_vg(Self::COMMAND, &self.volume_group_name)
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.volume_group_name)
            .apply(&self.force)
            .apply(&self.common);
    }
}

impl ResourceScope for VgRemoveOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(VgRemoveOptions {
    VolumeGroupName => volume_group_name,
    Force => force,
});
common_fields!(VgRemoveOptions);

/// Options for `vgextend`.
#[derive(Debug, Clone, Default)]
pub struct VgExtendOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub physical_volume_names: PhysicalVolumeNames,
    pub force: Force,
    pub common: CommonOptions,
}

impl OptionSet for VgExtendOptions {
    const COMMAND: &'static str = "vgextend";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_vg(Self::COMMAND, &self.volume_group_name)?;
        if self.physical_volume_names.is_empty() {
            return Err(ValidationError::MissingRequired {
                command: Self::COMMAND,
                option: "PhysicalVolumeNames",
            });
        }
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.volume_group_name)
            .apply(&self.physical_volume_names)
            .apply(&self.force)
            .apply(&self.common);
    }
}

impl ResourceScope for VgExtendOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_and_pv_lock_keys(&self.volume_group_name, &self.physical_volume_names)
    }
}

apply_fields!(VgExtendOptions {
    VolumeGroupName => volume_group_name,
    PhysicalVolumeNames => physical_volume_names,
    Force => force,
});
common_fields!(VgExtendOptions);

/// Options for `vgreduce`.
///
/// Either physical volumes to remove or [`RemoveMissing`] must be given.
/// `--removemissing` is rendered ahead of the positionals.
#[derive(Debug, Clone, Default)]
pub struct VgReduceOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub physical_volume_names: PhysicalVolumeNames,
    pub remove_missing: RemoveMissing,
    pub force: Force,
    pub common: CommonOptions,
}

impl OptionSet for VgReduceOptions {
    const COMMAND: &'static str = "vgreduce";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_vg(Self::COMMAND, &self.volume_group_name)?;
        if self.physical_volume_names.is_empty() && !self.remove_missing.0 {
            return Err(ValidationError::AtLeastOne {
                command: Self::COMMAND,
                options: &["PhysicalVolumeNames", "RemoveMissing"],
            });
        }
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.remove_missing)
            .apply(&self.volume_group_name)
            .apply(&self.physical_volume_names)
            .apply(&self.force)
            .apply(&self.common);
    }
}

impl ResourceScope for VgReduceOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_and_pv_lock_keys(&self.volume_group_name, &self.physical_volume_names)
    }
}

apply_fields!(VgReduceOptions {
    VolumeGroupName => volume_group_name,
    PhysicalVolumeNames => physical_volume_names,
    RemoveMissing => remove_missing,
    Force => force,
});
common_fields!(VgReduceOptions);

/// Options for `vgrename`.
#[derive(Debug, Clone, Default)]
pub struct VgRenameOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub new_volume_group_name: Option<NewVolumeGroupName>,
    pub common: CommonOptions,
}

impl OptionSet for VgRenameOptions {
    const COMMAND: &'static str = "vgrename";

    fn validate(&self) -> Result<(), ValidationError> {
        require_vg(Self::COMMAND, &self.volume_group_name)?;
        let Some(NewVolumeGroupName(new_name)) = &self.new_volume_group_name else {
            return Err(ValidationError::MissingRequired {
                command: Self::COMMAND,
                option: "NewVolumeGroupName",
            });
        };
        if self.volume_group_name.as_ref() == Some(new_name) {
            return Err(ValidationError::Invalid(format!(
                "volume group {new_name} cannot be renamed to itself"
            )));
        }
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        // Old and new names are both positionals, so they are appended
        // rather than deduplicated.
        if let Some(old) = &self.volume_group_name {
            args.add(old.as_str());
        }
        if let Some(NewVolumeGroupName(new_name)) = &self.new_volume_group_name {
            args.add(new_name.as_str());
        }
        args.apply(&self.common);
    }
}

impl ResourceScope for VgRenameOptions {
    fn lock_keys(&self) -> Vec<String> {
        let mut keys = vg_lock_keys(&self.volume_group_name);
        if let Some(NewVolumeGroupName(new_name)) = &self.new_volume_group_name {
            keys.push(new_name.to_string());
        }
        keys
    }
}

apply_fields!(VgRenameOptions {
    VolumeGroupName => volume_group_name,
    NewVolumeGroupName => new_volume_group_name,
});
common_fields!(VgRenameOptions);

/// Options for `vgchange`. At least one change must be requested.
#[derive(Debug, Clone, Default)]
pub struct VgChangeOptions {
    pub volume_group_name: Option<VolumeGroupName>,
    pub activate: Option<Activate>,
    pub tags: Tags,
    pub del_tags: DelTags,
    pub common: CommonOptions,
}

impl OptionSet for VgChangeOptions {
    const COMMAND: &'static str = "vgchange";

    fn assume_volume_group(&mut self, vg: &VolumeGroupName) {
        self.volume_group_name.get_or_insert_with(|| vg.clone());
    }

    fn validate(&self) -> Result<(), ValidationError> {
        require_vg(Self::COMMAND, &self.volume_group_name)?;
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
            .apply(&self.del_tags)
            .apply(&self.volume_group_name)
            .apply(&self.common);
    }
}

impl ResourceScope for VgChangeOptions {
    fn lock_keys(&self) -> Vec<String> {
        vg_lock_keys(&self.volume_group_name)
    }
}

apply_fields!(VgChangeOptions {
    VolumeGroupName => volume_group_name,
    Activate => activate,
    Tags => tags,
    DelTags => del_tags,
});
common_fields!(VgChangeOptions);
