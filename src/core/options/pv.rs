//! core::options::pv
//!
//! Options for the physical volume commands.

use super::common::validate_tag_lists;
use super::{
    render_report, Allocatable, CommonOptions, DelTags, Force, OptionSet, PhysicalVolumeNames,
    ResourceScope, Select, SetPhysicalVolumeSize, Tags, ValidationError,
};
use crate::core::args::Arguments;
use crate::core::types::LogicalVolumeName;

/// Report columns requested from `pvs`.
pub(crate) const PV_REPORT_FIELDS: &[&str] = &[
    "pv_name",
    "vg_name",
    "pv_uuid",
    "pv_attr",
    "pv_fmt",
    "pv_size",
    "pv_free",
    "pv_tags",
];

fn require_pvs(command: &'static str, pvs: &PhysicalVolumeNames) -> Result<(), ValidationError> {
    if pvs.is_empty() {
        return Err(ValidationError::MissingRequired {
            command,
            option: "PhysicalVolumeNames",
        });
    }
    Ok(())
}

fn pv_lock_keys(pvs: &PhysicalVolumeNames) -> Vec<String> {
    pvs.0.iter().map(|pv| pv.to_string()).collect()
}

/// Options for `pvs`. Without names every physical volume is reported.
#[derive(Debug, Clone, Default)]
pub struct PvsOptions {
    pub physical_volume_names: PhysicalVolumeNames,
    pub select: Option<Select>,
    pub common: CommonOptions,
}

impl OptionSet for PvsOptions {
    const COMMAND: &'static str = "pvs";

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        render_report(args, PV_REPORT_FIELDS);
        args.apply(&self.select)
            .apply(&self.physical_volume_names)
            .apply(&self.common);
    }
}

apply_fields!(PvsOptions {
    PhysicalVolumeNames => physical_volume_names,
    Select => select,
});
common_fields!(PvsOptions);

/// Options for `pvcreate`.
#[derive(Debug, Clone, Default)]
pub struct PvCreateOptions {
    pub physical_volume_names: PhysicalVolumeNames,
    pub force: Force,
    pub common: CommonOptions,
}

impl OptionSet for PvCreateOptions {
    const COMMAND: &'static str = "pvcreate";

    fn validate(&self) -> Result<(), ValidationError> {
        require_pvs(Self::COMMAND, &self.physical_volume_names)
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.physical_volume_names)
            .apply(&self.force)
            .apply(&self.common);
    }
}

impl ResourceScope for PvCreateOptions {
    fn lock_keys(&self) -> Vec<String> {
        pv_lock_keys(&self.physical_volume_names)
    }
}

apply_fields!(PvCreateOptions {
    PhysicalVolumeNames => physical_volume_names,
    Force => force,
});
common_fields!(PvCreateOptions);

/// Options for `pvremove`.
#[derive(Debug, Clone, Default)]
pub struct PvRemoveOptions {
    pub physical_volume_names: PhysicalVolumeNames,
    pub force: Force,
    pub common: CommonOptions,
}

impl OptionSet for PvRemoveOptions {
    const COMMAND: &'static str = "pvremove";

    fn validate(&self) -> Result<(), ValidationError> {
        require_pvs(Self::COMMAND, &self.physical_volume_names)
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.physical_volume_names)
            .apply(&self.force)
            .apply(&self.common);
    }
}

impl ResourceScope for PvRemoveOptions {
    fn lock_keys(&self) -> Vec<String> {
        pv_lock_keys(&self.physical_volume_names)
    }
}

apply_fields!(PvRemoveOptions {
    PhysicalVolumeNames => physical_volume_names,
    Force => force,
});
common_fields!(PvRemoveOptions);

/// Options for `pvresize`. Without a size the device size is used.
#[derive(Debug, Clone, Default)]
pub struct PvResizeOptions {
    pub physical_volume_names: PhysicalVolumeNames,
    pub set_physical_volume_size: Option<SetPhysicalVolumeSize>,
    pub common: CommonOptions,
}

impl OptionSet for PvResizeOptions {
    const COMMAND: &'static str = "pvresize";

    fn validate(&self) -> Result<(), ValidationError> {
        require_pvs(Self::COMMAND, &self.physical_volume_names)
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.set_physical_volume_size)
            .apply(&self.physical_volume_names)
            .apply(&self.common);
    }
}

impl ResourceScope for PvResizeOptions {
    fn lock_keys(&self) -> Vec<String> {
        pv_lock_keys(&self.physical_volume_names)
    }
}

apply_fields!(PvResizeOptions {
    PhysicalVolumeNames => physical_volume_names,
    SetPhysicalVolumeSize => set_physical_volume_size,
});
common_fields!(PvResizeOptions);

/// Options for `pvchange`. At least one change must be requested.
#[derive(Debug, Clone, Default)]
pub struct PvChangeOptions {
    pub physical_volume_names: PhysicalVolumeNames,
    pub allocatable: Option<Allocatable>,
    pub tags: Tags,
    pub del_tags: DelTags,
    pub common: CommonOptions,
}

impl OptionSet for PvChangeOptions {
    const COMMAND: &'static str = "pvchange";

    fn validate(&self) -> Result<(), ValidationError> {
        require_pvs(Self::COMMAND, &self.physical_volume_names)?;
        if self.allocatable.is_none() && self.tags.0.is_empty() && self.del_tags.0.is_empty() {
            return Err(ValidationError::AtLeastOne {
                command: Self::COMMAND,
                options: &["Allocatable", "Tags", "DelTags"],
            });
        }
        validate_tag_lists(&self.tags, &self.del_tags)
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.allocatable)
            .apply(&self.tags)
            .apply(&self.del_tags)
            .apply(&self.physical_volume_names)
            .apply(&self.common);
    }
}

impl ResourceScope for PvChangeOptions {
    fn lock_keys(&self) -> Vec<String> {
        pv_lock_keys(&self.physical_volume_names)
    }
}

apply_fields!(PvChangeOptions {
    PhysicalVolumeNames => physical_volume_names,
    Allocatable => allocatable,
    Tags => tags,
    DelTags => del_tags,
});
common_fields!(PvChangeOptions);

/// Options for `pvmove`.
///
/// The first physical volume is the source, any others are the
/// destinations LVM may allocate on. A [`LogicalVolumeName`] restricts
/// the move to that volume's extents.
#[derive(Debug, Clone, Default)]
pub struct PvMoveOptions {
    pub physical_volume_names: PhysicalVolumeNames,
    pub logical_volume_name: Option<LogicalVolumeName>,
    pub common: CommonOptions,
}

impl OptionSet for PvMoveOptions {
    const COMMAND: &'static str = "pvmove";

    fn validate(&self) -> Result<(), ValidationError> {
        require_pvs(Self::COMMAND, &self.physical_volume_names)?;
        let (source, destinations) = self
            .physical_volume_names
            .0
            .split_first()
            .ok_or_else(|| ValidationError::Invalid("pvmove needs a source".into()))?;
        if destinations.contains(source) {
            return Err(ValidationError::Invalid(format!(
                "{source} cannot be both source and destination"
            )));
        }
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        if let Some(lv) = &self.logical_volume_name {
            args.add_or_replace(format!("--name={lv}"));
        }
        args.apply(&self.physical_volume_names).apply(&self.common);
    }
}

impl ResourceScope for PvMoveOptions {
    fn lock_keys(&self) -> Vec<String> {
        pv_lock_keys(&self.physical_volume_names)
    }
}

apply_fields!(PvMoveOptions {
    PhysicalVolumeNames => physical_volume_names,
    LogicalVolumeName => logical_volume_name,
});
common_fields!(PvMoveOptions);
