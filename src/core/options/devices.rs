//! core::options::devices
//!
//! Options for `lvmdevices`, which edits and inspects a devices file.
//!
//! Every variant runs the same LVM command; the flag picks the action.
//! The file is chosen with [`DevicesFile`], falling back to the system
//! devices file. Commands that rewrite a file lock on its name.

use super::{CommonOptions, DevicesFile, OptionSet, ResourceScope, ValidationError};
use crate::core::args::{Argument, Arguments};
use crate::core::types::PhysicalVolumeName;

/// Name LVM uses for the devices file when none is given.
pub const SYSTEM_DEVICES_FILE: &str = "system.devices";

const COMMAND: &str = "lvmdevices";

fn devices_lock_keys(common: &CommonOptions) -> Vec<String> {
    let file = common
        .devices_file
        .as_ref()
        .map(|DevicesFile(name)| name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or(SYSTEM_DEVICES_FILE);
    vec![format!("devices:{file}")]
}

/// Add a device to the devices file (`--adddev`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddDevice(pub PhysicalVolumeName);

/// Remove a device from the devices file (`--deldev`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelDevice(pub PhysicalVolumeName);

/// Add the device carrying a PVID to the devices file (`--addpvid`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddPvid(pub String);

/// Remove the entry with a PVID from the devices file (`--delpvid`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelPvid(pub String);

impl Argument for AddDevice {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--adddev={}", self.0));
    }
}

impl Argument for DelDevice {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--deldev={}", self.0));
    }
}

impl Argument for AddPvid {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--addpvid={}", self.0));
    }
}

impl Argument for DelPvid {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--delpvid={}", self.0));
    }
}

fn validate_pvid(pvid: &str) -> Result<(), ValidationError> {
    if pvid.is_empty() || pvid.chars().any(|c| !c.is_ascii_alphanumeric()) {
        return Err(ValidationError::Invalid(format!("invalid PVID '{pvid}'")));
    }
    Ok(())
}

/// Options for listing a devices file (`lvmdevices` with no action).
#[derive(Debug, Clone, Default)]
pub struct DevListOptions {
    pub common: CommonOptions,
}

impl OptionSet for DevListOptions {
    const COMMAND: &'static str = COMMAND;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.common);
    }
}

common_fields!(DevListOptions);

/// Options for `lvmdevices --check`, which reports stale entries without
/// changing the file.
#[derive(Debug, Clone, Default)]
pub struct DevCheckOptions {
    pub common: CommonOptions,
}

impl OptionSet for DevCheckOptions {
    const COMMAND: &'static str = COMMAND;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        args.add_or_replace("--check");
        args.apply(&self.common);
    }
}

common_fields!(DevCheckOptions);

/// Options for `lvmdevices --update`, which rewrites stale entries.
#[derive(Debug, Clone, Default)]
pub struct DevUpdateOptions {
    pub common: CommonOptions,
}

impl OptionSet for DevUpdateOptions {
    const COMMAND: &'static str = COMMAND;

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        args.add_or_replace("--update");
        args.apply(&self.common);
    }
}

impl ResourceScope for DevUpdateOptions {
    fn lock_keys(&self) -> Vec<String> {
        devices_lock_keys(&self.common)
    }
}

common_fields!(DevUpdateOptions);

/// Options for adding or removing one devices file entry. Exactly one of
/// [`AddDevice`], [`DelDevice`], [`AddPvid`] or [`DelPvid`] is required.
#[derive(Debug, Clone, Default)]
pub struct DevModifyOptions {
    pub add_device: Option<AddDevice>,
    pub del_device: Option<DelDevice>,
    pub add_pvid: Option<AddPvid>,
    pub del_pvid: Option<DelPvid>,
    pub common: CommonOptions,
}

impl DevModifyOptions {
    fn changes(&self) -> Vec<&'static str> {
        [
            ("AddDevice", self.add_device.is_some()),
            ("DelDevice", self.del_device.is_some()),
            ("AddPvid", self.add_pvid.is_some()),
            ("DelPvid", self.del_pvid.is_some()),
        ]
        .into_iter()
        .filter_map(|(name, set)| set.then_some(name))
        .collect()
    }
}

impl OptionSet for DevModifyOptions {
    const COMMAND: &'static str = COMMAND;

    fn validate(&self) -> Result<(), ValidationError> {
        match self.changes()[..] {
            [] => {
                return Err(ValidationError::AtLeastOne {
                    command: Self::COMMAND,
                    options: &["AddDevice", "DelDevice", "AddPvid", "DelPvid"],
                })
            }
            [_] => {}
            [first, second, ..] => {
                return Err(ValidationError::Conflict {
                    command: Self::COMMAND,
                    first,
                    second,
                })
            }
        }
        if let Some(AddPvid(pvid)) = &self.add_pvid {
            validate_pvid(pvid)?;
        }
        if let Some(DelPvid(pvid)) = &self.del_pvid {
            validate_pvid(pvid)?;
        }
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.add_device)
            .apply(&self.del_device)
            .apply(&self.add_pvid)
            .apply(&self.del_pvid)
            .apply(&self.common);
    }
}

impl ResourceScope for DevModifyOptions {
    fn lock_keys(&self) -> Vec<String> {
        devices_lock_keys(&self.common)
    }
}

apply_fields!(DevModifyOptions {
    AddDevice => add_device,
    DelDevice => del_device,
    AddPvid => add_pvid,
    DelPvid => del_pvid,
});
common_fields!(DevModifyOptions);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::OptionList;

    fn dev(path: &str) -> PhysicalVolumeName {
        PhysicalVolumeName::new(path).unwrap()
    }

    #[test]
    fn add_device_to_named_file() {
        let list = OptionList::<DevModifyOptions>::new()
            .with(AddDevice(dev("/dev/loop0")))
            .with(DevicesFile("test".into()));
        assert_eq!(
            list.as_args().unwrap().as_slice(),
            ["--adddev=/dev/loop0", "--devicesfile=test", "--yes"]
        );
        assert_eq!(list.aggregate().lock_keys(), ["devices:test"]);
    }

    #[test]
    fn modify_needs_exactly_one_change() {
        let err = OptionList::<DevModifyOptions>::new().as_args().unwrap_err();
        assert!(matches!(err, ValidationError::AtLeastOne { .. }));

        let err = OptionList::<DevModifyOptions>::new()
            .with(AddDevice(dev("/dev/loop0")))
            .with(DelDevice(dev("/dev/loop1")))
            .as_args()
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::Conflict {
                command: "lvmdevices",
                first: "AddDevice",
                second: "DelDevice",
            }
        );
    }

    #[test]
    fn pvids_are_alphanumeric() {
        let err = OptionList::<DevModifyOptions>::new()
            .with(DelPvid("abc def".into()))
            .as_args()
            .unwrap_err();
        assert!(matches!(err, ValidationError::Invalid(_)));

        let args = OptionList::<DevModifyOptions>::new()
            .with(DelPvid("Yq4cGm3AbC".into()))
            .as_args()
            .unwrap();
        assert_eq!(args.as_slice(), ["--delpvid=Yq4cGm3AbC", "--yes"]);
    }

    #[test]
    fn check_and_update_flags() {
        let check = OptionList::<DevCheckOptions>::new().as_args().unwrap();
        assert_eq!(check.as_slice(), ["--check", "--yes"]);

        let update = OptionList::<DevUpdateOptions>::new();
        assert_eq!(update.as_args().unwrap().as_slice(), ["--update", "--yes"]);
        assert_eq!(
            update.aggregate().lock_keys(),
            [format!("devices:{SYSTEM_DEVICES_FILE}")]
        );
    }
}
