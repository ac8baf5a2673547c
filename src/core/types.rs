//! core::types
//!
//! Strong types for LVM object names.
//!
//! # Types
//!
//! - [`VolumeGroupName`] - Validated volume group name
//! - [`LogicalVolumeName`] - Validated logical volume name
//! - [`PhysicalVolumeName`] - Physical volume (block device path)
//!
//! # Validation
//!
//! These types enforce validity at construction time, so a name that the
//! LVM tools would reject never makes it into an argument list.
//!
//! # Examples
//!
//! ```
//! use lvmkit::core::types::{LogicalVolumeName, PhysicalVolumeName, VolumeGroupName};
//!
//! let vg = VolumeGroupName::new("vg_data").unwrap();
//! let lv = LogicalVolumeName::new("scratch").unwrap();
//! let pv = PhysicalVolumeName::new("/dev/sdb").unwrap();
//! assert_eq!(lv.qualified(&vg), "vg_data/scratch");
//! assert_eq!(pv.as_str(), "/dev/sdb");
//!
//! assert!(VolumeGroupName::new("-vg").is_err());
//! assert!(LogicalVolumeName::new("snapshot0").is_err());
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from name validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid volume group name: {0}")]
    InvalidVolumeGroupName(String),

    #[error("invalid logical volume name: {0}")]
    InvalidLogicalVolumeName(String),

    #[error("invalid physical volume name: {0}")]
    InvalidPhysicalVolumeName(String),
}

/// Longest name the LVM tools accept for a VG or LV.
pub const MAX_NAME_LEN: usize = 127;

/// Prefixes LVM reserves for internal logical volumes.
const RESERVED_LV_PREFIXES: [&str; 2] = ["snapshot", "pvmove"];

/// Substrings LVM reserves for hidden sub-volumes.
const RESERVED_LV_SUBSTRINGS: [&str; 12] = [
    "_cdata", "_cmeta", "_corig", "_mlog", "_mimage", "_pmspare", "_rimage", "_rmeta", "_tdata",
    "_tmeta", "_vorigin", "_vdata",
];

/// Rules shared by volume group and logical volume names.
fn validate_object_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name cannot be empty".into());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("name cannot exceed {MAX_NAME_LEN} characters"));
    }
    if name == "." || name == ".." {
        return Err(format!("name cannot be '{name}'"));
    }
    if name.starts_with('-') {
        return Err("name cannot start with '-'".into());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '_' | '.' | '-')))
    {
        return Err(format!("name cannot contain '{}'", c.escape_default()));
    }
    Ok(())
}

macro_rules! name_conversions {
    ($ty:ident) => {
        impl TryFrom<String> for $ty {
            type Error = TypeError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl TryFrom<&str> for $ty {
            type Error = TypeError;

            fn try_from(s: &str) -> Result<Self, Self::Error> {
                Self::new(s)
            }
        }

        impl From<$ty> for String {
            fn from(name: $ty) -> Self {
                name.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

/// A validated volume group name.
///
/// Volume group names may only contain `[A-Za-z0-9+_.-]`, cannot start
/// with `-`, cannot be `.` or `..`, and are at most 127 characters long.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VolumeGroupName(String);

impl VolumeGroupName {
    /// Create a new validated volume group name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidVolumeGroupName` if the name violates LVM naming rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_object_name(&name).map_err(TypeError::InvalidVolumeGroupName)?;
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

name_conversions!(VolumeGroupName);

/// A validated logical volume name (without its volume group).
///
/// On top of the volume group rules, logical volume names cannot start
/// with `snapshot` or `pvmove` and cannot contain the suffixes LVM uses
/// for hidden sub-volumes (`_tdata`, `_rimage`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LogicalVolumeName(String);

impl LogicalVolumeName {
    /// Create a new validated logical volume name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidLogicalVolumeName` if the name violates LVM naming rules.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        validate_object_name(&name).map_err(TypeError::InvalidLogicalVolumeName)?;

        for prefix in RESERVED_LV_PREFIXES {
            if name.starts_with(prefix) {
                return Err(TypeError::InvalidLogicalVolumeName(format!(
                    "name cannot start with reserved prefix '{prefix}'"
                )));
            }
        }
        for reserved in RESERVED_LV_SUBSTRINGS {
            if name.contains(reserved) {
                return Err(TypeError::InvalidLogicalVolumeName(format!(
                    "name cannot contain reserved string '{reserved}'"
                )));
            }
        }

        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `vg/lv` form the LVM tools use to address a logical volume.
    pub fn qualified(&self, vg: &VolumeGroupName) -> String {
        format!("{}/{}", vg, self.0)
    }
}

name_conversions!(LogicalVolumeName);

/// A physical volume, addressed by its block device path.
///
/// Device paths are not restricted to the LVM name alphabet, but they
/// cannot be empty, start with `-`, or contain whitespace or control
/// characters. Reports may refer to missing devices as `[unknown]`,
/// which is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhysicalVolumeName(String);

impl PhysicalVolumeName {
    /// Create a new validated physical volume name.
    ///
    /// # Errors
    ///
    /// Returns `TypeError::InvalidPhysicalVolumeName` if the path is empty,
    /// starts with `-`, or contains whitespace or control characters.
    pub fn new(name: impl Into<String>) -> Result<Self, TypeError> {
        let name = name.into();
        if name.is_empty() {
            return Err(TypeError::InvalidPhysicalVolumeName(
                "device path cannot be empty".into(),
            ));
        }
        if name.starts_with('-') {
            return Err(TypeError::InvalidPhysicalVolumeName(
                "device path cannot start with '-'".into(),
            ));
        }
        if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(TypeError::InvalidPhysicalVolumeName(
                "device path cannot contain whitespace or control characters".into(),
            ));
        }
        Ok(Self(name))
    }

    /// Get the device path as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

name_conversions!(PhysicalVolumeName);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn volume_group_name_accepts_lvm_alphabet() {
        for name in ["vg0", "vg_data", "vg-data.1", "VG+x", "a"] {
            assert!(VolumeGroupName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn volume_group_name_rejects_invalid() {
        assert!(VolumeGroupName::new("").is_err());
        assert!(VolumeGroupName::new(".").is_err());
        assert!(VolumeGroupName::new("..").is_err());
        assert!(VolumeGroupName::new("-vg").is_err());
        assert!(VolumeGroupName::new("vg/0").is_err());
        assert!(VolumeGroupName::new("vg 0").is_err());
        assert!(VolumeGroupName::new("x".repeat(MAX_NAME_LEN + 1)).is_err());
        assert!(VolumeGroupName::new("x".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn logical_volume_name_rejects_reserved() {
        assert!(LogicalVolumeName::new("snapshot1").is_err());
        assert!(LogicalVolumeName::new("pvmove0").is_err());
        assert!(LogicalVolumeName::new("pool_tdata").is_err());
        assert!(LogicalVolumeName::new("data_rimage_0").is_err());
        assert!(LogicalVolumeName::new("my_snapshot").is_ok());
    }

    #[test]
    fn logical_volume_qualified_name() {
        let vg = VolumeGroupName::new("vg0").unwrap();
        let lv = LogicalVolumeName::new("lv0").unwrap();
        assert_eq!(lv.qualified(&vg), "vg0/lv0");
    }

    #[test]
    fn physical_volume_name_validation() {
        assert!(PhysicalVolumeName::new("/dev/sdb").is_ok());
        assert!(PhysicalVolumeName::new("/dev/disk/by-id/wwn-0x5000c500a1b2c3d4").is_ok());
        assert!(PhysicalVolumeName::new("[unknown]").is_ok());
        assert!(PhysicalVolumeName::new("").is_err());
        assert!(PhysicalVolumeName::new("--force").is_err());
        assert!(PhysicalVolumeName::new("/dev/sd b").is_err());
    }

    #[test]
    fn serde_rejects_invalid_names() {
        let ok: VolumeGroupName = serde_json::from_str("\"vg0\"").unwrap();
        assert_eq!(ok.as_str(), "vg0");
        assert!(serde_json::from_str::<VolumeGroupName>("\"-bad\"").is_err());
    }

    #[test]
    fn error_display_formatting() {
        let err = VolumeGroupName::new("").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid volume group name: name cannot be empty"
        );
        let err = LogicalVolumeName::new("a b").unwrap_err();
        assert!(err.to_string().contains("logical volume"));
        let err = PhysicalVolumeName::new("").unwrap_err();
        assert!(err.to_string().contains("physical volume"));
    }
}
