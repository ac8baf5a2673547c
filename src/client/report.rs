//! client::report
//!
//! Models for LVM report output.
//!
//! # Format
//!
//! Report commands are run with `--reportformat=json --units=b --nosuffix`,
//! which produces:
//!
//! ```json
//! {"report": [{"vg": [{"vg_name": "vg0", "vg_size": "1073741824", ...}]}]}
//! ```
//!
//! Every value is a string. Sizes are byte counts, tags are comma
//! separated, and missing values are empty strings.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use super::errors::ClientError;
use crate::core::types::{LogicalVolumeName, PhysicalVolumeName, VolumeGroupName};

/// A volume group as reported by `vgs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VolumeGroup {
    #[serde(rename = "vg_name")]
    pub name: VolumeGroupName,
    #[serde(rename = "vg_uuid", default)]
    pub uuid: String,
    #[serde(rename = "vg_attr", default)]
    pub attr: String,
    #[serde(rename = "vg_size", deserialize_with = "number", default)]
    pub size: u64,
    #[serde(rename = "vg_free", deserialize_with = "number", default)]
    pub free: u64,
    #[serde(rename = "vg_extent_size", deserialize_with = "number", default)]
    pub extent_size: u64,
    #[serde(rename = "vg_extent_count", deserialize_with = "number", default)]
    pub extent_count: u64,
    #[serde(rename = "vg_free_count", deserialize_with = "number", default)]
    pub free_count: u64,
    #[serde(deserialize_with = "number", default)]
    pub pv_count: u64,
    #[serde(deserialize_with = "number", default)]
    pub lv_count: u64,
    #[serde(rename = "vg_tags", deserialize_with = "tags", default)]
    pub tags: Vec<String>,
}

/// A logical volume as reported by `lvs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogicalVolume {
    #[serde(rename = "lv_name")]
    pub name: LogicalVolumeName,
    #[serde(rename = "vg_name")]
    pub volume_group_name: VolumeGroupName,
    #[serde(rename = "lv_uuid", default)]
    pub uuid: String,
    #[serde(rename = "lv_attr", default)]
    pub attr: String,
    #[serde(rename = "lv_size", deserialize_with = "number", default)]
    pub size: u64,
    #[serde(rename = "lv_path", default)]
    pub path: String,
    #[serde(rename = "lv_active", deserialize_with = "active", default)]
    pub active: bool,
    #[serde(rename = "lv_tags", deserialize_with = "tags", default)]
    pub tags: Vec<String>,
}

impl LogicalVolume {
    /// `vg/lv` form accepted by the LV commands.
    pub fn qualified_name(&self) -> String {
        self.name.qualified(&self.volume_group_name)
    }
}

/// A physical volume as reported by `pvs`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PhysicalVolume {
    #[serde(rename = "pv_name")]
    pub name: PhysicalVolumeName,
    /// `None` for a physical volume outside any volume group.
    #[serde(rename = "vg_name", deserialize_with = "optional_vg", default)]
    pub volume_group_name: Option<VolumeGroupName>,
    #[serde(rename = "pv_uuid", default)]
    pub uuid: String,
    #[serde(rename = "pv_attr", default)]
    pub attr: String,
    #[serde(rename = "pv_fmt", default)]
    pub format: String,
    #[serde(rename = "pv_size", deserialize_with = "number", default)]
    pub size: u64,
    #[serde(rename = "pv_free", deserialize_with = "number", default)]
    pub free: u64,
    #[serde(rename = "pv_tags", deserialize_with = "tags", default)]
    pub tags: Vec<String>,
}

/// Versions reported by `lvm version`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub lvm: String,
    pub library: String,
    pub driver: String,
}

impl Version {
    /// Parse `lvm version` text output.
    ///
    /// ```text
    ///   LVM version:     2.03.16(2) (2022-05-18)
    ///   Library version: 1.02.185 (2022-05-18)
    ///   Driver version:  4.47.0
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Report` if the LVM version line is missing.
    pub fn parse(output: &str) -> Result<Self, ClientError> {
        let mut version = Version::default();
        for line in output.lines() {
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().to_string();
            match key.trim() {
                "LVM version" => version.lvm = value,
                "Library version" => version.library = value,
                "Driver version" => version.driver = value,
                _ => {}
            }
        }
        if version.lvm.is_empty() {
            return Err(ClientError::Report(
                "missing 'LVM version' in version output".to_string(),
            ));
        }
        Ok(version)
    }
}

/// How a devices file entry identifies its device.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceIdType {
    SysWwid,
    SysSerial,
    MpathUuid,
    CryptUuid,
    MdUuid,
    LvmlvUuid,
    LoopFile,
    Devname,
    Other(String),
}

impl DeviceIdType {
    fn parse(value: &str) -> Self {
        match value {
            "sys_wwid" => DeviceIdType::SysWwid,
            "sys_serial" => DeviceIdType::SysSerial,
            "mpath_uuid" => DeviceIdType::MpathUuid,
            "crypt_uuid" => DeviceIdType::CryptUuid,
            "md_uuid" => DeviceIdType::MdUuid,
            "lvmlv_uuid" => DeviceIdType::LvmlvUuid,
            "loop_file" => DeviceIdType::LoopFile,
            "devname" => DeviceIdType::Devname,
            other => DeviceIdType::Other(other.to_string()),
        }
    }
}

/// One entry of a devices file, as listed by `lvmdevices`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceListEntry {
    pub id_type: DeviceIdType,
    /// The identifier itself, e.g. the backing file of a loop device.
    pub id_name: String,
    /// Device path the entry last resolved to.
    pub dev_name: String,
    /// PVID on the device, or `none`.
    pub pvid: String,
    /// Partition number, when the entry names a partition.
    pub part: Option<u32>,
}

/// Parse the text output of `lvmdevices`.
///
/// ```text
///   Device /dev/loop0 IDTYPE=loop_file IDNAME=/tmp/disk.img DEVNAME=/dev/loop0 PVID=none
/// ```
///
/// Lines without an `IDTYPE` field are skipped.
///
/// # Errors
///
/// Returns `ClientError::Report` if a `PART` field is not a number.
pub fn parse_device_list(output: &str) -> Result<Vec<DeviceListEntry>, ClientError> {
    let mut entries = Vec::new();
    for line in output.lines() {
        let fields: Vec<(&str, &str)> = line
            .split_whitespace()
            .filter_map(|token| token.split_once('='))
            .collect();
        let field = |key: &str| {
            fields
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        };
        let Some(id_type) = field("IDTYPE") else {
            continue;
        };
        let part = field("PART")
            .map(|part| {
                part.parse()
                    .map_err(|_| ClientError::Report(format!("invalid PART '{part}'")))
            })
            .transpose()?;
        entries.push(DeviceListEntry {
            id_type: DeviceIdType::parse(&id_type),
            id_name: field("IDNAME").unwrap_or_default(),
            dev_name: field("DEVNAME").unwrap_or_default(),
            pvid: field("PVID").unwrap_or_default(),
            part,
        });
    }
    Ok(entries)
}

#[derive(Deserialize)]
struct Report {
    report: Vec<Section>,
}

#[derive(Deserialize)]
struct Section {
    #[serde(default)]
    vg: Vec<VolumeGroup>,
    #[serde(default)]
    lv: Vec<LogicalVolume>,
    #[serde(default)]
    pv: Vec<PhysicalVolume>,
}

fn parse_report(output: &str) -> Result<Vec<Section>, ClientError> {
    let report: Report =
        serde_json::from_str(output).map_err(|e| ClientError::Report(e.to_string()))?;
    Ok(report.report)
}

/// Parse the JSON output of `vgs`.
pub fn parse_volume_groups(output: &str) -> Result<Vec<VolumeGroup>, ClientError> {
    Ok(parse_report(output)?
        .into_iter()
        .flat_map(|section| section.vg)
        .collect())
}

/// Parse the JSON output of `lvs`.
pub fn parse_logical_volumes(output: &str) -> Result<Vec<LogicalVolume>, ClientError> {
    Ok(parse_report(output)?
        .into_iter()
        .flat_map(|section| section.lv)
        .collect())
}

/// Parse the JSON output of `pvs`.
pub fn parse_physical_volumes(output: &str) -> Result<Vec<PhysicalVolume>, ClientError> {
    Ok(parse_report(output)?
        .into_iter()
        .flat_map(|section| section.pv)
        .collect())
}

fn number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    raw.parse()
        .map_err(|_| de::Error::custom(format!("invalid number '{raw}'")))
}

fn tags<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect())
}

fn active<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(raw.trim() == "active")
}

fn optional_vg<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<VolumeGroupName>, D::Error> {
    let raw = String::deserialize(deserializer)?;
    if raw.is_empty() {
        return Ok(None);
    }
    VolumeGroupName::new(raw).map(Some).map_err(de::Error::custom)
}
