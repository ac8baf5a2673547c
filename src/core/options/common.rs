//! core::options::common
//!
//! Option values shared across LVM commands.

use std::fmt;
use std::str::FromStr;

use super::ValidationError;
use crate::core::args::{Argument, Arguments};
use crate::core::types::{LogicalVolumeName, PhysicalVolumeName, VolumeGroupName};

/// Options every LVM command accepts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommonOptions {
    pub devices: Option<Devices>,
    pub devices_file: Option<DevicesFile>,
    pub profile: Option<Profile>,
    pub verbose: Verbose,
    pub request_confirm: RequestConfirm,
}

impl Argument for CommonOptions {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.apply(&self.devices)
            .apply(&self.devices_file)
            .apply(&self.profile)
            .apply(&self.verbose)
            .apply(&self.request_confirm);
    }
}

/// Skip the tool's interactive confirmations unless set to `true`.
///
/// The default (`false`) renders `--yes`, since a library caller has no
/// terminal to answer prompts on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RequestConfirm(pub bool);

impl Argument for RequestConfirm {
    fn apply_to_args(&self, args: &mut Arguments) {
        if !self.0 {
            args.add_or_replace("--yes");
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Verbose(pub bool);

impl Argument for Verbose {
    fn apply_to_args(&self, args: &mut Arguments) {
        if self.0 {
            args.add_or_replace("--verbose");
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Force(pub bool);

impl Argument for Force {
    fn apply_to_args(&self, args: &mut Arguments) {
        if self.0 {
            args.add_or_replace("--force");
        }
    }
}

/// Restrict the command to the listed devices (`--devices`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Devices(pub Vec<String>);

impl Argument for Devices {
    fn apply_to_args(&self, args: &mut Arguments) {
        if !self.0.is_empty() {
            args.add_or_replace(format!("--devices={}", self.0.join(",")));
        }
    }
}

/// Use a named devices file instead of the system one (`--devicesfile`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DevicesFile(pub String);

impl Argument for DevicesFile {
    fn apply_to_args(&self, args: &mut Arguments) {
        if !self.0.is_empty() {
            args.add_or_replace(format!("--devicesfile={}", self.0));
        }
    }
}

/// Command profile (`--profile`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Profile(pub String);

impl Argument for Profile {
    fn apply_to_args(&self, args: &mut Arguments) {
        if !self.0.is_empty() {
            args.add_or_replace(format!("--profile={}", self.0));
        }
    }
}

/// Report selection criteria (`--select`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select(pub String);

impl Argument for Select {
    fn apply_to_args(&self, args: &mut Arguments) {
        if !self.0.is_empty() {
            args.add_or_replace(format!("--select={}", self.0));
        }
    }
}

/// Tags to add (`--addtag`, once per tag).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(pub Vec<String>);

impl Tags {
    fn validate(&self) -> Result<(), ValidationError> {
        for tag in &self.0 {
            validate_tag(tag)?;
        }
        Ok(())
    }
}

impl Argument for Tags {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.remove_flag("--addtag");
        for tag in &self.0 {
            args.add(format!("--addtag={tag}"));
        }
    }
}

/// Tags to remove (`--deltag`, once per tag).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DelTags(pub Vec<String>);

impl Argument for DelTags {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.remove_flag("--deltag");
        for tag in &self.0 {
            args.add(format!("--deltag={tag}"));
        }
    }
}

impl From<Tags> for DelTags {
    fn from(tags: Tags) -> Self {
        DelTags(tags.0)
    }
}

/// LVM tags: `[A-Za-z0-9_+.-/=!:&#]`, at most 1024 characters, no leading `-`.
fn validate_tag(tag: &str) -> Result<(), ValidationError> {
    let valid_char =
        |c: char| c.is_ascii_alphanumeric() || "_+.-/=!:&#".contains(c);
    if tag.is_empty() || tag.len() > 1024 || tag.starts_with('-') || !tag.chars().all(valid_char)
    {
        return Err(ValidationError::Invalid(format!("invalid tag '{tag}'")));
    }
    Ok(())
}

pub(super) fn validate_tag_lists(tags: &Tags, del_tags: &DelTags) -> Result<(), ValidationError> {
    tags.validate()?;
    for tag in &del_tags.0 {
        validate_tag(tag)?;
    }
    Ok(())
}

/// Remove missing physical volumes from a volume group (`--removemissing`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemoveMissing(pub bool);

impl Argument for RemoveMissing {
    fn apply_to_args(&self, args: &mut Arguments) {
        if self.0 {
            args.add_or_replace("--removemissing");
        }
    }
}

/// Resize the filesystem along with the logical volume (`--resizefs`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResizeFs(pub bool);

impl Argument for ResizeFs {
    fn apply_to_args(&self, args: &mut Arguments) {
        if self.0 {
            args.add_or_replace("--resizefs");
        }
    }
}

/// Zero the start of a new logical volume (`--zero y|n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zero(pub bool);

impl Argument for Zero {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(if self.0 { "--zero=y" } else { "--zero=n" });
    }
}

/// Whether a physical volume may hold new extents (`--allocatable y|n`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Allocatable(pub bool);

impl Argument for Allocatable {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(if self.0 {
            "--allocatable=y"
        } else {
            "--allocatable=n"
        });
    }
}

/// Size to record for a physical volume instead of the device size
/// (`--setphysicalvolumesize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetPhysicalVolumeSize(pub Size);

impl Argument for SetPhysicalVolumeSize {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--setphysicalvolumesize={}", self.0));
    }
}

/// Activation state (`--activate`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activate {
    Yes,
    No,
    /// Activate only if allowed by `auto_activation_volume_list`.
    Auto,
    Exclusive,
    Local,
}

impl Activate {
    fn as_str(&self) -> &'static str {
        match self {
            Activate::Yes => "y",
            Activate::No => "n",
            Activate::Auto => "ay",
            Activate::Exclusive => "ey",
            Activate::Local => "ly",
        }
    }
}

impl Argument for Activate {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--activate={}", self.as_str()));
    }
}

/// Target name of a volume group rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewVolumeGroupName(pub VolumeGroupName);

/// Target name of a logical volume rename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogicalVolumeName(pub LogicalVolumeName);

/// Physical volumes a command operates on, rendered as positionals.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhysicalVolumeNames(pub Vec<PhysicalVolumeName>);

impl PhysicalVolumeNames {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Argument for PhysicalVolumeNames {
    fn apply_to_args(&self, args: &mut Arguments) {
        for pv in &self.0 {
            args.add_or_replace(pv.as_str());
        }
    }
}

impl From<PhysicalVolumeName> for PhysicalVolumeNames {
    fn from(pv: PhysicalVolumeName) -> Self {
        PhysicalVolumeNames(vec![pv])
    }
}

impl FromIterator<PhysicalVolumeName> for PhysicalVolumeNames {
    fn from_iter<I: IntoIterator<Item = PhysicalVolumeName>>(iter: I) -> Self {
        PhysicalVolumeNames(iter.into_iter().collect())
    }
}

impl Argument for VolumeGroupName {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(self.as_str());
    }
}

impl Argument for PhysicalVolumeName {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(self.as_str());
    }
}

/// A size in bytes.
///
/// Parsed from LVM-style strings: a number with an optional unit suffix
/// `b`, `s` (512-byte sectors), `k`, `m`, `g`, `t`, `p`, `e`. Units are
/// powers of 1024 regardless of case, which is how LVM reads size
/// arguments. A bare number is taken as mebibytes, like `lvcreate -L`.
///
/// ```
/// use lvmkit::core::options::Size;
///
/// assert_eq!("1G".parse::<Size>().unwrap().bytes(), 1 << 30);
/// assert_eq!("1.5k".parse::<Size>().unwrap().bytes(), 1536);
/// assert_eq!("8s".parse::<Size>().unwrap().bytes(), 4096);
/// assert!("ten".parse::<Size>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Size(u64);

impl Size {
    pub const fn from_bytes(bytes: u64) -> Self {
        Size(bytes)
    }

    /// # Errors
    ///
    /// Returns `ValidationError::Invalid` if the size does not fit in 64
    /// bits of bytes.
    pub fn from_mib(mib: u64) -> Result<Self, ValidationError> {
        mib.checked_mul(1 << 20)
            .map(Size)
            .ok_or_else(|| ValidationError::Invalid(format!("{mib} MiB overflows a byte count")))
    }

    pub const fn bytes(&self) -> u64 {
        self.0
    }

    fn unit_multiplier(unit: char) -> Option<u64> {
        match unit.to_ascii_lowercase() {
            'b' => Some(1),
            's' => Some(512),
            'k' => Some(1 << 10),
            'm' => Some(1 << 20),
            'g' => Some(1 << 30),
            't' => Some(1 << 40),
            'p' => Some(1 << 50),
            'e' => Some(1 << 60),
            _ => None,
        }
    }
}

impl FromStr for Size {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::Invalid(format!("invalid size '{s}'"));
        let s = s.trim();
        let (number, multiplier) = match s.chars().last() {
            Some(c) if c.is_ascii_alphabetic() => (
                &s[..s.len() - 1],
                Self::unit_multiplier(c).ok_or_else(invalid)?,
            ),
            Some(_) => (s, 1 << 20),
            None => return Err(invalid()),
        };
        if let Ok(whole) = number.parse::<u64>() {
            return whole.checked_mul(multiplier).map(Size).ok_or_else(invalid);
        }
        let value: f64 = number.parse().map_err(|_| invalid())?;
        if !value.is_finite() || value < 0.0 {
            return Err(invalid());
        }
        // u64::MAX as f64 rounds up to 2^64, which no u64 can hold.
        let bytes = (value * multiplier as f64).round();
        if bytes >= u64::MAX as f64 {
            return Err(invalid());
        }
        Ok(Size(bytes as u64))
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}b", self.0)
    }
}

impl Argument for Size {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--size={self}"));
    }
}

/// Physical extent size of a new volume group (`--physicalextentsize`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalExtentSize(pub Size);

impl PhysicalExtentSize {
    /// LVM requires a power of two of at least one sector.
    pub(super) fn validate(&self) -> Result<(), ValidationError> {
        let bytes = self.0.bytes();
        if bytes < 512 || !bytes.is_power_of_two() {
            return Err(ValidationError::Invalid(format!(
                "physical extent size must be a power of two of at least 512 bytes, got {bytes}"
            )));
        }
        Ok(())
    }
}

impl Argument for PhysicalExtentSize {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--physicalextentsize={}", self.0));
    }
}

/// What an extent percentage is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PercentOf {
    /// Total size of the volume group.
    Vg,
    /// Free space in the volume group.
    Free,
    /// Free space on the listed physical volumes.
    Pvs,
    /// Size of the snapshot origin.
    Origin,
}

impl PercentOf {
    fn as_str(&self) -> &'static str {
        match self {
            PercentOf::Vg => "VG",
            PercentOf::Free => "FREE",
            PercentOf::Pvs => "PVS",
            PercentOf::Origin => "ORIGIN",
        }
    }
}

/// A size in logical extents (`--extents`), either a count or a percentage.
///
/// ```
/// use lvmkit::core::options::{Extents, PercentOf};
///
/// let all_free: Extents = "100%FREE".parse().unwrap();
/// assert_eq!(all_free, Extents::percent(100, PercentOf::Free));
/// assert_eq!(all_free.to_string(), "100%FREE");
///
/// let grow: Extents = "+10".parse().unwrap();
/// assert_eq!(grow.to_string(), "+10");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extents {
    value: u64,
    percent_of: Option<PercentOf>,
    relative: bool,
}

impl Extents {
    pub const fn count(value: u64) -> Self {
        Extents {
            value,
            percent_of: None,
            relative: false,
        }
    }

    pub const fn percent(value: u64, of: PercentOf) -> Self {
        Extents {
            value,
            percent_of: Some(of),
            relative: false,
        }
    }

    /// Interpret the value as an increase over the current size.
    pub const fn relative(mut self) -> Self {
        self.relative = true;
        self
    }

    pub const fn is_relative(&self) -> bool {
        self.relative
    }

    pub(super) fn validate(&self) -> Result<(), ValidationError> {
        if self.value == 0 {
            return Err(ValidationError::Invalid("extents must be non-zero".into()));
        }
        match self.percent_of {
            Some(PercentOf::Origin) | None => Ok(()),
            Some(of) if self.value > 100 => Err(ValidationError::Invalid(format!(
                "extents cannot exceed 100%{}",
                of.as_str()
            ))),
            Some(_) => Ok(()),
        }
    }
}

impl FromStr for Extents {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::Invalid(format!("invalid extents '{s}'"));
        let (relative, rest) = match s.trim().strip_prefix('+') {
            Some(rest) => (true, rest),
            None => (false, s.trim()),
        };
        let (number, percent_of) = match rest.split_once('%') {
            Some((number, of)) => {
                let of = match of.to_ascii_uppercase().as_str() {
                    "VG" => PercentOf::Vg,
                    "FREE" => PercentOf::Free,
                    "PVS" => PercentOf::Pvs,
                    "ORIGIN" => PercentOf::Origin,
                    _ => return Err(invalid()),
                };
                (number, Some(of))
            }
            None => (rest, None),
        };
        let value = number.parse().map_err(|_| invalid())?;
        Ok(Extents {
            value,
            percent_of,
            relative,
        })
    }
}

impl fmt::Display for Extents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.relative {
            f.write_str("+")?;
        }
        write!(f, "{}", self.value)?;
        if let Some(of) = self.percent_of {
            write!(f, "%{}", of.as_str())?;
        }
        Ok(())
    }
}

impl Argument for Extents {
    fn apply_to_args(&self, args: &mut Arguments) {
        args.add_or_replace(format!("--extents={self}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(argument: &dyn Argument) -> Vec<String> {
        let mut args = Arguments::new();
        args.apply(argument);
        args.into_vec()
    }

    #[test]
    fn request_confirm_defaults_to_yes() {
        assert_eq!(render(&RequestConfirm::default()), ["--yes"]);
        assert!(render(&RequestConfirm(true)).is_empty());
    }

    #[test]
    fn boolean_flags_render_only_when_set() {
        assert!(render(&Force(false)).is_empty());
        assert_eq!(render(&Force(true)), ["--force"]);
        assert_eq!(render(&Verbose(true)), ["--verbose"]);
        assert_eq!(render(&RemoveMissing(true)), ["--removemissing"]);
    }

    #[test]
    fn common_options_render_in_fixed_order() {
        let common = CommonOptions {
            devices: Some(Devices(vec!["/dev/sdb".into(), "/dev/sdc".into()])),
            devices_file: Some(DevicesFile("test".into())),
            profile: None,
            verbose: Verbose(true),
            request_confirm: RequestConfirm(false),
        };
        assert_eq!(
            render(&common),
            [
                "--devices=/dev/sdb,/dev/sdc",
                "--devicesfile=test",
                "--verbose",
                "--yes"
            ]
        );
    }

    #[test]
    fn tags_replace_earlier_tag_lists() {
        let mut args = Arguments::new();
        args.apply(&Tags(vec!["old".into()]));
        args.apply(&Tags(vec!["a".into(), "b".into()]));
        assert_eq!(args.as_slice(), ["--addtag=a", "--addtag=b"]);
    }

    #[test]
    fn tag_validation() {
        assert!(validate_tag("backup:daily").is_ok());
        assert!(validate_tag("").is_err());
        assert!(validate_tag("-x").is_err());
        assert!(validate_tag("has space").is_err());
    }

    #[test]
    fn size_parsing() {
        assert_eq!("100".parse::<Size>().unwrap(), Size::from_mib(100).unwrap());
        assert_eq!("512b".parse::<Size>().unwrap().bytes(), 512);
        assert_eq!("2T".parse::<Size>().unwrap().bytes(), 2 << 40);
        assert!("".parse::<Size>().is_err());
        assert!("-1g".parse::<Size>().is_err());
        assert!("5x".parse::<Size>().is_err());
        assert_eq!(render(&Size::from_bytes(4096)), ["--size=4096b"]);
    }

    #[test]
    fn sizes_beyond_u64_are_rejected() {
        assert!("16e".parse::<Size>().is_err());
        assert!("16384p".parse::<Size>().is_err());
        assert!("17179869184g".parse::<Size>().is_err());
        assert!("15.99999999999999999e".parse::<Size>().is_err());
        assert_eq!("15e".parse::<Size>().unwrap().bytes(), 15 << 60);
        assert_eq!(
            "18446744073709551615b".parse::<Size>().unwrap().bytes(),
            u64::MAX
        );

        assert!(Size::from_mib(u64::MAX).is_err());
        assert!(Size::from_mib(1 << 44).is_err());
        assert_eq!(
            Size::from_mib((1 << 44) - 1).unwrap().bytes(),
            u64::MAX - ((1 << 20) - 1)
        );
    }

    #[test]
    fn physical_volume_flags() {
        assert_eq!(render(&Allocatable(false)), ["--allocatable=n"]);
        assert_eq!(
            render(&SetPhysicalVolumeSize(Size::from_bytes(1 << 30))),
            ["--setphysicalvolumesize=1073741824b"]
        );
    }

    #[test]
    fn physical_extent_size_validation() {
        assert!(PhysicalExtentSize(Size::from_mib(4).unwrap()).validate().is_ok());
        assert!(PhysicalExtentSize(Size::from_bytes(256)).validate().is_err());
        assert!(PhysicalExtentSize(Size::from_bytes(3000)).validate().is_err());
    }

    #[test]
    fn extents_parsing_and_validation() {
        assert_eq!("10".parse::<Extents>().unwrap(), Extents::count(10));
        assert_eq!(
            "+50%vg".parse::<Extents>().unwrap(),
            Extents::percent(50, PercentOf::Vg).relative()
        );
        assert!("10%BOGUS".parse::<Extents>().is_err());
        assert!(Extents::percent(150, PercentOf::Free).validate().is_err());
        assert!(Extents::percent(150, PercentOf::Origin).validate().is_ok());
        assert!(Extents::count(0).validate().is_err());
    }

    #[test]
    fn activate_renders_short_form() {
        assert_eq!(render(&Activate::Auto), ["--activate=ay"]);
        assert_eq!(render(&Activate::No), ["--activate=n"]);
    }
}
