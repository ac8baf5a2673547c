//! core::options
//!
//! Typed options and their composition into argument lists.
//!
//! # Design
//!
//! Every LVM command has an options struct (an [`OptionSet`]) such as
//! [`VgCreateOptions`]. Callers never build those structs field by field;
//! they pass an [`OptionList`] of typed values (a [`VolumeGroupName`], a
//! [`Force`], a [`Size`], ...). Turning a list into arguments happens in
//! three steps:
//!
//! 1. **Aggregate** - each value is applied to a default options struct.
//!    Later values of the same kind overwrite earlier ones (last wins).
//! 2. **Validate** - cross-field invariants are checked (required fields,
//!    mutually exclusive fields, at-least-one-of).
//! 3. **Render** - the struct renders its fields into [`Arguments`] in a
//!    fixed order.
//!
//! A validation failure stops before rendering, so no partial argument
//! list ever reaches the command builder.
//!
//! # Example
//!
//! ```
//! use lvmkit::core::options::{Force, OptionList, VgRemoveOptions};
//! use lvmkit::core::types::VolumeGroupName;
//!
//! let list = OptionList::<VgRemoveOptions>::new()
//!     .with(VolumeGroupName::new("vg0").unwrap())
//!     .with(Force(true));
//! let args = list.as_args().unwrap();
//! assert_eq!(args.as_slice(), ["vg0", "--force", "--yes"]);
//! ```
//!
//! # Default volume group
//!
//! Commands that address a single existing volume group may leave it out
//! when the execution context carries a default. Clients aggregate with
//! [`OptionList::aggregate_scoped`], which fills the missing name before
//! validation, so the rendered arguments, error resources and lock keys
//! all name the group the command really touches.

use std::sync::Arc;

use thiserror::Error;

use crate::core::args::Arguments;
use crate::core::types::VolumeGroupName;

/// Implements [`ApplyOption`] for each listed value type, assigning it to
/// the named field of the options struct.
macro_rules! apply_fields {
    ($set:ty { $($ty:ty => $($field:ident).+),* $(,)? }) => {
        $(
            impl $crate::core::options::ApplyOption<$set> for $ty {
                fn apply(&self, opts: &mut $set) {
                    opts.$($field).+ = ::std::convert::From::from(self.clone());
                }
            }
        )*
    };
}

/// Implements [`ApplyOption`] for the common option values, routing them
/// into the struct's `common` field.
macro_rules! common_fields {
    ($set:ty) => {
        apply_fields!($set {
            $crate::core::options::CommonOptions => common,
            $crate::core::options::Devices => common.devices,
            $crate::core::options::DevicesFile => common.devices_file,
            $crate::core::options::Profile => common.profile,
            $crate::core::options::Verbose => common.verbose,
            $crate::core::options::RequestConfirm => common.request_confirm,
        });
    };
}

mod common;
mod devices;
mod lv;
mod meta;
mod pv;
mod vg;

pub use common::{
    Activate, Allocatable, CommonOptions, DelTags, Devices, DevicesFile, Extents, Force,
    NewLogicalVolumeName, NewVolumeGroupName, PercentOf, PhysicalExtentSize, PhysicalVolumeNames,
    Profile, RemoveMissing, RequestConfirm, ResizeFs, Select, SetPhysicalVolumeSize, Size, Tags,
    Verbose, Zero,
};
pub use devices::{
    AddDevice, AddPvid, DelDevice, DelPvid, DevCheckOptions, DevListOptions, DevModifyOptions,
    DevUpdateOptions, SYSTEM_DEVICES_FILE,
};
pub use lv::{
    LvChangeOptions, LvCreateOptions, LvExtendOptions, LvReduceOptions, LvRemoveOptions,
    LvRenameOptions, LvResizeOptions, LvsOptions,
};
pub use meta::VersionOptions;
pub use pv::{
    PvChangeOptions, PvCreateOptions, PvMoveOptions, PvRemoveOptions, PvResizeOptions, PvsOptions,
};
pub use vg::{
    VgChangeOptions, VgCreateOptions, VgExtendOptions, VgReduceOptions, VgRemoveOptions,
    VgRenameOptions, VgsOptions,
};

/// Errors from option validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required option was not supplied.
    #[error("{option} is required for {command}")]
    MissingRequired {
        command: &'static str,
        option: &'static str,
    },

    /// Two options that cannot be combined were both supplied.
    #[error("{first} and {second} cannot be combined for {command}")]
    Conflict {
        command: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// None of a group of options was supplied, but at least one must be.
    #[error("at least one of {} is required for {command}", .options.join(", "))]
    AtLeastOne {
        command: &'static str,
        options: &'static [&'static str],
    },

    /// An option value is malformed or out of range.
    #[error("invalid option value: {0}")]
    Invalid(String),
}

/// An options struct for a single LVM command.
pub trait OptionSet: Default + Clone + Send + Sync + 'static {
    /// The LVM subcommand these options configure (e.g. `vgcreate`).
    const COMMAND: &'static str;

    /// Check cross-field invariants.
    fn validate(&self) -> Result<(), ValidationError>;

    /// Render the fields into `args` in the command's fixed order.
    fn render(&self, args: &mut Arguments);

    /// Use `vg` if these options need a volume group and none was given.
    fn assume_volume_group(&mut self, _vg: &VolumeGroupName) {}
}

/// A value that can be folded into the options struct `S`.
pub trait ApplyOption<S>: Send + Sync {
    /// Write this value into `opts`, replacing any earlier value of its kind.
    fn apply(&self, opts: &mut S);
}

/// A complete options struct replaces whatever was aggregated before it.
impl<S: OptionSet> ApplyOption<S> for S {
    fn apply(&self, opts: &mut S) {
        *opts = self.clone();
    }
}

/// Names of the resources a mutating command operates on.
///
/// The locking client serializes commands that share a key.
pub trait ResourceScope {
    /// Lock keys for this command. Empty when the target is unknown.
    fn lock_keys(&self) -> Vec<String>;
}

/// An ordered list of options for the command configured by `S`.
pub struct OptionList<S> {
    options: Vec<Arc<dyn ApplyOption<S>>>,
}

impl<S: OptionSet> OptionList<S> {
    /// Create an empty option list.
    pub fn new() -> Self {
        Self {
            options: Vec::new(),
        }
    }

    /// Append an option, builder style.
    pub fn with(mut self, option: impl ApplyOption<S> + 'static) -> Self {
        self.push(option);
        self
    }

    /// Append an option.
    pub fn push(&mut self, option: impl ApplyOption<S> + 'static) {
        self.options.push(Arc::new(option));
    }

    /// Append every option of another list, keeping their order.
    pub fn extend(&mut self, other: &OptionList<S>) {
        self.options.extend(other.options.iter().cloned());
    }

    pub fn len(&self) -> usize {
        self.options.len()
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    /// Fold every option into a single options struct, last one winning.
    pub fn aggregate(&self) -> S {
        let mut opts = S::default();
        for option in &self.options {
            option.apply(&mut opts);
        }
        opts
    }

    /// Aggregate, then fill a missing volume group from `default_vg`.
    pub fn aggregate_scoped(&self, default_vg: Option<&VolumeGroupName>) -> S {
        let mut opts = self.aggregate();
        if let Some(vg) = default_vg {
            opts.assume_volume_group(vg);
        }
        opts
    }

    /// Aggregate, validate, and render into a fresh argument list.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] of the aggregated struct. No
    /// arguments are produced in that case.
    pub fn as_args(&self) -> Result<Arguments, ValidationError> {
        self.as_args_scoped(None)
    }

    /// Like [`as_args`](Self::as_args), with `default_vg` standing in for
    /// a volume group the list leaves out.
    pub fn as_args_scoped(
        &self,
        default_vg: Option<&VolumeGroupName>,
    ) -> Result<Arguments, ValidationError> {
        let opts = self.aggregate_scoped(default_vg);
        opts.validate()?;
        let mut args = Arguments::new();
        opts.render(&mut args);
        Ok(args)
    }
}

impl<S: OptionSet> Default for OptionList<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> Clone for OptionList<S> {
    fn clone(&self) -> Self {
        Self {
            options: self.options.clone(),
        }
    }
}

impl<S> std::fmt::Debug for OptionList<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptionList")
            .field("command", &std::any::type_name::<S>())
            .field("len", &self.options.len())
            .finish()
    }
}

impl<S: OptionSet> From<S> for OptionList<S> {
    fn from(opts: S) -> Self {
        Self::new().with(opts)
    }
}

/// Columns and formatting flags shared by the JSON report commands.
pub(crate) fn render_report(args: &mut Arguments, fields: &[&str]) {
    args.add_or_replace("--reportformat=json");
    args.add_or_replace("--units=b");
    args.add_or_replace("--nosuffix");
    args.add_or_replace(format!("--options={}", fields.join(",")));
}
