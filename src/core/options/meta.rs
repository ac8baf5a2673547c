//! core::options::meta
//!
//! Options for commands that do not touch volumes.

use super::{CommonOptions, OptionSet, ValidationError};
use crate::core::args::Arguments;

/// Options for `lvm version`.
#[derive(Debug, Clone, Default)]
pub struct VersionOptions {
    pub common: CommonOptions,
}

impl OptionSet for VersionOptions {
    const COMMAND: &'static str = "version";

    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn render(&self, args: &mut Arguments) {
        args.apply(&self.common);
    }
}

common_fields!(VersionOptions);
