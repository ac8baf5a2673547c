//! core
//!
//! Core domain types, argument model, options, and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: VolumeGroupName, LogicalVolumeName, PhysicalVolumeName
//! - [`args`] - Argument list with flag-aware add-or-replace
//! - [`options`] - Typed options and their aggregation into arguments
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Names are validated at construction, never at command time
//! - Option aggregation is last-wins and validated before rendering
//! - Rendering order is fixed per command

pub mod args;
pub mod config;
pub mod options;
pub mod types;
