//! lvmkit - LVM command execution for Rust
//!
//! lvmkit runs LVM2 commands (`vgcreate`, `lvs`, `pvremove`, ...) through
//! typed option lists, from the host or from inside a container.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`core`] - Name types, argument lists, typed options, configuration
//! - [`exec`] - Execution context, container detection, command building, process running
//! - [`client`] - The `Client` contract, the `lvm`-backed client, and decorators
//!
//! # Correctness Invariants
//!
//! 1. Invalid option lists never start a process
//! 2. Execution contexts are immutable; derived contexts never affect their parent
//! 3. Container detection runs at most once per process
//! 4. Two mutating operations on the same volume group never overlap when
//!    issued through a [`client::LockingClient`]
//!
//! # Example
//!
//! ```no_run
//! use lvmkit::client::{Client, LockingClient, LvmClient};
//! use lvmkit::core::options::{LvCreateOptions, OptionList, Size};
//! use lvmkit::core::types::{LogicalVolumeName, VolumeGroupName};
//! use lvmkit::exec::ExecContext;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = LockingClient::new(LvmClient::new());
//! let opts = OptionList::<LvCreateOptions>::new()
//!     .with(VolumeGroupName::new("vg0")?)
//!     .with(LogicalVolumeName::new("data")?)
//!     .with(Size::from_mib(512)?);
//! client.lv_create(&ExecContext::new(), opts).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod core;
pub mod exec;

pub use client::{Client, ClientError, LvmClient};
pub use exec::ExecContext;
