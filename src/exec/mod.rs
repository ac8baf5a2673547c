//! exec
//!
//! Everything between a rendered argument list and a finished process.
//!
//! # Modules
//!
//! - [`context`] - Immutable per-call execution context
//! - [`detect`] - Compute-once container detection
//! - [`command`] - Command construction, including nsenter wrapping
//! - [`runner`] - Process execution with cancellation and wait delay
//!
//! # Example
//!
//! ```no_run
//! use lvmkit::exec::{build_command, run, ExecContext};
//!
//! # async fn example() -> Result<(), lvmkit::exec::ExecError> {
//! let ctx = ExecContext::new().with_force_no_nsenter(true);
//! let spec = build_command(&ctx, "lvm", ["version"]);
//! let output = run(&spec).await?;
//! println!("{}", output.stdout);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod context;
pub mod detect;
pub mod runner;

pub use command::{build_command, CommandBuilder, CommandSpec};
pub use context::{
    default_wait_delay, set_default_wait_delay, set_use_standard_locale, use_standard_locale,
    ExecContext,
};
pub use detect::{is_containerized, will_use_nsenter};
pub use runner::{run, ExecError, Output};
