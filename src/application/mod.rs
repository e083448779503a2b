//! Application layer: dispatcher, execution driver and built-in help
//!
//! Orchestrates the domain units and applies the configured error policy.

pub mod dispatcher;
pub mod driver;
pub mod error;
pub mod help;

pub use dispatcher::{DispatchPlan, Dispatcher};
pub use driver::{Application, DriverState, RunOutcome, DEBUG_FLAG, VERBOSE_FLAG};
pub use error::{write_report, AppError, AppResult};
pub use help::HELP_COMMAND;
