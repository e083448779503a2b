//! Micro-framework for command line applications.
//!
//! Declare commands, flags and options on an [`Application`]; it dispatches
//! the argument vector, activates what was given and runs the selected
//! command.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;

pub use application::{AppError, AppResult, Application, RunOutcome};
pub use config::AppConfig;
pub use domain::{
    Arity, Command, DispatchError, DispatchResult, ExecContext, HandlerResult, ParamType,
    Parameter, Value,
};
