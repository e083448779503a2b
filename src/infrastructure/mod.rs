//! Infrastructure layer: console streams and external process execution
//!
//! Implements the I/O boundary the domain and application layers use.

pub mod console;
pub mod traits;

pub use console::{CapturedOutput, Console, SharedOutput};
pub use traits::{CommandRunner, ExternalOutput, RealCommandRunner};
