//! Process exit codes

/// Successful termination
pub const OK: i32 = 0;

/// Any error reported by the application
pub const FAILURE: i32 = 1;
