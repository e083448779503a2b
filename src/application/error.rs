//! Application-level errors (wraps dispatch errors) and the error report

use std::backtrace::Backtrace;
use std::error::Error as _;
use std::io::{self, Write};

use thiserror::Error;

use crate::domain::DispatchError;

/// Application errors wrap dispatch errors and add configuration and I/O
/// concerns. This is what `run` hands back to embedding callers.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Dispatch(#[from] DispatchError),

    #[error("config error: {message}")]
    Config { message: String },

    #[error("I/O error: {context}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl AppError {
    /// Create an I/O error with context.
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// The dispatch error, if that is what failed.
    pub fn dispatch(&self) -> Option<&DispatchError> {
        match self {
            AppError::Dispatch(e) => Some(e),
            _ => None,
        }
    }

    /// Get the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        crate::exitcode::FAILURE
    }
}

/// Result type for application operations.
pub type AppResult<T> = Result<T, AppError>;

/// Write the user-facing error report.
///
/// ```text
/// Error:
///     <message>
/// ```
///
/// With `debug`, the source chain and a backtrace follow.
pub fn write_report(out: &mut impl Write, err: &AppError, debug: bool) -> io::Result<()> {
    writeln!(out, "Error:")?;
    writeln!(out, "    {err}")?;
    if debug {
        let mut source = err.source();
        // Dispatch wraps transparently; skip the duplicate line
        if let AppError::Dispatch(inner) = err {
            source = inner.source();
        }
        while let Some(cause) = source {
            writeln!(out, "    caused by: {cause}")?;
            source = cause.source();
        }
        writeln!(out)?;
        writeln!(out, "{}", Backtrace::force_capture())?;
    }
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_dispatch_error_when_reporting_then_writes_indented_message() {
        let err = AppError::from(DispatchError::UnknownOption("--nope".into()));
        let mut out = Vec::new();

        write_report(&mut out, &err, false).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Error:\n    unknown option: --nope\n"
        );
    }

    #[test]
    fn given_debug_when_reporting_then_includes_cause_chain() {
        let err = AppError::from(DispatchError::Action {
            unit: "deploy".into(),
            source: "network down".into(),
        });
        let mut out = Vec::new();

        write_report(&mut out, &err, true).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("Error:\n    deploy: network down\n"));
        assert!(text.contains("caused by: network down"));
    }

    #[test]
    fn given_any_error_when_asking_exit_code_then_failure() {
        let err = AppError::Config {
            message: "bad".into(),
        };
        assert_eq!(err.exit_code(), crate::exitcode::FAILURE);
        assert!(err.dispatch().is_none());
    }
}
