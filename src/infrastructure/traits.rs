//! I/O boundary traits for testability
//!
//! External command handlers run through `CommandRunner`, so commands bound
//! to out-of-process programs can be tested with a mock runner.

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Captured result of an external program.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalOutput {
    /// Exit code; `None` if terminated by a signal
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ExternalOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

/// External command runner abstraction.
pub trait CommandRunner: Send + Sync {
    /// Run a program with arguments and capture its output.
    fn run(&self, program: &Path, args: &[String]) -> io::Result<ExternalOutput>;

    /// Locate a program. Paths are checked directly, bare names are searched
    /// on `PATH`.
    fn resolve(&self, program: &Path) -> Option<PathBuf> {
        find_program(program)
    }
}

/// Real command runner using `std::process::Command`.
#[derive(Debug, Default)]
pub struct RealCommandRunner;

impl CommandRunner for RealCommandRunner {
    fn run(&self, program: &Path, args: &[String]) -> io::Result<ExternalOutput> {
        let output = Command::new(program).args(args).output()?;
        Ok(ExternalOutput {
            status: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

pub fn find_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 || program.is_absolute() {
        return program.is_file().then(|| program.to_path_buf());
    }
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(program))
        .find(|candidate| candidate.is_file())
}
