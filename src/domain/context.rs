//! Execution context handed to every action
//!
//! Carries the unit currently executing, the run-scoped flags, the console,
//! the parameters activated so far, and the positional bindings of the
//! running command. Nothing here outlives a single run.

use std::collections::BTreeMap;
use std::io;
use std::time::Duration;

use crate::cli::progress::{ProgressBar, ProgressOptions};
use crate::cli::{prompt, throbber};
use crate::domain::error::{HandlerError, HandlerResult};
use crate::domain::value::Value;
use crate::infrastructure::console::Console;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Command,
    Flag,
    Option,
}

/// The command or parameter currently executing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unit {
    pub name: String,
    pub kind: UnitKind,
}

impl Unit {
    pub fn command(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: UnitKind::Command,
        }
    }

    pub fn parameter(name: impl Into<String>, is_flag: bool) -> Self {
        Self {
            name: name.into(),
            kind: if is_flag { UnitKind::Flag } else { UnitKind::Option },
        }
    }
}

/// Diagnostic toggles for one run; cleared when the run ends.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunFlags {
    pub debug: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    /// Positional slots, e.g. `<file> [mode] [rest...]`
    pub usage: String,
    pub options: Vec<ParameterEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterEntry {
    pub name: String,
    pub aliases: Vec<String>,
    pub takes_arguments: bool,
    pub description: Option<String>,
}

/// Read-only view of the registry, consumed by the help command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub app_name: String,
    pub banner: Option<String>,
    pub default_command: Option<String>,
    pub commands: Vec<CommandEntry>,
    pub globals: Vec<ParameterEntry>,
}

impl Catalog {
    pub fn command(&self, name: &str) -> Option<&CommandEntry> {
        self.commands
            .iter()
            .find(|c| c.name == name || c.aliases.iter().any(|a| a == name))
    }
}

pub struct ExecContext<'a> {
    unit: Unit,
    flags: &'a mut RunFlags,
    console: &'a mut Console,
    given: &'a BTreeMap<String, Vec<Value>>,
    catalog: &'a Catalog,
    throbber_interval: Duration,
    positional: Vec<Value>,
    bindings: BTreeMap<String, Value>,
}

impl<'a> ExecContext<'a> {
    pub fn new(
        unit: Unit,
        flags: &'a mut RunFlags,
        console: &'a mut Console,
        given: &'a BTreeMap<String, Vec<Value>>,
        catalog: &'a Catalog,
        throbber_interval: Duration,
    ) -> Self {
        Self {
            unit,
            flags,
            console,
            given,
            catalog,
            throbber_interval,
            positional: Vec::new(),
            bindings: BTreeMap::new(),
        }
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn flags(&self) -> RunFlags {
        *self.flags
    }

    pub fn is_debug(&self) -> bool {
        self.flags.debug
    }

    pub fn is_verbose(&self) -> bool {
        self.flags.verbose
    }

    pub fn enable_debug(&mut self) {
        self.flags.debug = true;
    }

    pub fn enable_verbose(&mut self) {
        self.flags.verbose = true;
    }

    /// Whether a parameter (canonical name) was activated earlier in this run.
    pub fn given(&self, name: &str) -> bool {
        self.given.contains_key(name)
    }

    /// Coerced arguments of an activated parameter.
    pub fn param_args(&self, name: &str) -> Option<&[Value]> {
        self.given.get(name).map(Vec::as_slice)
    }

    /// Positional arguments of the running command, in order.
    pub fn arguments(&self) -> &[Value] {
        &self.positional
    }

    /// Positional argument bound to a declared slot.
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Like `arg`, failing the action when the slot is unbound.
    pub fn require(&self, name: &str) -> HandlerResult<&Value> {
        self.arg(name)
            .ok_or_else(|| HandlerError::from(format!("argument '{name}' not given")))
    }

    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    pub fn console(&mut self) -> &mut Console {
        self.console
    }

    /// Write without newline.
    pub fn put(&mut self, text: &str) -> io::Result<()> {
        self.console.write_str(text)?;
        self.console.flush()
    }

    /// Write a line.
    pub fn puts(&mut self, text: &str) -> io::Result<()> {
        self.console.write_str(text)?;
        self.console.write_str("\n")?;
        self.console.flush()
    }

    /// Write a line only when the verbose flag is set.
    pub fn verbose_puts(&mut self, text: &str) -> io::Result<()> {
        if self.flags.verbose {
            self.puts(text)?;
        }
        Ok(())
    }

    pub fn prompt(&mut self, message: &str) -> io::Result<String> {
        prompt::prompt(self.console, message)
    }

    pub fn prompt_default(&mut self, message: &str, default: &str) -> io::Result<String> {
        prompt::prompt_default(self.console, message, default)
    }

    pub fn progress_bar(&mut self, options: ProgressOptions) -> io::Result<ProgressBar> {
        ProgressBar::new(self.console.output(), options)
    }

    /// Run `work` with a spinner animating on the output stream.
    pub fn throbber<T>(&mut self, work: impl FnOnce(&mut Self) -> T) -> T {
        let output = self.console.output();
        let interval = self.throbber_interval;
        throbber::throbber(output, interval, || work(self))
    }

    pub(crate) fn bind(&mut self, positional: Vec<Value>, bindings: BTreeMap<String, Value>) {
        self.positional = positional;
        self.bindings = bindings;
    }
}
