//! Application registry and execution driver
//!
//! ## Run cycle
//!
//! ```text
//! Idle ─> Initializing (first run only) ─> ActivatingGlobals ─> RunningCommand ─> Resetting ─> Idle
//!              │                                 │                    │               ^
//!              └─────────────────────────────────┴────────────────────┴─> Failed ─────┘
//! ```
//!
//! Resetting runs on every path: activation state never leaks into the next run.

use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

use indexmap::IndexMap;
use tracing::{debug, error, instrument, trace};

use crate::application::dispatcher::{DispatchPlan, Dispatcher};
use crate::application::error::{write_report, AppError, AppResult};
use crate::application::help::{self, HELP_COMMAND};
use crate::config::AppConfig;
use crate::domain::{
    AliasTable, Catalog, Command, CommandEntry, DispatchError, DispatchResult, ExecContext,
    Parameter, ParameterEntry, ParameterSet, RunFlags, Unit, Value,
};
use crate::infrastructure::console::Console;

pub const DEBUG_FLAG: &str = "debug";
pub const VERBOSE_FLAG: &str = "verbose";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Initializing,
    ActivatingGlobals,
    RunningCommand,
    Resetting,
    Failed,
}

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub command: String,
    /// Activated global parameters, in activation order
    pub globals: Vec<String>,
    /// Activated command-local parameters, in activation order
    pub locals: Vec<String>,
    /// Return value of the command
    pub value: Value,
}

/// Registry of commands and global parameters, and the driver running them.
///
/// Definitions are reused across runs; `run` takes `&mut self`, so runs on
/// one instance are serialized.
pub struct Application {
    config: AppConfig,
    console: Console,
    commands: IndexMap<String, Command>,
    command_aliases: AliasTable,
    globals: ParameterSet,
    default_command: Option<String>,
    flags: RunFlags,
    last_flags: RunFlags,
    /// The built-in debug flag was parsed in the last run, even if it never activated
    debug_requested: bool,
    builtin_debug: bool,
    state: DriverState,
    initialized: bool,
    aliases_dirty: bool,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            console: Console::stdio(),
            commands: IndexMap::new(),
            command_aliases: AliasTable::default(),
            globals: ParameterSet::new(),
            default_command: None,
            flags: RunFlags::default(),
            last_flags: RunFlags::default(),
            debug_requested: false,
            builtin_debug: false,
            state: DriverState::Idle,
            initialized: false,
            aliases_dirty: true,
        }
    }

    pub fn with_input(mut self, input: impl BufRead + Send + 'static) -> Self {
        self.console.set_input(input);
        self
    }

    pub fn with_output(mut self, output: impl Write + Send + 'static) -> Self {
        self.console.set_output(output);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    /// Run flags of the most recent run, captured before reset.
    pub fn last_flags(&self) -> RunFlags {
        self.last_flags
    }

    // ============================================================
    // Registration
    // ============================================================

    pub fn command(&mut self, command: Command) -> DispatchResult<()> {
        if self.commands.contains_key(command.name()) {
            return Err(DispatchError::AlreadyRegistered(command.name().to_string()));
        }
        debug!("register command {}", command.name());
        self.commands.insert(command.name().to_string(), command);
        self.aliases_dirty = true;
        Ok(())
    }

    /// Register a command and make it the default.
    pub fn default_command(&mut self, command: Command) -> DispatchResult<()> {
        let name = command.name().to_string();
        self.command(command)?;
        self.default_command = Some(name);
        Ok(())
    }

    pub fn set_default(&mut self, name: &str) -> DispatchResult<()> {
        if !self.commands.contains_key(name) {
            return Err(DispatchError::UnknownCommand(name.to_string()));
        }
        self.default_command = Some(name.to_string());
        Ok(())
    }

    pub fn global(&mut self, parameter: Parameter) -> DispatchResult<()> {
        self.globals.register(parameter)?;
        self.aliases_dirty = true;
        Ok(())
    }

    /// Declare `alias` for a registered command or global parameter.
    pub fn alias(&mut self, alias: &str, target: &str) -> DispatchResult<()> {
        if let Some(command) = self.commands.get_mut(target) {
            command.add_alias(alias.to_string());
        } else if self.globals.add_alias(alias, target).is_none() {
            return Err(DispatchError::UnknownParameter {
                scope: self.config.name.clone(),
                name: target.to_string(),
            });
        }
        self.aliases_dirty = true;
        Ok(())
    }

    pub fn get_command(&self, name: &str) -> Option<&Command> {
        self.commands.get(name)
    }

    pub fn commands(&self) -> impl Iterator<Item = &Command> {
        self.commands.values()
    }

    pub fn globals(&self) -> &ParameterSet {
        &self.globals
    }

    pub fn default_command_name(&self) -> Option<&str> {
        self.default_command.as_deref()
    }

    /// Snapshot of the registry for help output.
    pub fn catalog(&self) -> Catalog {
        let entry = |p: &Parameter, table: &AliasTable| ParameterEntry {
            name: p.name().to_string(),
            aliases: table.aliases_of(p.name()).map(str::to_string).collect(),
            takes_arguments: !p.is_flag(),
            description: p.get_description().map(str::to_string),
        };

        Catalog {
            app_name: self.config.name.clone(),
            banner: self.config.help_banner.clone(),
            default_command: self.default_command.clone(),
            commands: self
                .commands
                .values()
                .map(|c| CommandEntry {
                    name: c.name().to_string(),
                    aliases: self.command_aliases.aliases_of(c.name()).map(str::to_string).collect(),
                    description: c.get_description().map(str::to_string),
                    usage: c.usage(),
                    options: c
                        .parameters()
                        .iter()
                        .map(|p| entry(p, c.parameters().aliases()))
                        .collect(),
                })
                .collect(),
            globals: self
                .globals
                .iter()
                .map(|p| entry(p, self.globals.aliases()))
                .collect(),
        }
    }

    // ============================================================
    // Execution
    // ============================================================

    /// Register built-ins and apply aliases without dispatching anything.
    pub fn prepare(&mut self) -> AppResult<()> {
        if !self.initialized {
            self.transition(DriverState::Initializing);
            let result = self.initialize();
            self.transition(DriverState::Idle);
            result?;
        }
        if self.aliases_dirty {
            self.apply_aliases();
        }
        Ok(())
    }

    /// Dispatch `args` and execute, always returning errors to the caller.
    #[instrument(level = "debug", skip_all, fields(app = %self.config.name))]
    pub fn execute<I, S>(&mut self, args: I) -> AppResult<RunOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = args.into_iter().map(Into::into).collect();
        debug!("tokens: {:?}", tokens);

        let result = self.drive(&tokens);
        if let Err(e) = &result {
            debug!("run failed: {}", e);
            self.transition(DriverState::Failed);
        }

        self.transition(DriverState::Resetting);
        self.reset_all();
        self.transition(DriverState::Idle);
        result
    }

    /// Dispatch and execute, applying the error policy: with `raise_errors`
    /// the error is returned unmodified, otherwise it is reported on the
    /// output stream and the process exits with status 1.
    pub fn run<I, S>(&mut self, args: I) -> AppResult<RunOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match self.execute(args) {
            Ok(outcome) => Ok(outcome),
            Err(err) if self.config.raise_errors => Err(err),
            Err(err) => {
                if let Err(e) = self.report_error(&err) {
                    error!("cannot write error report: {}", e);
                }
                std::process::exit(err.exit_code());
            }
        }
    }

    /// Write the error report of the last run to the output stream.
    ///
    /// The report carries the cause chain and a backtrace when the debug
    /// flag was activated, or was parsed in a run that failed before
    /// activation.
    pub fn report_error(&self, err: &AppError) -> io::Result<()> {
        let debug = self.last_flags.debug || self.debug_requested;
        write_report(&mut self.console.output(), err, debug)
    }

    /// Entry point for binaries: run with the process arguments when
    /// `autorun` is set, otherwise only prepare.
    pub fn launch(&mut self) -> AppResult<Option<RunOutcome>> {
        if !self.config.autorun {
            self.prepare()?;
            return Ok(None);
        }
        self.run(std::env::args().skip(1)).map(Some)
    }

    fn transition(&mut self, next: DriverState) {
        trace!("{:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn drive(&mut self, tokens: &[String]) -> AppResult<RunOutcome> {
        self.debug_requested = false;
        self.prepare()?;

        let mut dispatcher = Dispatcher::new(
            &mut self.commands,
            &self.command_aliases,
            &mut self.globals,
            self.default_command.as_deref(),
        );
        let dispatched = dispatcher.dispatch(tokens);
        // a parse error after `--debug` still gets the full report
        self.debug_requested =
            self.builtin_debug && dispatcher.seen_globals().iter().any(|n| n == DEBUG_FLAG);
        let plan = dispatched?;

        let value = self.execute_plan(&plan)?;
        Ok(RunOutcome {
            command: plan.command,
            globals: plan.globals,
            locals: plan.locals,
            value,
        })
    }

    fn execute_plan(&mut self, plan: &DispatchPlan) -> AppResult<Value> {
        let catalog = self.catalog();
        let interval = self.config.throbber_interval();
        let mut given: BTreeMap<String, Vec<Value>> = BTreeMap::new();

        self.transition(DriverState::ActivatingGlobals);
        for name in &plan.globals {
            let parameter = self
                .globals
                .get_mut(name)
                .ok_or_else(|| DispatchError::UnknownOption(name.clone()))?;
            let values = parameter.check_args()?;
            let unit = Unit::parameter(name.as_str(), parameter.is_flag());
            let mut ctx = ExecContext::new(
                unit,
                &mut self.flags,
                &mut self.console,
                &given,
                &catalog,
                interval,
            );
            parameter.activate(&mut ctx, &values)?;
            given.insert(name.clone(), values);
        }

        self.transition(DriverState::RunningCommand);
        let command = self
            .commands
            .get_mut(&plan.command)
            .ok_or_else(|| DispatchError::UnknownCommand(plan.command.clone()))?;

        for name in &plan.locals {
            let parameter = command.parameters_mut().get_mut(name).ok_or_else(|| {
                DispatchError::UnknownParameter {
                    scope: plan.command.clone(),
                    name: name.clone(),
                }
            })?;
            let values = parameter.check_args()?;
            let unit = Unit::parameter(name.as_str(), parameter.is_flag());
            let mut ctx = ExecContext::new(
                unit,
                &mut self.flags,
                &mut self.console,
                &given,
                &catalog,
                interval,
            );
            parameter.activate(&mut ctx, &values)?;
            given.insert(name.clone(), values);
        }

        let mut ctx = ExecContext::new(
            Unit::command(plan.command.as_str()),
            &mut self.flags,
            &mut self.console,
            &given,
            &catalog,
            interval,
        );
        Ok(command.run(&mut ctx, &plan.arguments)?)
    }

    /// One-time setup: built-in flags and the help command.
    fn initialize(&mut self) -> DispatchResult<()> {
        if !self.globals.contains(DEBUG_FLAG) {
            self.builtin_debug = true;
            self.globals.register(
                Parameter::flag(DEBUG_FLAG)
                    .alias("d")
                    .description("Report errors, including parse errors, with their causes and a backtrace")
                    .on_activate(|ctx, _| {
                        ctx.enable_debug();
                        Ok(())
                    }),
            )?;
        }
        if !self.globals.contains(VERBOSE_FLAG) {
            self.globals.register(
                Parameter::flag(VERBOSE_FLAG)
                    .alias("v")
                    .description("Enable verbose output")
                    .on_activate(|ctx, _| {
                        ctx.enable_verbose();
                        Ok(())
                    }),
            )?;
        }

        if !self.config.suppress_help && !self.commands.contains_key(HELP_COMMAND) {
            self.command(help::command()?)?;
        }
        if self.default_command.is_none()
            && self.config.help_as_default
            && self.commands.contains_key(HELP_COMMAND)
        {
            self.default_command = Some(HELP_COMMAND.to_string());
        }

        self.initialized = true;
        self.aliases_dirty = true;
        debug!(
            "initialized: {} commands, {} globals",
            self.commands.len(),
            self.globals.len()
        );
        Ok(())
    }

    fn apply_aliases(&mut self) {
        let auto_short = self.config.auto_short_aliases;
        self.globals.apply_aliases(auto_short);
        for command in self.commands.values_mut() {
            command.apply_aliases(auto_short);
        }
        self.command_aliases.rebuild(
            self.commands
                .values()
                .map(|c| (c.name(), c.declared_aliases())),
            false,
        );
        self.aliases_dirty = false;
        trace!(
            "aliases applied: {} command, {} global",
            self.command_aliases.len(),
            self.globals.aliases().len()
        );
    }

    fn reset_all(&mut self) {
        for command in self.commands.values_mut() {
            command.reset();
        }
        self.globals.reset_all();
        self.last_flags = self.flags;
        self.flags = RunFlags::default();
    }
}
