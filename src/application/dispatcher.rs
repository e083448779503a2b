//! Argument dispatcher: raw tokens -> dispatch plan
//!
//! Single left-to-right pass:
//!
//! ```text
//! tokens ──> select command ──> scan globals ──> command-local dispatch ──> plan
//!             (push back)        (claim args)     (locals + positional)
//! ```
//!
//! Classification is by prefix only: any token starting with `-` is an
//! option marker.

use std::collections::VecDeque;

use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::domain::alias::AliasTable;
use crate::domain::command::push_unique;
use crate::domain::parameter::option_name;
use crate::domain::{Command, DispatchError, DispatchResult, ParameterSet};

/// Resolved invocation: which command runs, which parameters to activate,
/// and the leftover positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchPlan {
    pub command: String,
    /// Global parameters in parse order, each at most once
    pub globals: Vec<String>,
    /// Command-local parameters in parse order, each at most once
    pub locals: Vec<String>,
    pub arguments: Vec<String>,
}

pub struct Dispatcher<'a> {
    commands: &'a mut IndexMap<String, Command>,
    command_aliases: &'a AliasTable,
    globals: &'a mut ParameterSet,
    default_command: Option<&'a str>,
    seen: Vec<String>,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        commands: &'a mut IndexMap<String, Command>,
        command_aliases: &'a AliasTable,
        globals: &'a mut ParameterSet,
        default_command: Option<&'a str>,
    ) -> Self {
        Self {
            commands,
            command_aliases,
            globals,
            default_command,
            seen: Vec::new(),
        }
    }

    /// Global parameters claimed so far, also after a failed dispatch.
    pub fn seen_globals(&self) -> &[String] {
        &self.seen
    }

    #[instrument(level = "debug", skip(self))]
    pub fn dispatch(&mut self, tokens: &[String]) -> DispatchResult<DispatchPlan> {
        let mut tokens: VecDeque<String> = tokens.iter().cloned().collect();

        let command = self.select_command(&mut tokens)?;
        let (mut globals, rest) = self.scan_globals(&command, tokens)?;

        let Some(selected) = self.commands.get_mut(&command) else {
            return Err(DispatchError::UnknownCommand(command));
        };
        let local = selected.dispatch_args(rest, self.globals)?;
        for name in &local.globals {
            push_unique(&mut globals, name);
        }

        let plan = DispatchPlan {
            command,
            globals,
            locals: local.locals,
            arguments: local.arguments,
        };
        debug!("plan: {:?}", plan);
        Ok(plan)
    }

    fn resolve_command(&self, name: &str) -> Option<String> {
        if self.commands.contains_key(name) {
            return Some(name.to_string());
        }
        self.command_aliases.get(name).map(str::to_string)
    }

    fn default_or(&self, err: DispatchError) -> DispatchResult<String> {
        match self.default_command {
            Some(name) => Ok(name.to_string()),
            None => Err(err),
        }
    }

    /// Consume the command token, or push it back and fall back to the default.
    fn select_command(&self, tokens: &mut VecDeque<String>) -> DispatchResult<String> {
        let Some(first) = tokens.pop_front() else {
            return self.default_or(DispatchError::NoDefaultCommand);
        };

        match option_name(&first) {
            Some(name) => {
                // `--name` selects a command unless a global parameter claims it
                if self.globals.resolve(name).is_none() {
                    if let Some(command) = self.resolve_command(name) {
                        debug!("command {} selected by marker {}", command, first);
                        return Ok(command);
                    }
                }
                tokens.push_front(first);
                self.default_or(DispatchError::NoDefaultCommand)
            }
            None => {
                if let Some(command) = self.resolve_command(&first) {
                    return Ok(command);
                }
                let err = DispatchError::UnknownCommand(first.clone());
                tokens.push_front(first);
                self.default_or(err)
            }
        }
    }

    /// Claim global markers and their arguments; return the rest in order.
    ///
    /// Markers of the selected command's own parameters stay in the stream.
    fn scan_globals(
        &mut self,
        command: &str,
        tokens: VecDeque<String>,
    ) -> DispatchResult<(Vec<String>, Vec<String>)> {
        let locals = self.commands.get(command).map(Command::parameters);
        let mut activated = Vec::new();
        let mut rest = Vec::new();
        let mut current: Option<String> = None;

        for token in tokens {
            if let Some(name) = option_name(&token) {
                // command-local parameters shadow globals of the same name
                if locals.is_some_and(|set| set.resolve(name).is_some()) {
                    current = None;
                    rest.push(token);
                } else if let Some(canonical) = self.globals.resolve(name) {
                    let canonical = canonical.to_string();
                    push_unique(&mut activated, &canonical);
                    push_unique(&mut self.seen, &canonical);
                    current = Some(canonical);
                } else {
                    return Err(DispatchError::UnknownOption(token));
                }
                continue;
            }

            match current.as_deref().and_then(|name| self.globals.get_mut(name)) {
                Some(parameter) if parameter.expects_more() => {
                    parameter.add_argument(&token)?;
                    if !parameter.expects_more() {
                        current = None;
                    }
                }
                _ => {
                    current = None;
                    rest.push(token);
                }
            }
        }
        Ok((activated, rest))
    }
}
