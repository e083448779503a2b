//! Commands: named actions with their own parameters and positional slots

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, instrument};

use crate::domain::context::ExecContext;
use crate::domain::error::{DispatchError, DispatchResult, HandlerResult};
use crate::domain::parameter::{option_name, Arity, Parameter, ParameterSet};
use crate::domain::value::{ParamType, Value};
use crate::infrastructure::traits::{CommandRunner, RealCommandRunner};

/// Inline action of a command; positional arguments are read from the context.
pub type CommandAction = Box<dyn FnMut(&mut ExecContext<'_>) -> HandlerResult<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Required,
    Optional,
    /// Collects all remaining arguments into a list
    Rest,
}

/// A declared positional argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgSlot {
    pub name: String,
    pub ty: ParamType,
    pub kind: SlotKind,
}

/// Out-of-process handler: a program invoked with the positional arguments.
pub struct ExternalHandler {
    program: PathBuf,
    runner: Arc<dyn CommandRunner>,
}

impl ExternalHandler {
    pub fn program(&self) -> &Path {
        &self.program
    }

    fn invoke(&self, command: &str, args: &[String]) -> DispatchResult<Value> {
        debug!("external {}: {} {:?}", command, self.program.display(), args);
        let external = |message: String| DispatchError::External {
            command: command.to_string(),
            message,
        };

        let output = self
            .runner
            .run(&self.program, args)
            .map_err(|e| external(format!("{}: {}", self.program.display(), e)))?;

        if !output.success() {
            let stderr = output.stderr.trim();
            let message = if stderr.is_empty() {
                match output.status {
                    Some(code) => format!("exit status {code}"),
                    None => "terminated by signal".to_string(),
                }
            } else {
                stderr.to_string()
            };
            return Err(external(message));
        }
        Ok(Value::Str(output.stdout.trim_end().to_string()))
    }
}

pub enum Handler {
    Inline(CommandAction),
    External(ExternalHandler),
}

/// Outcome of dispatching a command's own tokens.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalDispatch {
    /// Command-local parameters, in first-seen order
    pub locals: Vec<String>,
    /// Global parameters referenced among the command's tokens
    pub globals: Vec<String>,
    pub arguments: Vec<String>,
}

enum Current {
    Local(String),
    Global(String),
}

pub(crate) fn push_unique(names: &mut Vec<String>, name: &str) {
    if !names.iter().any(|n| n == name) {
        names.push(name.to_string());
    }
}

pub struct Command {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    parameters: ParameterSet,
    slots: Vec<ArgSlot>,
    handler: Handler,
    active: bool,
    arguments: Vec<String>,
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handler = match &self.handler {
            Handler::Inline(_) => "inline".to_string(),
            Handler::External(e) => e.program.display().to_string(),
        };
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("parameters", &self.parameters)
            .field("slots", &self.slots)
            .field("handler", &handler)
            .field("active", &self.active)
            .field("arguments", &self.arguments)
            .finish()
    }
}

impl Command {
    /// Command with an inline action and no declared slots (any argument count).
    pub fn new<F>(name: impl Into<String>, action: F) -> Self
    where
        F: FnMut(&mut ExecContext<'_>) -> HandlerResult<Value> + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            parameters: ParameterSet::new(),
            slots: Vec::new(),
            handler: Handler::Inline(Box::new(action)),
            active: false,
            arguments: Vec::new(),
        }
    }

    pub fn builder(name: impl Into<String>) -> CommandBuilder {
        CommandBuilder::new(name)
    }

    /// Command backed by an external program; fails if it cannot be found.
    pub fn external(name: impl Into<String>, program: impl Into<PathBuf>) -> DispatchResult<Self> {
        CommandBuilder::new(name).external(program).build()
    }

    pub fn register(&mut self, parameter: Parameter) -> DispatchResult<()> {
        self.parameters.register(parameter)
    }

    /// Register `alias -> target` pairs against already registered parameters.
    pub fn register_aliases<I, A, T>(&mut self, aliases: I) -> DispatchResult<()>
    where
        I: IntoIterator<Item = (A, T)>,
        A: AsRef<str>,
        T: AsRef<str>,
    {
        for (alias, target) in aliases {
            if self
                .parameters
                .add_alias(alias.as_ref(), target.as_ref())
                .is_none()
            {
                return Err(DispatchError::UnknownParameter {
                    scope: self.name.clone(),
                    name: target.as_ref().to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn apply_aliases(&mut self, auto_short: bool) {
        self.parameters.apply_aliases(auto_short);
    }

    pub(crate) fn add_alias(&mut self, alias: String) {
        if alias != self.name && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declared_aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterSet {
        &mut self.parameters
    }

    pub fn slots(&self) -> &[ArgSlot] {
        &self.slots
    }

    pub fn is_external(&self) -> bool {
        matches!(self.handler, Handler::External(_))
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Raw positional arguments of the current run.
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Positional arity from the declared slots; `None` accepts any count.
    pub fn arity(&self) -> Option<Arity> {
        if self.slots.is_empty() {
            return None;
        }
        let count = |kind| self.slots.iter().filter(|s| s.kind == kind).count();
        let required = count(SlotKind::Required);
        let optional = count(SlotKind::Optional);
        let arity = if count(SlotKind::Rest) > 0 {
            Arity::AtLeast(required)
        } else if optional == 0 {
            Arity::Exact(required)
        } else {
            Arity::Between(required, required + optional)
        };
        Some(arity)
    }

    /// Slot summary such as `<file> [mode] [extra...]`.
    pub fn usage(&self) -> String {
        self.slots
            .iter()
            .map(|slot| match slot.kind {
                SlotKind::Required => format!("<{}>", slot.name),
                SlotKind::Optional => format!("[{}]", slot.name),
                SlotKind::Rest => format!("[{}...]", slot.name),
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Split the command's tokens into local parameters and positional args.
    ///
    /// Markers resolve against this command's parameters first, then the
    /// globals. Bare tokens feed the current parameter while it expects more
    /// arguments; otherwise they are positional.
    #[instrument(level = "debug", skip(self, globals), fields(command = %self.name))]
    pub fn dispatch_args(
        &mut self,
        tokens: Vec<String>,
        globals: &mut ParameterSet,
    ) -> DispatchResult<LocalDispatch> {
        let mut plan = LocalDispatch::default();
        let mut current: Option<Current> = None;

        for token in tokens {
            if let Some(name) = option_name(&token) {
                if let Some(canonical) = self.parameters.resolve(name) {
                    let canonical = canonical.to_string();
                    push_unique(&mut plan.locals, &canonical);
                    current = Some(Current::Local(canonical));
                } else if let Some(canonical) = globals.resolve(name) {
                    let canonical = canonical.to_string();
                    push_unique(&mut plan.globals, &canonical);
                    current = Some(Current::Global(canonical));
                } else {
                    return Err(DispatchError::UnknownParameter {
                        scope: self.name.clone(),
                        name: token,
                    });
                }
                continue;
            }

            let target = match &current {
                Some(Current::Local(name)) => self.parameters.get_mut(name),
                Some(Current::Global(name)) => globals.get_mut(name),
                None => None,
            };
            match target {
                Some(parameter) if parameter.expects_more() => parameter.add_argument(&token)?,
                _ => {
                    current = None;
                    plan.arguments.push(token);
                }
            }
        }

        debug!("local dispatch: {:?}", plan);
        Ok(plan)
    }

    /// Check positional arity and coerce each argument to its slot type.
    ///
    /// Returns the values in order and the bindings by slot name.
    pub fn check_arguments(
        &self,
        positional: &[String],
    ) -> DispatchResult<(Vec<Value>, BTreeMap<String, Value>)> {
        let given = positional.len();
        if let Some(arity) = self.arity() {
            if given < arity.min() {
                return Err(DispatchError::MissingArgument {
                    unit: self.name.clone(),
                    expected: arity.min(),
                    given,
                });
            }
            if let Some(max) = arity.max().filter(|max| given > *max) {
                return Err(DispatchError::TooManyArguments {
                    unit: self.name.clone(),
                    accepted: max,
                    given,
                });
            }
        }

        if self.slots.is_empty() {
            let values = positional.iter().map(|a| Value::Str(a.clone())).collect();
            return Ok((values, BTreeMap::new()));
        }

        let coerce = |slot: &ArgSlot, position: usize, raw: &str| {
            slot.ty.coerce(raw).map_err(|e| e.in_unit(&self.name, position + 1))
        };

        let mut values = Vec::with_capacity(given);
        let mut bindings = BTreeMap::new();
        let mut remaining = positional.iter().enumerate();
        for slot in &self.slots {
            match slot.kind {
                SlotKind::Required | SlotKind::Optional => {
                    if let Some((position, raw)) = remaining.next() {
                        let value = coerce(slot, position, raw)?;
                        values.push(value.clone());
                        bindings.insert(slot.name.clone(), value);
                    }
                }
                SlotKind::Rest => {
                    let mut rest = Vec::new();
                    for (position, raw) in remaining.by_ref() {
                        rest.push(coerce(slot, position, raw)?);
                    }
                    values.extend(rest.iter().cloned());
                    bindings.insert(slot.name.clone(), Value::List(rest));
                }
            }
        }
        Ok((values, bindings))
    }

    /// Validate the positional arguments and execute the handler.
    pub fn run(&mut self, ctx: &mut ExecContext<'_>, positional: &[String]) -> DispatchResult<Value> {
        let (values, bindings) = self.check_arguments(positional)?;
        self.active = true;
        self.arguments = positional.to_vec();
        debug!("run {} with {:?}", self.name, values);

        match &mut self.handler {
            Handler::Inline(action) => {
                ctx.bind(values, bindings);
                action(ctx).map_err(|source| DispatchError::Action {
                    unit: self.name.clone(),
                    source,
                })
            }
            Handler::External(external) => external.invoke(&self.name, positional),
        }
    }

    /// Clear activation state of the command and its parameters.
    pub fn reset(&mut self) {
        self.active = false;
        self.arguments.clear();
        self.parameters.reset_all();
    }
}

/// Fluent declaration of a command.
pub struct CommandBuilder {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    parameters: Vec<Parameter>,
    parameter_aliases: Vec<(String, String)>,
    slots: Vec<ArgSlot>,
    action: Option<CommandAction>,
    external: Option<PathBuf>,
    runner: Option<Arc<dyn CommandRunner>>,
}

impl CommandBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            parameters: Vec::new(),
            parameter_aliases: Vec::new(),
            slots: Vec::new(),
            action: None,
            external: None,
            runner: None,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    fn slot(mut self, name: impl Into<String>, ty: ParamType, kind: SlotKind) -> Self {
        self.slots.push(ArgSlot {
            name: name.into(),
            ty,
            kind,
        });
        self
    }

    /// Required string argument.
    pub fn arg(self, name: impl Into<String>) -> Self {
        self.slot(name, ParamType::Str, SlotKind::Required)
    }

    pub fn typed_arg(self, name: impl Into<String>, ty: ParamType) -> Self {
        self.slot(name, ty, SlotKind::Required)
    }

    pub fn optional_arg(self, name: impl Into<String>) -> Self {
        self.slot(name, ParamType::Str, SlotKind::Optional)
    }

    pub fn typed_optional_arg(self, name: impl Into<String>, ty: ParamType) -> Self {
        self.slot(name, ty, SlotKind::Optional)
    }

    /// Collects all remaining arguments; declare it last.
    pub fn rest_args(self, name: impl Into<String>) -> Self {
        self.slot(name, ParamType::Str, SlotKind::Rest)
    }

    pub fn typed_rest_args(self, name: impl Into<String>, ty: ParamType) -> Self {
        self.slot(name, ty, SlotKind::Rest)
    }

    /// Command-local flag or option.
    pub fn option(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn option_alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.parameter_aliases.push((alias.into(), target.into()));
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: FnMut(&mut ExecContext<'_>) -> HandlerResult<Value> + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    /// Used when no inline action is given.
    pub fn external(mut self, program: impl Into<PathBuf>) -> Self {
        self.external = Some(program.into());
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn build(self) -> DispatchResult<Command> {
        check_slot_order(&self.name, &self.slots)?;

        let handler = match (self.action, self.external) {
            (Some(action), _) => Handler::Inline(action),
            (None, Some(program)) => {
                let runner = self
                    .runner
                    .unwrap_or_else(|| Arc::new(RealCommandRunner) as Arc<dyn CommandRunner>);
                let resolved = runner.resolve(&program).ok_or_else(|| {
                    debug!("external handler not found: {}", program.display());
                    DispatchError::BlockMissing(self.name.clone())
                })?;
                Handler::External(ExternalHandler {
                    program: resolved,
                    runner,
                })
            }
            (None, None) => return Err(DispatchError::BlockMissing(self.name)),
        };

        let mut command = Command {
            name: self.name,
            aliases: Vec::new(),
            description: self.description,
            parameters: ParameterSet::new(),
            slots: self.slots,
            handler,
            active: false,
            arguments: Vec::new(),
        };
        for alias in self.aliases {
            command.add_alias(alias);
        }
        for parameter in self.parameters {
            command.register(parameter)?;
        }
        command.register_aliases(self.parameter_aliases)?;
        Ok(command)
    }
}

/// Required slots come first, then optional ones, then at most one rest slot.
fn check_slot_order(command: &str, slots: &[ArgSlot]) -> DispatchResult<()> {
    let mut last = SlotKind::Required;
    for slot in slots {
        let misplaced = match (last, slot.kind) {
            (SlotKind::Rest, _) => true,
            (SlotKind::Optional, SlotKind::Required) => true,
            _ => false,
        };
        if misplaced {
            return Err(DispatchError::SlotOrder {
                command: command.to_string(),
                slot: slot.name.clone(),
            });
        }
        last = slot.kind;
    }
    Ok(())
}
