//! Parameters: flags and options, global or scoped to a command

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::domain::alias::AliasTable;
use crate::domain::context::ExecContext;
use crate::domain::error::{DispatchError, DispatchResult, HandlerResult};
use crate::domain::value::{ParamType, Value};

/// Action bound to a parameter, invoked with the coerced arguments.
pub type ParameterAction = Box<dyn FnMut(&mut ExecContext<'_>, &[Value]) -> HandlerResult<()>>;

/// Strip the option marker from a token: `--name` or `-name`.
///
/// Any token starting with a dash is a marker, including `-` itself and
/// negative numbers.
pub fn option_name(token: &str) -> Option<&str> {
    token
        .strip_prefix("--")
        .or_else(|| token.strip_prefix('-'))
}

/// Number of arguments a unit accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    AtLeast(usize),
    /// Inclusive range
    Between(usize, usize),
}

impl Arity {
    pub fn min(self) -> usize {
        match self {
            Arity::Exact(n) | Arity::AtLeast(n) | Arity::Between(n, _) => n,
        }
    }

    /// `None` means unbounded.
    pub fn max(self) -> Option<usize> {
        match self {
            Arity::Exact(n) | Arity::Between(_, n) => Some(n),
            Arity::AtLeast(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterKind {
    Flag,
    /// Empty `types` means untyped: arguments are kept as strings and
    /// `arity` governs the count.
    Option { types: Vec<ParamType>, arity: Arity },
}

pub struct Parameter {
    name: String,
    aliases: Vec<String>,
    description: Option<String>,
    kind: ParameterKind,
    action: Option<ParameterAction>,
    active: bool,
    args: Vec<String>,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("kind", &self.kind)
            .field("active", &self.active)
            .field("args", &self.args)
            .field("action", &self.action.is_some())
            .finish()
    }
}

impl Parameter {
    fn new(name: impl Into<String>, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            kind,
            action: None,
            active: false,
            args: Vec::new(),
        }
    }

    /// Zero-argument toggle.
    pub fn flag(name: impl Into<String>) -> Self {
        Self::new(name, ParameterKind::Flag)
    }

    /// Untyped option taking `arity` string arguments.
    pub fn option(name: impl Into<String>, arity: Arity) -> Self {
        Self::new(
            name,
            ParameterKind::Option {
                types: Vec::new(),
                arity,
            },
        )
    }

    /// Option taking exactly one argument per declared type.
    pub fn typed_option(name: impl Into<String>, types: impl IntoIterator<Item = ParamType>) -> Self {
        let types: Vec<ParamType> = types.into_iter().collect();
        let arity = Arity::Exact(types.len());
        Self::new(name, ParameterKind::Option { types, arity })
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.add_alias(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn on_activate<F>(mut self, action: F) -> Self
    where
        F: FnMut(&mut ExecContext<'_>, &[Value]) -> HandlerResult<()> + 'static,
    {
        self.action = Some(Box::new(action));
        self
    }

    pub(crate) fn add_alias(&mut self, alias: String) {
        if alias != self.name && !self.aliases.contains(&alias) {
            self.aliases.push(alias);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared aliases, in declaration order.
    pub fn declared_aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn get_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    pub fn is_flag(&self) -> bool {
        matches!(self.kind, ParameterKind::Flag)
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Raw arguments collected in the current run.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn arity(&self) -> Arity {
        match &self.kind {
            ParameterKind::Flag => Arity::Exact(0),
            ParameterKind::Option { arity, .. } => *arity,
        }
    }

    /// Whether a following bare token should be claimed as an argument.
    pub fn expects_more(&self) -> bool {
        match self.arity().max() {
            Some(max) => self.args.len() < max,
            None => true,
        }
    }

    pub fn add_argument(&mut self, raw: &str) -> DispatchResult<()> {
        if let Some(max) = self.arity().max() {
            if self.args.len() >= max {
                return Err(DispatchError::TooManyArguments {
                    unit: self.name.clone(),
                    accepted: max,
                    given: self.args.len() + 1,
                });
            }
        }
        self.args.push(raw.to_string());
        Ok(())
    }

    /// Validate the collected arguments and coerce them to their slot types.
    pub fn check_args(&self) -> DispatchResult<Vec<Value>> {
        let arity = self.arity();
        if self.args.len() < arity.min() {
            return Err(DispatchError::MissingArgument {
                unit: self.name.clone(),
                expected: arity.min(),
                given: self.args.len(),
            });
        }

        match &self.kind {
            ParameterKind::Flag => Ok(Vec::new()),
            ParameterKind::Option { types, .. } if types.is_empty() => {
                Ok(self.args.iter().map(|a| Value::Str(a.clone())).collect())
            }
            ParameterKind::Option { types, .. } => types
                .iter()
                .zip(&self.args)
                .enumerate()
                .map(|(slot, (ty, raw))| ty.coerce(raw).map_err(|e| e.in_unit(&self.name, slot + 1)))
                .collect(),
        }
    }

    /// Mark active and invoke the bound action with already-checked values.
    pub fn activate(&mut self, ctx: &mut ExecContext<'_>, values: &[Value]) -> DispatchResult<()> {
        debug!("activate {}: {:?}", self.name, values);
        self.active = true;
        if let Some(action) = self.action.as_mut() {
            action(ctx, values).map_err(|source| DispatchError::Action {
                unit: self.name.clone(),
                source,
            })?;
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.active = false;
        self.args.clear();
    }
}

/// Registered parameters of one scope (global, or a single command).
#[derive(Debug, Default)]
pub struct ParameterSet {
    params: IndexMap<String, Parameter>,
    aliases: AliasTable,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, parameter: Parameter) -> DispatchResult<()> {
        if self.params.contains_key(parameter.name()) {
            return Err(DispatchError::AlreadyRegistered(parameter.name().to_string()));
        }
        debug!("register parameter {}", parameter.name());
        self.params.insert(parameter.name().to_string(), parameter);
        Ok(())
    }

    /// Declare `alias` for an already registered parameter.
    ///
    /// Returns the canonical name of the target, or `None` if unknown.
    pub fn add_alias(&mut self, alias: &str, target: &str) -> Option<&str> {
        let canonical = self.resolve(target)?.to_string();
        let parameter = self.params.get_mut(&canonical)?;
        parameter.add_alias(alias.to_string());
        Some(parameter.name())
    }

    /// Resolve a canonical name or alias to the canonical name.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        if let Some((key, _)) = self.params.get_key_value(name) {
            return Some(key.as_str());
        }
        if let Some(target) = self.aliases.get(name) {
            return Some(target);
        }
        // declared aliases count even before the table has been applied
        self.params
            .values()
            .find(|p| p.declared_aliases().iter().any(|a| a == name))
            .map(|p| p.name())
    }

    /// Rebuild the alias table from the declared aliases.
    pub fn apply_aliases(&mut self, auto_short: bool) {
        self.aliases.rebuild(
            self.params
                .values()
                .map(|p| (p.name(), p.declared_aliases())),
            auto_short,
        );
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    pub fn get(&self, name: &str) -> Option<&Parameter> {
        self.params.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Parameter> {
        self.params.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.params.contains_key(name)
    }

    /// Parameters in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn reset_all(&mut self) {
        for parameter in self.params.values_mut() {
            parameter.reset();
        }
    }
}
