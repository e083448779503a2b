//! Dispatch errors (parsing, validation and execution of commands)

use thiserror::Error;

use crate::domain::value::ParamType;

/// Error type returned by user-supplied actions.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for user-supplied actions.
pub type HandlerResult<T> = Result<T, HandlerError>;

/// Dispatch errors represent misuse of the declared command line.
/// They carry the names the user typed so they can be reported verbatim.
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    #[error("no command given and no default command configured")]
    NoDefaultCommand,

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("unknown parameter for {scope}: {name}")]
    UnknownParameter { scope: String, name: String },

    #[error("{unit}: missing argument (expected {expected}, got {given})")]
    MissingArgument {
        unit: String,
        expected: usize,
        given: usize,
    },

    #[error("{unit}: too many arguments (accepts {accepted}, got {given})")]
    TooManyArguments {
        unit: String,
        accepted: usize,
        given: usize,
    },

    #[error("{unit}: argument {position} must be {expected}, got '{value}'")]
    TypeMismatch {
        unit: String,
        position: usize,
        expected: ParamType,
        value: String,
    },

    #[error("{0}: no action block and no external handler")]
    BlockMissing(String),

    #[error("already registered: {0}")]
    AlreadyRegistered(String),

    #[error("{command}: argument '{slot}' cannot follow an optional or rest argument")]
    SlotOrder { command: String, slot: String },

    #[error("external handler for {command} failed: {message}")]
    External { command: String, message: String },

    #[error("{unit}: {source}")]
    Action {
        unit: String,
        #[source]
        source: HandlerError,
    },
}

impl DispatchError {
    /// Attach the name of the failing unit to a type mismatch raised by
    /// bare coercion.
    pub(crate) fn in_unit(self, name: &str, slot: usize) -> Self {
        match self {
            DispatchError::TypeMismatch {
                expected, value, ..
            } => DispatchError::TypeMismatch {
                unit: name.to_string(),
                position: slot,
                expected,
                value,
            },
            other => other,
        }
    }
}

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
