//! Domain layer: parameters, commands and their activation state
//!
//! Independent of configuration loading and process concerns.

pub mod alias;
pub mod command;
pub mod context;
pub mod error;
pub mod parameter;
pub mod value;

pub use alias::AliasTable;
pub use command::{ArgSlot, Command, CommandBuilder, LocalDispatch, SlotKind};
pub use context::{Catalog, CommandEntry, ExecContext, ParameterEntry, RunFlags, Unit, UnitKind};
pub use error::{DispatchError, DispatchResult, HandlerError, HandlerResult};
pub use parameter::{Arity, Parameter, ParameterKind, ParameterSet};
pub use value::{ParamType, Value};
