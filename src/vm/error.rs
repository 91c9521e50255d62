use super::binder::Domain;
use crate::model::CommandType;
use thiserror::Error;

/// Failure while matching evaluated arguments against a signature.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BindError {
    #[error("argument {index} ({domain}) is missing")]
    MissingArgument { index: usize, domain: Domain },

    #[error("argument {index}: expected {expected}, got {found}")]
    DomainMismatch {
        index: usize,
        expected: Domain,
        found: &'static str,
    },

    #[error("argument {index}: a flag has no default value")]
    NoFlagDefault { index: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("unresolved label '{0}'")]
    UnresolvedLabel(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("operator '{op}' cannot be applied to {operand}")]
    NotNumeric { op: char, operand: &'static str },

    #[error("address {0} does not fit in an integer")]
    AddressOverflow(usize),
}

/// Fault raised while a frame is running.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("unknown label: '{0}'")]
    UnknownLabel(String),

    #[error("command type {0} has no handler")]
    UnboundCommand(CommandType),

    #[error("call stack overflow: more than {depth} nested calls (returning to {pc})")]
    CallStackOverflow { depth: usize, pc: usize },

    #[error("argument binding failed: {0}")]
    Bind(#[from] BindError),

    #[error("evaluation failed: {0}")]
    Eval(#[from] EvalError),

    #[error("host call is not supported by this environment")]
    HostCallUnsupported,

    #[error("host command failed: {0}")]
    Host(String),
}

/// Dispatch table problems found while building a runtime.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("command type {0} has no handler")]
    UnboundCommand(CommandType),
}
