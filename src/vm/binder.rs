//! Declarative argument binding.
//!
//! A command describes the arguments it wants as a list of `Param`s. Each
//! one names the domain the value must be coerced into, which argument
//! position it reads (its declaration order unless moved with `at`), and
//! whether a missing argument is acceptable.
//!
//! ```
//! use fxscript::vm::binder::{bind, Domain, Param};
//! use fxscript::vm::Value;
//!
//! const SIG: &[Param] = &[
//!     Param::new(Domain::Address),
//!     Param::new(Domain::Int).optional(),
//! ];
//!
//! let args = bind(SIG, &[Value::Address(4)]).unwrap();
//! assert_eq!(args.address(0).unwrap(), 4);
//! assert_eq!(args.int(1).unwrap(), 0);
//! ```

use super::error::BindError;
use super::value::Value;
use crate::model::{Flag, Identifier, Variable};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    Address,
    Identifier,
    Variable,
    Flag,
    Str,
    Int,
    Float,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Address => "address",
            Domain::Identifier => "identifier",
            Domain::Variable => "variable",
            Domain::Flag => "flag",
            Domain::Str => "string",
            Domain::Int => "integer",
            Domain::Float => "float",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub domain: Domain,
    /// Argument position; `None` means the parameter's own position.
    pub index: Option<usize>,
    pub optional: bool,
    /// Payload used instead of the domain's missing sentinel.
    pub default: Option<i32>,
}

impl Param {
    pub const fn new(domain: Domain) -> Self {
        Self {
            domain,
            index: None,
            optional: false,
            default: None,
        }
    }

    pub const fn at(mut self, index: usize) -> Self {
        self.index = Some(index);
        self
    }

    pub const fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Optional, falling back to `value` instead of the missing sentinel.
    pub const fn or(mut self, value: i32) -> Self {
        self.optional = true;
        self.default = Some(value);
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Address(usize),
    Identifier(Identifier),
    Variable(Variable),
    Flag(Flag),
    Str(String),
    Int(i32),
    Float(f64),
}

/// Bound arguments, in parameter declaration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Args(Vec<Arg>);

macro_rules! accessor {
    ($name:ident, $variant:ident, $domain:ident, $ty:ty) => {
        pub fn $name(&self, param: usize) -> Result<$ty, BindError> {
            match self.0.get(param) {
                Some(Arg::$variant(v)) => Ok(v.clone()),
                Some(other) => Err(BindError::DomainMismatch {
                    index: param,
                    expected: Domain::$domain,
                    found: other.kind(),
                }),
                None => Err(BindError::MissingArgument {
                    index: param,
                    domain: Domain::$domain,
                }),
            }
        }
    };
}

impl Args {
    accessor!(address, Address, Address, usize);
    accessor!(identifier, Identifier, Identifier, Identifier);
    accessor!(variable, Variable, Variable, Variable);
    accessor!(flag, Flag, Flag, Flag);
    accessor!(string, Str, Str, String);
    accessor!(int, Int, Int, i32);
    accessor!(float, Float, Float, f64);

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arg> {
        self.0.iter()
    }
}

impl Arg {
    fn kind(&self) -> &'static str {
        match self {
            Arg::Address(_) => "address",
            Arg::Identifier(_) => "identifier",
            Arg::Variable(_) => "variable",
            Arg::Flag(_) => "flag",
            Arg::Str(_) => "string",
            Arg::Int(_) => "integer",
            Arg::Float(_) => "float",
        }
    }
}

/// Bind `values` against `signature`, failing on the first parameter that
/// cannot be satisfied. Values beyond the signature are ignored.
pub fn bind(signature: &[Param], values: &[Value]) -> Result<Args, BindError> {
    let mut out = Vec::with_capacity(signature.len());

    for (pos, param) in signature.iter().enumerate() {
        let index = param.index.unwrap_or(pos);
        let arg = match values.get(index) {
            Some(value) => coerce(param.domain, value, index)?,
            None if param.optional => missing(param, index)?,
            None => {
                return Err(BindError::MissingArgument {
                    index,
                    domain: param.domain,
                });
            }
        };
        out.push(arg);
    }

    Ok(Args(out))
}

fn coerce(domain: Domain, value: &Value, index: usize) -> Result<Arg, BindError> {
    let arg = match (domain, value) {
        (Domain::Address, Value::Address(pc)) => Some(Arg::Address(*pc)),
        (Domain::Address, Value::Int(v)) => usize::try_from(*v).ok().map(Arg::Address),
        (Domain::Int, Value::Int(v)) => Some(Arg::Int(*v)),
        (Domain::Int, Value::Address(pc)) => i32::try_from(*pc).ok().map(Arg::Int),
        (Domain::Float, Value::Float(v)) => Some(Arg::Float(*v)),
        (Domain::Float, Value::Int(v)) => Some(Arg::Float(*v as f64)),
        (Domain::Identifier, Value::Identifier(h)) => Some(Arg::Identifier(*h)),
        (Domain::Variable, Value::Variable(h)) => Some(Arg::Variable(*h)),
        (Domain::Flag, Value::Flag(h)) => Some(Arg::Flag(*h)),
        (Domain::Str, Value::Str(s)) => Some(Arg::Str(s.clone())),
        _ => None,
    };

    arg.ok_or(BindError::DomainMismatch {
        index,
        expected: domain,
        found: value.kind(),
    })
}

fn missing(param: &Param, index: usize) -> Result<Arg, BindError> {
    let arg = match (param.domain, param.default) {
        (Domain::Flag, None) => return Err(BindError::NoFlagDefault { index }),
        (Domain::Flag, Some(v)) => Arg::Flag(Flag(v as u32)),
        (Domain::Address, d) => Arg::Address(d.and_then(|v| usize::try_from(v).ok()).unwrap_or(0)),
        (Domain::Int, d) => Arg::Int(d.unwrap_or(0)),
        (Domain::Float, d) => Arg::Float(d.map(f64::from).unwrap_or(0.0)),
        (Domain::Str, _) => Arg::Str(String::new()),
        (Domain::Identifier, Some(v)) => Arg::Identifier(Identifier(v as u32)),
        (Domain::Identifier, None) => Arg::Identifier(Identifier::MISSING),
        (Domain::Variable, Some(v)) => Arg::Variable(Variable(v as u32)),
        (Domain::Variable, None) => Arg::Variable(Variable::MISSING),
    };
    Ok(arg)
}
