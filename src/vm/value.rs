//! Argument values and the evaluator that produces them.
//!
//! Evaluation is pure: expressions only see literals and handles, never the
//! host's variable storage. A constant is re-evaluated at every use site
//! because the parser copies its whole tree there.

use super::error::EvalError;
use crate::model::{Flag, Identifier, Variable};
use crate::processor::ast::{BinaryOp, Expr, UnaryOp};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i32),
    Float(f64),
    Str(String),
    Identifier(Identifier),
    Variable(Variable),
    Flag(Flag),
    Address(usize),
}

impl Value {
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Identifier(_) => "identifier",
            Value::Variable(_) => "variable",
            Value::Flag(_) => "flag",
            Value::Address(_) => "address",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v:?}"),
            Value::Str(s) => write!(f, "\"{s}\""),
            Value::Identifier(h) => write!(f, "ident({h})"),
            Value::Variable(h) => write!(f, "var({h})"),
            Value::Flag(h) => write!(f, "flag({h})"),
            Value::Address(pc) => write!(f, "@{pc}"),
        }
    }
}

#[derive(Clone, Copy)]
enum Num {
    Int(i32),
    Float(f64),
}

impl Num {
    fn of(value: Value, op: char) -> Result<Num, EvalError> {
        match value {
            Value::Int(v) => Ok(Num::Int(v)),
            Value::Float(v) => Ok(Num::Float(v)),
            Value::Address(pc) => i32::try_from(pc)
                .map(Num::Int)
                .map_err(|_| EvalError::AddressOverflow(pc)),
            other => Err(EvalError::NotNumeric {
                op,
                operand: other.kind(),
            }),
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(v) => v as f64,
            Num::Float(v) => v,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(v) => Value::Int(v),
            Num::Float(v) => Value::Float(v),
        }
    }
}

pub fn evaluate(expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Integer(v) => Ok(Value::Int(*v)),
        Expr::Float(v) => Ok(Value::Float(*v)),
        Expr::String(s) => Ok(Value::Str(s.clone())),
        Expr::Identifier(h) => Ok(Value::Identifier(*h)),
        Expr::Variable(h) => Ok(Value::Variable(*h)),
        Expr::Flag(h) => Ok(Value::Flag(*h)),
        Expr::Address(pc) => Ok(Value::Address(*pc)),
        Expr::Label(name) => Err(EvalError::UnresolvedLabel(name.clone())),
        Expr::Unary(op, operand) => {
            let sym = match op {
                UnaryOp::Plus => '+',
                UnaryOp::Minus => '-',
            };
            let n = Num::of(evaluate(operand)?, sym)?;
            let out = match (op, n) {
                (UnaryOp::Plus, n) => n,
                (UnaryOp::Minus, Num::Int(v)) => Num::Int(v.wrapping_neg()),
                (UnaryOp::Minus, Num::Float(v)) => Num::Float(-v),
            };
            Ok(out.into_value())
        }
        Expr::Binary(op, left, right) => {
            let sym = op.symbol();
            let l = Num::of(evaluate(left)?, sym)?;
            let r = Num::of(evaluate(right)?, sym)?;
            apply(*op, l, r).map(Num::into_value)
        }
    }
}

fn apply(op: BinaryOp, l: Num, r: Num) -> Result<Num, EvalError> {
    if let (Num::Int(a), Num::Int(b)) = (l, r) {
        let v = match op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::Div if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Div => a.wrapping_div(b),
            BinaryOp::Mod if b == 0 => return Err(EvalError::DivisionByZero),
            BinaryOp::Mod => a.wrapping_rem(b),
        };
        return Ok(Num::Int(v));
    }

    let (a, b) = (l.as_f64(), r.as_f64());
    let v = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Mod => a % b,
    };
    Ok(Num::Float(v))
}

/// Evaluate every argument in order.
pub fn evaluate_all(args: &[Expr]) -> Result<Vec<Value>, EvalError> {
    args.iter().map(evaluate).collect()
}
