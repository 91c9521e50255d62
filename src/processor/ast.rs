//! Compiled form of a script: a flat, index-addressable command list plus
//! the label/macro/constant tables collected while parsing.

use crate::model::{CommandType, Flag, Identifier, Variable};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn from_symbol(sym: &str) -> Option<Self> {
        match sym {
            "+" => Some(BinaryOp::Add),
            "-" => Some(BinaryOp::Sub),
            "*" => Some(BinaryOp::Mul),
            "/" => Some(BinaryOp::Div),
            "%" => Some(BinaryOp::Mod),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
            BinaryOp::Mod => '%',
        }
    }

    /// `*`, `/` and `%` bind tighter than `+` and `-`.
    pub fn is_multiplicative(self) -> bool {
        matches!(self, BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
    }
}

/// One argument expression. Constants are substituted as whole trees, so
/// nothing here is ever folded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    Integer(i32),
    Float(f64),
    String(String),
    Identifier(Identifier),
    Variable(Variable),
    Flag(Flag),
    /// Name that matched nothing else; must become an `Address` before run.
    Label(String),
    Address(usize),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary(op, Box::new(operand))
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    /// True if any `Label` leaf is left in the tree.
    pub fn has_unresolved(&self) -> bool {
        match self {
            Expr::Label(_) => true,
            Expr::Unary(_, e) => e.has_unresolved(),
            Expr::Binary(_, l, r) => l.has_unresolved() || r.has_unresolved(),
            _ => false,
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Integer(v) => write!(f, "{v}"),
            Expr::Float(v) => write!(f, "{v:?}"),
            Expr::String(s) => write!(f, "\"{s}\""),
            Expr::Identifier(h) => write!(f, "ident({h})"),
            Expr::Variable(h) => write!(f, "var({h})"),
            Expr::Flag(h) => write!(f, "flag({h})"),
            Expr::Label(name) => write!(f, "{name}"),
            Expr::Address(pc) => write!(f, "@{pc}"),
            Expr::Unary(UnaryOp::Plus, e) => write!(f, "+{e}"),
            Expr::Unary(UnaryOp::Minus, e) => write!(f, "-{e}"),
            Expr::Binary(op, l, r) => write!(f, "({l} {} {r})", op.symbol()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    #[serde(rename = "type")]
    pub ty: CommandType,
    pub args: Vec<Expr>,
}

impl Command {
    pub fn new(ty: CommandType, args: Vec<Expr>) -> Self {
        Self { ty, args }
    }
}

/// A compiled program. `commands` is the address space: pc == index, and
/// `commands.len()` is the end-of-script address.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Script {
    pub(crate) commands: Vec<Command>,
    pub(crate) labels: BTreeMap<String, usize>,
    pub(crate) macros: BTreeMap<String, Script>,
    pub(crate) constants: BTreeMap<String, Expr>,
}

impl Script {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn command(&self, pc: usize) -> Option<&Command> {
        self.commands.get(pc)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Address the next pushed command will get.
    pub fn pc(&self) -> usize {
        self.commands.len()
    }

    pub fn end_of_script(&self) -> usize {
        self.commands.len()
    }

    pub fn label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    pub fn labels(&self) -> &BTreeMap<String, usize> {
        &self.labels
    }

    /// Names of every label pointing at `pc`.
    pub fn labels_at(&self, pc: usize) -> Vec<&str> {
        self.labels
            .iter()
            .filter(|(_, at)| **at == pc)
            .map(|(name, _)| name.as_str())
            .collect()
    }

    pub fn macro_def(&self, name: &str) -> Option<&Script> {
        self.macros.get(name)
    }

    pub fn constant(&self, name: &str) -> Option<&Expr> {
        self.constants.get(name)
    }

    pub(crate) fn push(&mut self, cmd: Command) {
        debug_assert!(cmd.ty != CommandType::NONE, "none is never emitted");
        self.commands.push(cmd);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let test_cases = vec![
            (Expr::Integer(-3), "-3"),
            (Expr::Float(2.0), "2.0"),
            (Expr::String("hi".into()), "\"hi\""),
            (Expr::Variable(Variable(4)), "var(4)"),
            (Expr::Address(12), "@12"),
            (
                Expr::binary(
                    BinaryOp::Mul,
                    Expr::binary(BinaryOp::Add, Expr::Integer(1), Expr::Integer(2)),
                    Expr::unary(UnaryOp::Minus, Expr::Label("end".into())),
                ),
                "((1 + 2) * -end)",
            ),
        ];

        for (expr, expected) in test_cases {
            assert_eq!(expr.to_string(), expected);
        }
    }

    #[test]
    fn test_has_unresolved() {
        let nested = Expr::binary(
            BinaryOp::Add,
            Expr::Integer(1),
            Expr::unary(UnaryOp::Minus, Expr::Label("x".into())),
        );
        assert!(nested.has_unresolved());
        assert!(!Expr::binary(BinaryOp::Add, Expr::Address(1), Expr::Integer(1)).has_unresolved());
    }

    #[test]
    fn test_labels_at() {
        let mut s = Script::new();
        s.labels.insert("a".into(), 0);
        s.labels.insert("b".into(), 0);
        s.labels.insert("c".into(), 1);
        assert_eq!(s.labels_at(0), vec!["a", "b"]);
        assert_eq!(s.labels_at(2), Vec::<&str>::new());
    }
}
