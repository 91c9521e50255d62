//! Label linking.
//!
//! Two jobs: `resolve` turns every remaining `Expr::Label` of the outermost
//! script into an `Expr::Address`, and `splice` copies a macro body into a
//! script while moving the macro's own label addresses to the splice offset.

use super::ast::{Command, Expr, Script};
use super::error::SyntaxError;
use std::collections::BTreeMap;
use tracing::debug;

/// Replace every label reference in `script` with its address.
///
/// Already resolved addresses are left alone, so running this twice is a
/// no-op.
pub fn resolve(script: &mut Script) -> Result<(), SyntaxError> {
    let labels = &script.labels;
    let mut linked = 0usize;
    for cmd in script.commands.iter_mut() {
        for arg in cmd.args.iter_mut() {
            linked += resolve_expr(labels, arg)?;
        }
    }
    debug!(linked, labels = labels.len(), "labels resolved");
    Ok(())
}

fn resolve_expr(labels: &BTreeMap<String, usize>, expr: &mut Expr) -> Result<usize, SyntaxError> {
    match expr {
        Expr::Label(name) => match labels.get(name.as_str()) {
            Some(pc) => {
                *expr = Expr::Address(*pc);
                Ok(1)
            }
            None => Err(SyntaxError::UnknownLabel { name: name.clone() }),
        },
        Expr::Unary(_, operand) => resolve_expr(labels, operand),
        Expr::Binary(_, left, right) => {
            Ok(resolve_expr(labels, left)? + resolve_expr(labels, right)?)
        }
        _ => Ok(0),
    }
}

/// Append a copy of `body` to `target`.
///
/// Labels declared inside the macro are relative to the macro's own start,
/// so they are rebased onto the splice offset here. Addresses already in
/// the body came from the same space (nested splices) and move the same
/// way. Every other label stays symbolic for `resolve`.
pub(crate) fn splice(target: &mut Script, body: &Script) {
    let base = target.pc();
    for cmd in body.commands() {
        let args = cmd
            .args
            .iter()
            .map(|arg| {
                let mut arg = arg.clone();
                rebase_expr(&mut arg, &body.labels, base);
                arg
            })
            .collect();
        target.push(Command::new(cmd.ty, args));
    }
}

fn rebase_expr(expr: &mut Expr, local: &BTreeMap<String, usize>, base: usize) {
    match expr {
        Expr::Label(name) => {
            if let Some(pc) = local.get(name.as_str()) {
                *expr = Expr::Address(base + pc);
            }
        }
        Expr::Address(pc) => *pc += base,
        Expr::Unary(_, operand) => rebase_expr(operand, local, base),
        Expr::Binary(_, left, right) => {
            rebase_expr(left, local, base);
            rebase_expr(right, local, base);
        }
        _ => {}
    }
}
