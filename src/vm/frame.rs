//! One run of a script: program counter, call stack and the host state.

use super::binder::{self, Args, Param};
use super::env::Environment;
use super::error::RuntimeError;
use super::value::{self, Value};
use super::{Flow, Runtime};
use crate::model::{Flag, Variable};
use crate::processor::ast::{Expr, Script};
use tracing::trace;

pub const CALL_STACK_DEPTH: usize = 16;

/// Fixed-depth stack of return addresses.
#[derive(Debug, Clone)]
pub struct CallStack {
    slots: [usize; CALL_STACK_DEPTH],
    sp: usize,
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CallStack {
    pub fn new() -> Self {
        Self {
            slots: [0; CALL_STACK_DEPTH],
            sp: 0,
        }
    }

    pub fn push(&mut self, pc: usize) -> Result<(), RuntimeError> {
        if self.sp == CALL_STACK_DEPTH {
            return Err(RuntimeError::CallStackOverflow {
                depth: CALL_STACK_DEPTH,
                pc,
            });
        }
        self.slots[self.sp] = pc;
        self.sp += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<usize> {
        if self.sp == 0 {
            return None;
        }
        self.sp -= 1;
        Some(self.slots[self.sp])
    }

    pub fn len(&self) -> usize {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }
}

pub struct Frame<'a, E> {
    runtime: &'a Runtime<E>,
    env: &'a mut E,
    pc: usize,
    stack: CallStack,
}

impl<'a, E: Environment> Frame<'a, E> {
    pub(crate) fn new(runtime: &'a Runtime<E>, env: &'a mut E, pc: usize) -> Self {
        Self {
            runtime,
            env,
            pc,
            stack: CallStack::new(),
        }
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn script(&self) -> &'a Script {
        self.runtime.script()
    }

    pub fn end_of_script(&self) -> usize {
        self.runtime.script().end_of_script()
    }

    pub fn is_finished(&self) -> bool {
        self.pc >= self.end_of_script()
    }

    /// Number of pending `call`s.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn env(&self) -> &E {
        &*self.env
    }

    pub fn env_mut(&mut self) -> &mut E {
        &mut *self.env
    }

    // ── variable primitives ─────────────────────────────────────────────

    pub fn get(&self, variable: Variable) -> i32 {
        self.env.get(variable)
    }

    pub fn set(&mut self, variable: Variable, value: i32) {
        self.env.set(variable, value);
    }

    pub fn copy(&mut self, from: Variable, to: Variable) {
        self.env.copy(from, to);
    }

    pub fn add(&mut self, variable: Variable, delta: i32) {
        let value = self.get(variable).wrapping_add(delta);
        self.set(variable, value);
    }

    /// Flags are bit masks over the variable's stored value.
    pub fn set_flag(&mut self, variable: Variable, flag: Flag) {
        let value = self.get(variable) | flag.0 as i32;
        self.set(variable, value);
    }

    pub fn clear_flag(&mut self, variable: Variable, flag: Flag) {
        let value = self.get(variable) & !(flag.0 as i32);
        self.set(variable, value);
    }

    pub fn test_flag(&self, variable: Variable, flag: Flag) -> bool {
        self.get(variable) & flag.0 as i32 != 0
    }

    // ── control flow primitives ─────────────────────────────────────────

    /// Jump to `addr`, remembering the command after this one. Address 0
    /// means "nothing to call" and ends the script instead.
    pub fn call(&mut self, addr: usize) -> Result<Flow, RuntimeError> {
        if addr == 0 {
            return Ok(Flow::Jump(self.end_of_script()));
        }
        self.stack.push(self.pc + 1)?;
        Ok(Flow::Jump(addr))
    }

    /// Jump back to the last return address, or to the end of the script
    /// when nothing is pending.
    pub fn ret(&mut self) -> Flow {
        match self.stack.pop() {
            Some(pc) => Flow::Jump(pc),
            None => Flow::Jump(self.end_of_script()),
        }
    }

    // ── argument helpers for handlers ───────────────────────────────────

    pub fn evaluate(&self, args: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        Ok(value::evaluate_all(args)?)
    }

    pub fn bind(&self, signature: &[Param], args: &[Expr]) -> Result<Args, RuntimeError> {
        let values = self.evaluate(args)?;
        Ok(binder::bind(signature, &values)?)
    }

    // ── fetch / dispatch ────────────────────────────────────────────────

    /// Execute the command at `pc`. Returns `false` once the frame has run
    /// off the end of the script.
    pub fn step(&mut self) -> Result<bool, RuntimeError> {
        let runtime = self.runtime;
        let Some(cmd) = runtime.script().command(self.pc) else {
            return Ok(false);
        };
        let handler = runtime
            .handler(cmd.ty)
            .ok_or(RuntimeError::UnboundCommand(cmd.ty))?;

        trace!(pc = self.pc, command = %cmd.ty, "dispatch");
        self.pc = match handler(self, &cmd.args)? {
            Flow::Next => self.pc + 1,
            Flow::Jump(target) => target,
        };
        Ok(!self.is_finished())
    }

    /// Step until the program counter reaches the end of the script.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        while self.step()? {}
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_stack_bounds() {
        let mut stack = CallStack::new();
        assert_eq!(stack.pop(), None);
        for pc in 0..CALL_STACK_DEPTH {
            stack.push(pc).unwrap();
        }
        assert_eq!(
            stack.push(99).unwrap_err(),
            RuntimeError::CallStackOverflow {
                depth: CALL_STACK_DEPTH,
                pc: 99
            }
        );
        assert_eq!(stack.len(), CALL_STACK_DEPTH);
        assert_eq!(stack.pop(), Some(CALL_STACK_DEPTH - 1));
        assert_eq!(stack.len(), CALL_STACK_DEPTH - 1);
    }
}
