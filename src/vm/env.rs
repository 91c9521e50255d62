use super::error::RuntimeError;
use super::value::Value;
use crate::model::Variable;
use std::collections::BTreeMap;
use tracing::info;

/// Host state a frame runs against.
///
/// Built-in commands only ever touch variables through `get`/`set`/`copy`;
/// everything else about the host is reached from host-defined command
/// handlers through `Frame::env_mut`.
pub trait Environment {
    fn get(&self, variable: Variable) -> i32;

    fn set(&mut self, variable: Variable, value: i32);

    fn copy(&mut self, from: Variable, to: Variable) {
        let value = self.get(from);
        self.set(to, value);
    }

    /// Target of the built-in `hostCall` command. `args` are the evaluated
    /// arguments; bind them with `binder::bind`.
    fn host_call(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        let _ = args;
        Err(RuntimeError::HostCallUnsupported)
    }
}

/// Variables kept in a map; unset variables read as 0. Host calls are
/// recorded rather than acted upon.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryEnvironment {
    values: BTreeMap<Variable, i32>,
    pub host_calls: Vec<Vec<Value>>,
}

impl MemoryEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn values(&self) -> &BTreeMap<Variable, i32> {
        &self.values
    }
}

impl Environment for MemoryEnvironment {
    fn get(&self, variable: Variable) -> i32 {
        self.values.get(&variable).copied().unwrap_or(0)
    }

    fn set(&mut self, variable: Variable, value: i32) {
        self.values.insert(variable, value);
    }

    fn host_call(&mut self, args: &[Value]) -> Result<(), RuntimeError> {
        let rendered: Vec<String> = args.iter().map(Value::to_string).collect();
        info!(args = %rendered.join(", "), "host call");
        self.host_calls.push(args.to_vec());
        Ok(())
    }
}
