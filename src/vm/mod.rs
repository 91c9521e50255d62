//! Back end: dispatch table and execution.
//!
//! A `Runtime` owns a compiled `Script` plus one handler per command type.
//! It is read-only once built, so any number of frames may run it; each
//! frame borrows its own host `Environment`.

pub mod binder;
mod commands;
pub mod env;
pub mod error;
pub mod frame;
pub mod value;

pub use binder::{Args, Domain, Param};
pub use env::{Environment, MemoryEnvironment};
pub use error::{BindError, ConfigError, EvalError, RuntimeError};
pub use frame::{CALL_STACK_DEPTH, Frame};
pub use value::Value;

use crate::model::{CommandType, USER_COMMAND_OFFSET};
use crate::processor::ast::{Expr, Script};
use tracing::{debug, error};

/// What a handler wants the frame to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Next,
    Jump(usize),
}

impl Flow {
    pub fn jump_if(cond: bool, target: usize) -> Self {
        if cond { Flow::Jump(target) } else { Flow::Next }
    }
}

pub type Handler<E> =
    Box<dyn Fn(&mut Frame<'_, E>, &[Expr]) -> Result<Flow, RuntimeError> + Send + Sync>;

pub struct Runtime<E> {
    script: Script,
    handlers: Vec<Handler<E>>,
}

impl<E: Environment> Runtime<E> {
    pub fn script(&self) -> &Script {
        &self.script
    }

    pub fn handler(&self, ty: CommandType) -> Option<&Handler<E>> {
        self.handlers.get(ty.index())
    }

    /// Number of dispatch table slots.
    pub fn table_len(&self) -> usize {
        self.handlers.len()
    }

    pub fn frame<'a>(&'a self, pc: usize, env: &'a mut E) -> Frame<'a, E> {
        Frame::new(self, env, pc)
    }

    /// Run from `pc` until the end of the script is reached.
    pub fn start(&self, pc: usize, env: &mut E) -> Result<(), RuntimeError> {
        debug!(pc, "frame start");
        let mut frame = self.frame(pc, env);
        frame.run()?;
        debug!(pc = frame.pc(), "frame finished");
        Ok(())
    }

    /// Run from a named label.
    pub fn call(&self, label: &str, env: &mut E) -> Result<(), RuntimeError> {
        let Some(pc) = self.script.label(label) else {
            error!(label, "unknown label");
            return Err(RuntimeError::UnknownLabel(label.to_string()));
        };
        self.start(pc, env)
    }
}

/// Collects handlers for a script, then freezes them into a `Runtime`.
///
/// The built-in commands are registered up front; hosts add their own
/// types (normally at or above `USER_COMMAND_OFFSET`) with `register`.
pub struct RuntimeBuilder<E> {
    script: Script,
    slots: Vec<Option<Handler<E>>>,
}

impl<E: Environment + 'static> RuntimeBuilder<E> {
    pub fn new(script: Script) -> Self {
        let mut builder = Self {
            script,
            slots: Vec::new(),
        };
        commands::install(&mut builder);
        builder
    }

    pub fn register<F>(&mut self, ty: CommandType, handler: F) -> &mut Self
    where
        F: Fn(&mut Frame<'_, E>, &[Expr]) -> Result<Flow, RuntimeError> + Send + Sync + 'static,
    {
        let index = ty.index();
        if index >= self.slots.len() {
            self.slots.resize_with(index + 1, || None);
        }
        if self.slots[index].replace(Box::new(handler)).is_some() {
            debug!(command = %ty, "handler replaced");
        }
        self
    }

    pub fn register_all<I, F>(&mut self, handlers: I) -> &mut Self
    where
        I: IntoIterator<Item = (CommandType, F)>,
        F: Fn(&mut Frame<'_, E>, &[Expr]) -> Result<Flow, RuntimeError> + Send + Sync + 'static,
    {
        for (ty, handler) in handlers {
            self.register(ty, handler);
        }
        self
    }

    /// Freeze the table. Every slot except `none` must be bound, and every
    /// command in the script must fall inside the table.
    pub fn build(self) -> Result<Runtime<E>, ConfigError> {
        let RuntimeBuilder { script, mut slots } = self;
        let size = slots.len().max(USER_COMMAND_OFFSET.index());
        slots.resize_with(size, || None);

        let mut handlers = Vec::with_capacity(size);
        for (index, slot) in slots.into_iter().enumerate() {
            let ty = CommandType(index as u32);
            match slot {
                Some(handler) => handlers.push(handler),
                None if ty == CommandType::NONE => {
                    handlers.push(Box::new(commands::nop::<E>) as Handler<E>)
                }
                None => return Err(ConfigError::UnboundCommand(ty)),
            }
        }

        if let Some(cmd) = script.commands().iter().find(|c| c.ty.index() >= size) {
            return Err(ConfigError::UnboundCommand(cmd.ty));
        }

        debug!(slots = size, commands = script.len(), "runtime built");
        Ok(Runtime { script, handlers })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Flag, Registries, Variable};
    use crate::processor::ast::Command;
    use crate::processor::parse_source;
    use pretty_assertions::assert_eq;

    const A: Variable = Variable(0);
    const B: Variable = Variable(1);
    const R: Variable = Variable(2);
    const PRINT: CommandType = USER_COMMAND_OFFSET;

    fn registries() -> Registries {
        let mut reg = Registries::builtin();
        reg.variables.insert("a".into(), A);
        reg.variables.insert("b".into(), B);
        reg.variables.insert("r".into(), R);
        reg.flags.insert("F".into(), Flag(4));
        reg.flags.insert("G".into(), Flag(1));
        reg.commands.insert("print".into(), PRINT);
        reg
    }

    fn runtime(src: &str) -> Runtime<MemoryEnvironment> {
        let script = parse_source(src, &registries()).unwrap();
        RuntimeBuilder::new(script).build().unwrap()
    }

    fn run(src: &str) -> Result<MemoryEnvironment, RuntimeError> {
        let mut env = MemoryEnvironment::new();
        runtime(src).start(0, &mut env)?;
        Ok(env)
    }

    #[test]
    fn test_call_returns_after_call_site() {
        let env = run("call sub\nset a, 1\ngoto end\nsub:\nset b, 2\nret\nend:").unwrap();
        assert_eq!(env.get(A), 1);
        assert_eq!(env.get(B), 2);
    }

    #[test]
    fn test_end_of_script_sentinels() {
        let test_cases = vec![
            "call 0\nset a, 1",
            "ret\nset a, 1",
            "goto end\nset a, 1\nend:",
        ];
        for src in test_cases {
            let env = run(src).unwrap();
            assert_eq!(env.values().get(&A), None, "{src}");
        }
    }

    #[test]
    fn test_call_stack_overflow() {
        assert_eq!(
            run("nop\nloop:\ncall loop").unwrap_err(),
            RuntimeError::CallStackOverflow {
                depth: CALL_STACK_DEPTH,
                pc: 2
            }
        );
    }

    #[test]
    fn test_variable_commands() {
        let env = run("set a, 7\ncopy a, b\nadd b, -2\nadd r, 3 * 2").unwrap();
        assert_eq!(env.get(A), 7);
        assert_eq!(env.get(B), 5);
        assert_eq!(env.get(R), 6);
    }

    #[test]
    fn test_flags() {
        let src = "setFlag a, F\nsetFlag a, G\nclearFlag a, G\n\
                   jumpIfFlag a, F, has_f\nset r, 99\nhas_f:\n\
                   jumpIfNotFlag a, G, no_g\nset b, 99\nno_g:";
        let env = run(src).unwrap();
        assert_eq!(env.get(A), 4);
        assert_eq!(env.values().get(&R), None);
        assert_eq!(env.values().get(&B), None);
    }

    #[test]
    fn test_flag_primitives() {
        let rt = runtime("nop");
        let mut env = MemoryEnvironment::new();
        let mut frame = rt.frame(0, &mut env);

        frame.set_flag(A, Flag(4));
        assert!(frame.test_flag(A, Flag(4)));
        assert!(!frame.test_flag(A, Flag(1)));
        frame.clear_flag(A, Flag(4));
        assert!(!frame.test_flag(A, Flag(4)));
        assert_eq!(frame.get(A), 0);
    }

    #[test]
    fn test_jump_if() {
        let test_cases = vec![(3, 5), (4, 0)];
        for (start, expected) in test_cases {
            let src = format!("set a, {start}\njumpIf a, 3, hit\ngoto end\nhit:\nadd r, 5\nend:");
            let env = run(&src).unwrap();
            assert_eq!(env.get(R), expected, "a = {start}");
        }
    }

    #[test]
    fn test_host_call() {
        let env = run("hostCall 1, \"a\", b, 2 + 0.5").unwrap();
        assert_eq!(
            env.host_calls,
            vec![vec![
                Value::Int(1),
                Value::Str("a".into()),
                Value::Variable(B),
                Value::Float(2.5),
            ]]
        );
    }

    #[test]
    fn test_host_call_unsupported() {
        struct Bare;
        impl Environment for Bare {
            fn get(&self, _: Variable) -> i32 {
                0
            }
            fn set(&mut self, _: Variable, _: i32) {}
        }

        let script = parse_source("hostCall", &registries()).unwrap();
        let rt = RuntimeBuilder::<Bare>::new(script).build().unwrap();
        assert_eq!(
            rt.start(0, &mut Bare).unwrap_err(),
            RuntimeError::HostCallUnsupported
        );
    }

    #[test]
    fn test_bind_errors_surface() {
        // The parser rejects a short `set`, so build the command directly.
        let mut script = Script::new();
        script.push(Command::new(CommandType::SET, vec![Expr::Variable(A)]));
        let rt = RuntimeBuilder::<MemoryEnvironment>::new(script).build().unwrap();
        assert!(matches!(
            rt.start(0, &mut MemoryEnvironment::new()).unwrap_err(),
            RuntimeError::Bind(BindError::MissingArgument { index: 1, .. })
        ));
        assert_eq!(
            run("set a, \"x\"").unwrap_err(),
            RuntimeError::Bind(BindError::DomainMismatch {
                index: 1,
                expected: Domain::Int,
                found: "string",
            })
        );
        assert!(matches!(
            run("set a, 1 / 0").unwrap_err(),
            RuntimeError::Eval(EvalError::DivisionByZero)
        ));
    }

    #[test]
    fn test_unbound_host_command() {
        let script = parse_source("print a", &registries()).unwrap();
        assert_eq!(
            RuntimeBuilder::<MemoryEnvironment>::new(script)
                .build()
                .err(),
            Some(ConfigError::UnboundCommand(PRINT))
        );
    }

    #[test]
    fn test_gap_in_table() {
        let script = parse_source("nop", &registries()).unwrap();
        let mut builder = RuntimeBuilder::<MemoryEnvironment>::new(script);
        builder.register(CommandType(PRINT.0 + 1), commands::nop::<MemoryEnvironment>);
        assert_eq!(
            builder.build().err(),
            Some(ConfigError::UnboundCommand(PRINT))
        );
    }

    #[test]
    fn test_host_command() {
        const SIG: &[Param] = &[Param::new(Domain::Variable), Param::new(Domain::Int).or(1)];

        let script = parse_source("print a\nprint a, 10", &registries()).unwrap();
        let mut builder = RuntimeBuilder::<MemoryEnvironment>::new(script);
        builder.register(PRINT, |frame, args| {
            let a = frame.bind(SIG, args)?;
            frame.add(a.variable(0)?, a.int(1)?);
            Ok(Flow::Next)
        });
        let rt = builder.build().unwrap();
        assert_eq!(rt.table_len(), PRINT.index() + 1);

        let mut env = MemoryEnvironment::new();
        rt.start(0, &mut env).unwrap();
        assert_eq!(env.get(A), 11);
    }

    #[test]
    fn test_register_all() {
        fn bump(frame: &mut Frame<'_, MemoryEnvironment>, _: &[Expr]) -> Result<Flow, RuntimeError> {
            frame.add(R, 1);
            Ok(Flow::Next)
        }
        const SHOUT: CommandType = CommandType(PRINT.0 + 1);

        let mut reg = registries();
        reg.commands.insert("shout".into(), SHOUT);
        let script = parse_source("print\nshout a\nprint", &reg).unwrap();
        let mut builder = RuntimeBuilder::<MemoryEnvironment>::new(script);
        builder.register_all([(PRINT, bump), (SHOUT, bump)]);
        let rt = builder.build().unwrap();
        assert_eq!(rt.table_len(), SHOUT.index() + 1);

        let mut env = MemoryEnvironment::new();
        rt.start(0, &mut env).unwrap();
        assert_eq!(env.get(R), 3);
    }

    #[test]
    fn test_host_command_failure_stops_frame() {
        let script = parse_source("set a, 1\nprint a\nset b, 2", &registries()).unwrap();
        let mut builder = RuntimeBuilder::<MemoryEnvironment>::new(script);
        builder.register(PRINT, |_, _| Err(RuntimeError::Host("printer offline".into())));
        let rt = builder.build().unwrap();

        let mut env = MemoryEnvironment::new();
        let err = rt.start(0, &mut env).unwrap_err();
        assert_eq!(err, RuntimeError::Host("printer offline".into()));
        assert_eq!(err.to_string(), "host command failed: printer offline");
        assert_eq!(env.get(A), 1);
        assert_eq!(env.values().get(&B), None);
    }

    #[test]
    fn test_frames_share_runtime_across_threads() {
        let rt = runtime("left:\nadd a, 1\nadd r, 10\ngoto end\nright:\nadd b, 2\nadd r, 20\nend:");

        let (left, right) = std::thread::scope(|s| {
            let left = s.spawn(|| {
                let mut env = MemoryEnvironment::new();
                rt.call("left", &mut env).map(|_| env)
            });
            let right = s.spawn(|| {
                let mut env = MemoryEnvironment::new();
                for _ in 0..3 {
                    rt.call("right", &mut env)?;
                }
                Ok::<_, RuntimeError>(env)
            });
            (left.join().unwrap(), right.join().unwrap())
        });

        let (left, right) = (left.unwrap(), right.unwrap());
        assert_eq!((left.get(A), left.get(B), left.get(R)), (1, 0, 10));
        assert_eq!((right.get(A), right.get(B), right.get(R)), (0, 6, 60));
    }

    #[test]
    fn test_call_named_label() {
        let rt = runtime("set a, 1\nentry:\nset b, 2");
        let mut env = MemoryEnvironment::new();
        rt.call("entry", &mut env).unwrap();
        assert_eq!(env.values().get(&A), None);
        assert_eq!(env.get(B), 2);

        assert_eq!(
            rt.call("missing", &mut env).unwrap_err(),
            RuntimeError::UnknownLabel("missing".into())
        );
    }

    #[test]
    fn test_step() {
        let rt = runtime("set a, 1\ncall sub\nsub:\nret");
        let mut env = MemoryEnvironment::new();
        let mut frame = rt.frame(0, &mut env);

        assert!(frame.step().unwrap());
        assert_eq!(frame.pc(), 1);
        assert!(frame.step().unwrap());
        assert_eq!((frame.pc(), frame.depth()), (2, 1));
        assert!(frame.step().unwrap());
        assert_eq!((frame.pc(), frame.depth()), (2, 0));
        assert!(!frame.step().unwrap());
        assert!(frame.is_finished());
        assert!(!frame.step().unwrap());
    }
}
