//! Handlers for the built-in command types.
//!
//! Each handler declares the arguments it reads as a static signature and
//! binds them through the same binder host commands use.

use super::binder::{Domain, Param};
use super::env::Environment;
use super::error::RuntimeError;
use super::frame::Frame;
use super::{Flow, RuntimeBuilder};
use crate::model::CommandType;
use crate::processor::ast::Expr;

type Result<T> = std::result::Result<T, RuntimeError>;

const ADDRESS: &[Param] = &[Param::new(Domain::Address)];
const VAR_INT: &[Param] = &[Param::new(Domain::Variable), Param::new(Domain::Int)];
const VAR_VAR: &[Param] = &[Param::new(Domain::Variable), Param::new(Domain::Variable)];
const VAR_FLAG: &[Param] = &[Param::new(Domain::Variable), Param::new(Domain::Flag)];
const VAR_INT_ADDRESS: &[Param] = &[
    Param::new(Domain::Variable),
    Param::new(Domain::Int),
    Param::new(Domain::Address),
];
const VAR_FLAG_ADDRESS: &[Param] = &[
    Param::new(Domain::Variable),
    Param::new(Domain::Flag),
    Param::new(Domain::Address),
];

pub(crate) fn install<E: Environment + 'static>(builder: &mut RuntimeBuilder<E>) {
    builder
        .register(CommandType::NOP, nop::<E>)
        .register(CommandType::HOST_CALL, host_call::<E>)
        .register(CommandType::GOTO, goto::<E>)
        .register(CommandType::SET, set::<E>)
        .register(CommandType::COPY, copy::<E>)
        .register(CommandType::SET_FLAG, set_flag::<E>)
        .register(CommandType::CLEAR_FLAG, clear_flag::<E>)
        .register(CommandType::ADD, add::<E>)
        .register(CommandType::CALL, call::<E>)
        .register(CommandType::RET, ret::<E>)
        .register(CommandType::JUMP_IF, jump_if::<E>)
        .register(CommandType::JUMP_IF_FLAG, jump_if_flag::<E>)
        .register(CommandType::JUMP_IF_NOT_FLAG, jump_if_not_flag::<E>);
}

pub(crate) fn nop<E: Environment>(_: &mut Frame<'_, E>, _: &[Expr]) -> Result<Flow> {
    Ok(Flow::Next)
}

fn host_call<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let values = frame.evaluate(args)?;
    frame.env_mut().host_call(&values)?;
    Ok(Flow::Next)
}

fn goto<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(ADDRESS, args)?;
    Ok(Flow::Jump(a.address(0)?))
}

fn set<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(VAR_INT, args)?;
    frame.set(a.variable(0)?, a.int(1)?);
    Ok(Flow::Next)
}

fn copy<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(VAR_VAR, args)?;
    frame.copy(a.variable(0)?, a.variable(1)?);
    Ok(Flow::Next)
}

fn set_flag<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(VAR_FLAG, args)?;
    frame.set_flag(a.variable(0)?, a.flag(1)?);
    Ok(Flow::Next)
}

fn clear_flag<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(VAR_FLAG, args)?;
    frame.clear_flag(a.variable(0)?, a.flag(1)?);
    Ok(Flow::Next)
}

fn add<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(VAR_INT, args)?;
    frame.add(a.variable(0)?, a.int(1)?);
    Ok(Flow::Next)
}

fn call<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(ADDRESS, args)?;
    frame.call(a.address(0)?)
}

fn ret<E: Environment>(frame: &mut Frame<'_, E>, _: &[Expr]) -> Result<Flow> {
    Ok(frame.ret())
}

fn jump_if<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(VAR_INT_ADDRESS, args)?;
    let hit = frame.get(a.variable(0)?) == a.int(1)?;
    Ok(Flow::jump_if(hit, a.address(2)?))
}

fn jump_if_flag<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(VAR_FLAG_ADDRESS, args)?;
    let hit = frame.test_flag(a.variable(0)?, a.flag(1)?);
    Ok(Flow::jump_if(hit, a.address(2)?))
}

fn jump_if_not_flag<E: Environment>(frame: &mut Frame<'_, E>, args: &[Expr]) -> Result<Flow> {
    let a = frame.bind(VAR_FLAG_ADDRESS, args)?;
    let hit = !frame.test_flag(a.variable(0)?, a.flag(1)?);
    Ok(Flow::jump_if(hit, a.address(2)?))
}
