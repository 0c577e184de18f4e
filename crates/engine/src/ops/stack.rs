use super::Instruction;
use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::stack_item::StackItem;
use num_bigint::BigInt;

pub(super) fn dup_from_alt(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let item = engine.alt_stack()?.peek(0)?.clone();
    engine.push(item)
}

pub(super) fn to_alt(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let item = engine.pop()?;
    engine.alt_stack()?.push(item);
    Ok(())
}

pub(super) fn from_alt(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let item = engine.alt_stack()?.pop()?;
    engine.push(item)
}

pub(super) fn xdrop(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let n = engine.pop_index()?;
    engine.eval_stack()?.remove(n)?;
    Ok(())
}

pub(super) fn xswap(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let n = engine.pop_index()?;
    if n == 0 {
        return Ok(());
    }
    engine.eval_stack()?.swap(0, n)
}

pub(super) fn xtuck(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let n = engine.pop_index()?;
    if n == 0 {
        return Err(VmError::InvalidOperand("XTUCK depth 0".into()));
    }
    let stack = engine.eval_stack()?;
    let top = stack.peek(0)?.clone();
    stack.insert(n, top)
}

pub(super) fn depth(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let depth = engine.eval_stack()?.len();
    engine.push(StackItem::Integer(BigInt::from(depth)))
}

pub(super) fn drop(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    engine.pop().map(|_| ())
}

pub(super) fn dup(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let item = engine.peek(0)?;
    engine.push(item)
}

pub(super) fn nip(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    engine.eval_stack()?.remove(1).map(|_| ())
}

pub(super) fn over(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let item = engine.peek(1)?;
    engine.push(item)
}

pub(super) fn pick(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let n = engine.pop_index()?;
    let item = engine.peek(n)?;
    engine.push(item)
}

/// Move the n-th item from the top to the top.
pub(super) fn roll(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let n = engine.pop_index()?;
    if n == 0 {
        return Ok(());
    }
    let item = engine.eval_stack()?.remove(n)?;
    engine.push(item)
}

pub(super) fn rot(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let item = engine.eval_stack()?.remove(2)?;
    engine.push(item)
}

pub(super) fn swap(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    engine.eval_stack()?.swap(0, 1)
}

pub(super) fn tuck(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let stack = engine.eval_stack()?;
    let top = stack.peek(0)?.clone();
    stack.insert(2, top)
}
