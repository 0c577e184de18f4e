use super::Instruction;
use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::opcode;
use crate::stack_item::StackItem;

pub(super) fn invert(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let x = engine.pop_int()?;
    engine.push_int(!x)
}

/// `AND`, `OR`, `XOR` on two's-complement integers.
pub(super) fn binary(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let b = engine.pop_int()?;
    let a = engine.pop_int()?;
    let result = match ins.opcode {
        opcode::AND => a & b,
        opcode::OR => a | b,
        _ => a ^ b,
    };
    engine.push_int(result)
}

pub(super) fn equal(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let b = engine.pop()?;
    let a = engine.pop()?;
    engine.push(StackItem::Boolean(a.equals(&b)))
}
