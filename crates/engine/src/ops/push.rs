use super::Instruction;
use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::opcode;
use crate::stack_item::StackItem;
use num_bigint::BigInt;

pub(super) fn push_empty(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    engine.push(StackItem::ByteArray(Vec::new()))
}

/// `PUSHBYTES1..=PUSHBYTES75`: the opcode is the operand length.
pub(super) fn push_bytes(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let data = engine
        .current_context_mut()?
        .read_bytes(usize::from(ins.opcode))?
        .to_vec();
    engine.push(StackItem::ByteArray(data))
}

pub(super) fn push_data(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let limit = engine.config().max_item_size;
    let context = engine.current_context_mut()?;
    let len = match ins.opcode {
        opcode::PUSHDATA1 => usize::from(context.read_u8()?),
        opcode::PUSHDATA2 => usize::from(context.read_u16()?),
        _ => {
            let len = context.read_u32()?;
            usize::try_from(len).map_err(|_| VmError::ItemTooLarge { size: usize::MAX, limit })?
        }
    };
    if len > limit {
        return Err(VmError::ItemTooLarge { size: len, limit });
    }
    let data = context.read_bytes(len)?.to_vec();
    engine.push(StackItem::ByteArray(data))
}

/// `PUSHM1` and `PUSH1..=PUSH16`.
pub(super) fn push_small_int(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let value = i64::from(ins.opcode) - i64::from(opcode::PUSH1) + 1;
    engine.push(StackItem::Integer(BigInt::from(value)))
}
