use super::Instruction;
use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::stack_item::StackItem;
use num_bigint::BigInt;

pub(super) fn cat(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let tail = engine.pop_bytes()?;
    let mut head = engine.pop_bytes()?;
    engine.check_item_size(head.len() + tail.len())?;
    head.extend_from_slice(&tail);
    engine.push(StackItem::ByteArray(head))
}

/// Out-of-range index or count clips to the available bytes.
pub(super) fn substr(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let count = engine.pop_index()?;
    let index = engine.pop_index()?;
    let bytes = engine.pop_bytes()?;
    let slice: Vec<u8> = bytes.into_iter().skip(index).take(count).collect();
    engine.push(StackItem::ByteArray(slice))
}

pub(super) fn left(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let count = engine.pop_index()?;
    let mut bytes = engine.pop_bytes()?;
    bytes.truncate(count);
    engine.push(StackItem::ByteArray(bytes))
}

pub(super) fn right(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let count = engine.pop_index()?;
    let bytes = engine.pop_bytes()?;
    if count > bytes.len() {
        return Err(VmError::IndexOutOfRange {
            index: i64::try_from(count).unwrap_or(i64::MAX),
            len: bytes.len(),
        });
    }
    engine.push(StackItem::ByteArray(bytes[bytes.len() - count..].to_vec()))
}

pub(super) fn size(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let len = engine.pop_bytes()?.len();
    engine.push(StackItem::Integer(BigInt::from(len)))
}
