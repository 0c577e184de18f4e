use super::Instruction;
use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::opcode;
use crate::stack_item::StackItem;
use num_bigint::BigInt;

fn out_of_range(index: usize, len: usize) -> VmError {
    VmError::IndexOutOfRange {
        index: i64::try_from(index).unwrap_or(i64::MAX),
        len,
    }
}

pub(super) fn array_size(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let item = engine.pop()?;
    let size = match &item {
        StackItem::Array(list) | StackItem::Struct(list) => list.borrow().len(),
        other => other.to_bytes()?.len(),
    };
    engine.push(StackItem::Integer(BigInt::from(size)))
}

/// Pop a count, then that many items; the first popped becomes index 0.
pub(super) fn pack(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let size = engine.pop_index()?;
    engine.check_array_size(size)?;
    let depth = engine.eval_stack()?.len();
    if size > depth {
        return Err(VmError::StackUnderflow);
    }
    let mut items = Vec::with_capacity(size);
    for _ in 0..size {
        items.push(engine.pop()?);
    }
    engine.push(StackItem::new_array(items))
}

/// Push the elements last-first, then the element count.
pub(super) fn unpack(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let item = engine.pop()?;
    let items: Vec<StackItem> = item.as_list()?.borrow().clone();
    let count = items.len();
    for element in items.into_iter().rev() {
        engine.push(element)?;
    }
    engine.push(StackItem::Integer(BigInt::from(count)))
}

pub(super) fn pick_item(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let index = engine.pop_index()?;
    let container = engine.pop()?;
    let list = container.as_list()?.borrow();
    let element = match list.get(index) {
        Some(element) => element.clone(),
        None => return Err(out_of_range(index, list.len())),
    };
    drop(list);
    engine.push(element)
}

/// Pops value, then index, then container. Stored structs are copied.
pub(super) fn set_item(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let value = engine.pop()?.copy_for_storage();
    let index = engine.pop_index()?;
    let container = engine.pop()?;
    let mut list = container.as_list()?.borrow_mut();
    let len = list.len();
    let slot = list.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
    *slot = value;
    Ok(())
}

/// `NEWARRAY`/`NEWSTRUCT`: from a count, filled with `false`, or by
/// converting an existing array or struct.
pub(super) fn new_array(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let item = engine.pop()?;
    let items = match &item {
        StackItem::Array(list) | StackItem::Struct(list) => list.borrow().clone(),
        other => {
            let count = other.to_bigint()?;
            let count = usize::try_from(&count)
                .map_err(|_| VmError::InvalidOperand(format!("array size {count}")))?;
            engine.check_array_size(count)?;
            vec![StackItem::Boolean(false); count]
        }
    };
    let array = if ins.opcode == opcode::NEWSTRUCT {
        StackItem::new_struct(items)
    } else {
        StackItem::new_array(items)
    };
    engine.push(array)
}

pub(super) fn append(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let value = engine.pop()?.copy_for_storage();
    let container = engine.pop()?;
    let len = container.as_list()?.borrow().len();
    engine.check_array_size(len + 1)?;
    container.as_list()?.borrow_mut().push(value);
    Ok(())
}

pub(super) fn reverse(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let container = engine.pop()?;
    container.as_list()?.borrow_mut().reverse();
    Ok(())
}

pub(super) fn remove(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let index = engine.pop_index()?;
    let container = engine.pop()?;
    let mut list = container.as_list()?.borrow_mut();
    if index >= list.len() {
        return Err(out_of_range(index, list.len()));
    }
    list.remove(index);
    Ok(())
}
