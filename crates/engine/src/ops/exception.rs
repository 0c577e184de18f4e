use super::Instruction;
use crate::engine::ExecutionEngine;
use crate::error::VmError;

pub(super) fn throw(_: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    Err(VmError::Thrown)
}

pub(super) fn throw_if_not(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    if engine.pop_bool()? {
        Ok(())
    } else {
        Err(VmError::Thrown)
    }
}
