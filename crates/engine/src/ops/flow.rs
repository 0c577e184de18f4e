use super::Instruction;
use crate::context::ExecutionContext;
use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::opcode;
use meridian_types::ProgramHash;
use std::rc::Rc;
use tracing::trace;

pub(super) fn nop(_: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    Ok(())
}

/// Read the 16-bit offset operand and resolve it against the opcode
/// position. The target may equal the script length.
fn read_target(engine: &mut ExecutionEngine, ins: Instruction) -> Result<usize, VmError> {
    let context = engine.current_context_mut()?;
    let offset = context.read_i16()?;
    let len = context.script().len();
    let target = i64::try_from(ins.position).unwrap_or(i64::MAX) + i64::from(offset);
    usize::try_from(target)
        .ok()
        .filter(|t| *t <= len)
        .ok_or(VmError::InvalidJump { target, len })
}

pub(super) fn jump(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let target = read_target(engine, ins)?;
    let taken = match ins.opcode {
        opcode::JMPIF => engine.pop_bool()?,
        opcode::JMPIFNOT => !engine.pop_bool()?,
        _ => true,
    };
    if taken {
        engine.current_context_mut()?.instruction_pointer = target;
    }
    Ok(())
}

/// Enter a new frame of the same script at the target; the caller resumes
/// after the offset operand.
pub(super) fn call(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let target = read_target(engine, ins)?;
    let callee = engine.current_context()?.fork(target);
    trace!(from = ins.position, to = target, "call");
    engine.enter_context(callee, false)
}

pub(super) fn ret(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    engine.return_from_context()
}

/// `APPCALL` and `TAILCALL`. An all-zero operand takes the target hash from
/// the evaluation stack.
pub(super) fn app_call(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let operand = engine.current_context_mut()?.read_bytes(20)?.to_vec();
    let hash_bytes = if operand.iter().all(|b| *b == 0) {
        engine.pop_bytes()?
    } else {
        operand
    };
    let script_hash = ProgramHash::from_slice(&hash_bytes)
        .map_err(|e| VmError::InvalidOperand(format!("script hash: {e}")))?;

    let table = engine
        .script_table()
        .cloned()
        .ok_or(VmError::NoScriptTable(script_hash))?;
    let script = table
        .get_script(&script_hash)
        .ok_or(VmError::ScriptNotFound(script_hash))?;

    let tail = ins.opcode == opcode::TAILCALL;
    trace!(script = %script_hash, tail, "app call");
    let context = ExecutionContext::new(Rc::from(script), false);
    engine.enter_context(context, tail)
}

pub(super) fn syscall(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let name_bytes = engine.current_context_mut()?.read_var_bytes()?;
    let name = String::from_utf8(name_bytes)
        .map_err(|_| VmError::InvalidOperand("syscall name is not utf-8".into()))?;
    let service = engine.interop_service();
    if service.invoke(&name, engine)? {
        Ok(())
    } else {
        Err(VmError::UnknownSyscall(name))
    }
}
