use super::Instruction;
use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::opcode;
use crate::stack_item::StackItem;
use num_bigint::{BigInt, Sign};
use num_traits::{One, Signed, Zero};

/// Largest shift `SHL`/`SHR` accept.
const MAX_SHIFT: usize = 256;

pub(super) fn unary(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let x = engine.pop_int()?;
    let result = match ins.opcode {
        opcode::INC => x + 1,
        opcode::DEC => x - 1,
        opcode::SIGN => match x.sign() {
            Sign::Minus => BigInt::from(-1),
            Sign::NoSign => BigInt::zero(),
            Sign::Plus => BigInt::one(),
        },
        opcode::NEGATE => -x,
        _ => x.abs(),
    };
    engine.push_int(result)
}

pub(super) fn not(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let x = engine.pop_bool()?;
    engine.push(StackItem::Boolean(!x))
}

pub(super) fn nz(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let x = engine.pop_int()?;
    engine.push(StackItem::Boolean(!x.is_zero()))
}

/// Division truncates toward zero and the remainder takes the sign of the
/// dividend.
pub(super) fn binary(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let b = engine.pop_int()?;
    let a = engine.pop_int()?;
    let result = match ins.opcode {
        opcode::ADD => a + b,
        opcode::SUB => a - b,
        opcode::MUL => a * b,
        opcode::DIV | opcode::MOD if b.is_zero() => return Err(VmError::DivisionByZero),
        opcode::DIV => a / b,
        opcode::MOD => a % b,
        opcode::MIN => a.min(b),
        _ => a.max(b),
    };
    engine.push_int(result)
}

pub(super) fn shift(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let n = engine.pop_index()?;
    if n > MAX_SHIFT {
        return Err(VmError::InvalidOperand(format!("shift {n}")));
    }
    let x = engine.pop_int()?;
    let result = if ins.opcode == opcode::SHL { x << n } else { x >> n };
    engine.push_int(result)
}

pub(super) fn bool_binary(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let b = engine.pop_bool()?;
    let a = engine.pop_bool()?;
    let result = if ins.opcode == opcode::BOOLAND { a && b } else { a || b };
    engine.push(StackItem::Boolean(result))
}

pub(super) fn compare(engine: &mut ExecutionEngine, ins: Instruction) -> Result<(), VmError> {
    let b = engine.pop_int()?;
    let a = engine.pop_int()?;
    let result = match ins.opcode {
        opcode::NUMEQUAL => a == b,
        opcode::NUMNOTEQUAL => a != b,
        opcode::LT => a < b,
        opcode::GT => a > b,
        opcode::LTE => a <= b,
        _ => a >= b,
    };
    engine.push(StackItem::Boolean(result))
}

/// `x a b WITHIN` is `a <= x < b`.
pub(super) fn within(engine: &mut ExecutionEngine, _: Instruction) -> Result<(), VmError> {
    let upper = engine.pop_int()?;
    let lower = engine.pop_int()?;
    let x = engine.pop_int()?;
    engine.push(StackItem::Boolean(lower <= x && x < upper))
}
