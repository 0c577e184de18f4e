//! Opcode handlers and the dispatch table that routes to them.

mod array;
mod arith;
mod bitwise;
mod crypto;
mod exception;
mod flow;
mod push;
mod splice;
mod stack;

use crate::engine::ExecutionEngine;
use crate::error::VmError;
use crate::opcode::*;
use std::sync::OnceLock;

/// The opcode being executed and where it sits in the script. The
/// instruction pointer already points past the opcode byte.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Instruction {
    pub opcode: u8,
    pub position: usize,
}

pub(crate) type OpHandler = fn(&mut ExecutionEngine, Instruction) -> Result<(), VmError>;

/// Handler per opcode byte; `None` for unassigned bytes.
pub(crate) fn dispatch_table() -> &'static [Option<OpHandler>; 256] {
    static TABLE: OnceLock<[Option<OpHandler>; 256]> = OnceLock::new();
    TABLE.get_or_init(build_table)
}

fn build_table() -> [Option<OpHandler>; 256] {
    let mut t: [Option<OpHandler>; 256] = [None; 256];

    t[usize::from(PUSH0)] = Some(push::push_empty);
    for op in PUSHBYTES1..=PUSHBYTES75 {
        t[usize::from(op)] = Some(push::push_bytes);
    }
    t[usize::from(PUSHDATA1)] = Some(push::push_data);
    t[usize::from(PUSHDATA2)] = Some(push::push_data);
    t[usize::from(PUSHDATA4)] = Some(push::push_data);
    t[usize::from(PUSHM1)] = Some(push::push_small_int);
    for op in PUSH1..=PUSH16 {
        t[usize::from(op)] = Some(push::push_small_int);
    }

    t[usize::from(NOP)] = Some(flow::nop);
    t[usize::from(JMP)] = Some(flow::jump);
    t[usize::from(JMPIF)] = Some(flow::jump);
    t[usize::from(JMPIFNOT)] = Some(flow::jump);
    t[usize::from(CALL)] = Some(flow::call);
    t[usize::from(RET)] = Some(flow::ret);
    t[usize::from(APPCALL)] = Some(flow::app_call);
    t[usize::from(TAILCALL)] = Some(flow::app_call);
    t[usize::from(SYSCALL)] = Some(flow::syscall);

    t[usize::from(DUPFROMALTSTACK)] = Some(stack::dup_from_alt);
    t[usize::from(TOALTSTACK)] = Some(stack::to_alt);
    t[usize::from(FROMALTSTACK)] = Some(stack::from_alt);
    t[usize::from(XDROP)] = Some(stack::xdrop);
    t[usize::from(XSWAP)] = Some(stack::xswap);
    t[usize::from(XTUCK)] = Some(stack::xtuck);
    t[usize::from(DEPTH)] = Some(stack::depth);
    t[usize::from(DROP)] = Some(stack::drop);
    t[usize::from(DUP)] = Some(stack::dup);
    t[usize::from(NIP)] = Some(stack::nip);
    t[usize::from(OVER)] = Some(stack::over);
    t[usize::from(PICK)] = Some(stack::pick);
    t[usize::from(ROLL)] = Some(stack::roll);
    t[usize::from(ROT)] = Some(stack::rot);
    t[usize::from(SWAP)] = Some(stack::swap);
    t[usize::from(TUCK)] = Some(stack::tuck);

    t[usize::from(CAT)] = Some(splice::cat);
    t[usize::from(SUBSTR)] = Some(splice::substr);
    t[usize::from(LEFT)] = Some(splice::left);
    t[usize::from(RIGHT)] = Some(splice::right);
    t[usize::from(SIZE)] = Some(splice::size);

    t[usize::from(INVERT)] = Some(bitwise::invert);
    t[usize::from(AND)] = Some(bitwise::binary);
    t[usize::from(OR)] = Some(bitwise::binary);
    t[usize::from(XOR)] = Some(bitwise::binary);
    t[usize::from(EQUAL)] = Some(bitwise::equal);

    for op in [INC, DEC, SIGN, NEGATE, ABS] {
        t[usize::from(op)] = Some(arith::unary);
    }
    t[usize::from(NOT)] = Some(arith::not);
    t[usize::from(NZ)] = Some(arith::nz);
    for op in [ADD, SUB, MUL, DIV, MOD, MIN, MAX] {
        t[usize::from(op)] = Some(arith::binary);
    }
    t[usize::from(SHL)] = Some(arith::shift);
    t[usize::from(SHR)] = Some(arith::shift);
    t[usize::from(BOOLAND)] = Some(arith::bool_binary);
    t[usize::from(BOOLOR)] = Some(arith::bool_binary);
    for op in [NUMEQUAL, NUMNOTEQUAL, LT, GT, LTE, GTE] {
        t[usize::from(op)] = Some(arith::compare);
    }
    t[usize::from(WITHIN)] = Some(arith::within);

    t[usize::from(SHA1)] = Some(crypto::digest);
    t[usize::from(SHA256)] = Some(crypto::digest);
    t[usize::from(HASH160)] = Some(crypto::digest);
    t[usize::from(HASH256)] = Some(crypto::digest);
    t[usize::from(CHECKSIG)] = Some(crypto::check_sig);
    t[usize::from(CHECKMULTISIG)] = Some(crypto::check_multisig);

    t[usize::from(ARRAYSIZE)] = Some(array::array_size);
    t[usize::from(PACK)] = Some(array::pack);
    t[usize::from(UNPACK)] = Some(array::unpack);
    t[usize::from(PICKITEM)] = Some(array::pick_item);
    t[usize::from(SETITEM)] = Some(array::set_item);
    t[usize::from(NEWARRAY)] = Some(array::new_array);
    t[usize::from(NEWSTRUCT)] = Some(array::new_array);
    t[usize::from(APPEND)] = Some(array::append);
    t[usize::from(REVERSE)] = Some(array::reverse);
    t[usize::from(REMOVE)] = Some(array::remove);

    t[usize::from(THROW)] = Some(exception::throw);
    t[usize::from(THROWIFNOT)] = Some(exception::throw_if_not);

    t
}
