//! Opcode byte values.

// Constants
pub const PUSH0: u8 = 0x00;
pub const PUSHF: u8 = PUSH0;
pub const PUSHBYTES1: u8 = 0x01;
pub const PUSHBYTES75: u8 = 0x4B;
pub const PUSHDATA1: u8 = 0x4C;
pub const PUSHDATA2: u8 = 0x4D;
pub const PUSHDATA4: u8 = 0x4E;
pub const PUSHM1: u8 = 0x4F;
pub const PUSH1: u8 = 0x51;
pub const PUSHT: u8 = PUSH1;
pub const PUSH2: u8 = 0x52;
pub const PUSH3: u8 = 0x53;
pub const PUSH16: u8 = 0x60;

// Flow control
pub const NOP: u8 = 0x61;
pub const JMP: u8 = 0x62;
pub const JMPIF: u8 = 0x63;
pub const JMPIFNOT: u8 = 0x64;
pub const CALL: u8 = 0x65;
pub const RET: u8 = 0x66;
pub const APPCALL: u8 = 0x67;
pub const SYSCALL: u8 = 0x68;
pub const TAILCALL: u8 = 0x69;

// Stack
pub const DUPFROMALTSTACK: u8 = 0x6A;
pub const TOALTSTACK: u8 = 0x6B;
pub const FROMALTSTACK: u8 = 0x6C;
pub const XDROP: u8 = 0x6D;
pub const XSWAP: u8 = 0x72;
pub const XTUCK: u8 = 0x73;
pub const DEPTH: u8 = 0x74;
pub const DROP: u8 = 0x75;
pub const DUP: u8 = 0x76;
pub const NIP: u8 = 0x77;
pub const OVER: u8 = 0x78;
pub const PICK: u8 = 0x79;
pub const ROLL: u8 = 0x7A;
pub const ROT: u8 = 0x7B;
pub const SWAP: u8 = 0x7C;
pub const TUCK: u8 = 0x7D;

// Splice
pub const CAT: u8 = 0x7E;
pub const SUBSTR: u8 = 0x7F;
pub const LEFT: u8 = 0x80;
pub const RIGHT: u8 = 0x81;
pub const SIZE: u8 = 0x82;

// Bitwise logic
pub const INVERT: u8 = 0x83;
pub const AND: u8 = 0x84;
pub const OR: u8 = 0x85;
pub const XOR: u8 = 0x86;
pub const EQUAL: u8 = 0x87;

// Arithmetic
pub const INC: u8 = 0x8B;
pub const DEC: u8 = 0x8C;
pub const SIGN: u8 = 0x8D;
pub const NEGATE: u8 = 0x8F;
pub const ABS: u8 = 0x90;
pub const NOT: u8 = 0x91;
pub const NZ: u8 = 0x92;
pub const ADD: u8 = 0x93;
pub const SUB: u8 = 0x94;
pub const MUL: u8 = 0x95;
pub const DIV: u8 = 0x96;
pub const MOD: u8 = 0x97;
pub const SHL: u8 = 0x98;
pub const SHR: u8 = 0x99;
pub const BOOLAND: u8 = 0x9A;
pub const BOOLOR: u8 = 0x9B;
pub const NUMEQUAL: u8 = 0x9C;
pub const NUMNOTEQUAL: u8 = 0x9E;
pub const LT: u8 = 0x9F;
pub const GT: u8 = 0xA0;
pub const LTE: u8 = 0xA1;
pub const GTE: u8 = 0xA2;
pub const MIN: u8 = 0xA3;
pub const MAX: u8 = 0xA4;
pub const WITHIN: u8 = 0xA5;

// Crypto
pub const SHA1: u8 = 0xA7;
pub const SHA256: u8 = 0xA8;
pub const HASH160: u8 = 0xA9;
pub const HASH256: u8 = 0xAA;
pub const CHECKSIG: u8 = 0xAC;
pub const CHECKMULTISIG: u8 = 0xAE;

// Arrays
pub const ARRAYSIZE: u8 = 0xC0;
pub const PACK: u8 = 0xC1;
pub const UNPACK: u8 = 0xC2;
pub const PICKITEM: u8 = 0xC3;
pub const SETITEM: u8 = 0xC4;
pub const NEWARRAY: u8 = 0xC5;
pub const NEWSTRUCT: u8 = 0xC6;
pub const APPEND: u8 = 0xC8;
pub const REVERSE: u8 = 0xC9;
pub const REMOVE: u8 = 0xCA;

// Exceptions
pub const THROW: u8 = 0xF0;
pub const THROWIFNOT: u8 = 0xF1;

/// Mnemonic for tracing output.
pub fn name(op: u8) -> &'static str {
    match op {
        PUSH0 => "PUSH0",
        PUSHBYTES1..=PUSHBYTES75 => "PUSHBYTES",
        PUSHDATA1 => "PUSHDATA1",
        PUSHDATA2 => "PUSHDATA2",
        PUSHDATA4 => "PUSHDATA4",
        PUSHM1 => "PUSHM1",
        PUSH1..=PUSH16 => "PUSHN",
        NOP => "NOP",
        JMP => "JMP",
        JMPIF => "JMPIF",
        JMPIFNOT => "JMPIFNOT",
        CALL => "CALL",
        RET => "RET",
        APPCALL => "APPCALL",
        SYSCALL => "SYSCALL",
        TAILCALL => "TAILCALL",
        DUPFROMALTSTACK => "DUPFROMALTSTACK",
        TOALTSTACK => "TOALTSTACK",
        FROMALTSTACK => "FROMALTSTACK",
        XDROP => "XDROP",
        XSWAP => "XSWAP",
        XTUCK => "XTUCK",
        DEPTH => "DEPTH",
        DROP => "DROP",
        DUP => "DUP",
        NIP => "NIP",
        OVER => "OVER",
        PICK => "PICK",
        ROLL => "ROLL",
        ROT => "ROT",
        SWAP => "SWAP",
        TUCK => "TUCK",
        CAT => "CAT",
        SUBSTR => "SUBSTR",
        LEFT => "LEFT",
        RIGHT => "RIGHT",
        SIZE => "SIZE",
        INVERT => "INVERT",
        AND => "AND",
        OR => "OR",
        XOR => "XOR",
        EQUAL => "EQUAL",
        INC => "INC",
        DEC => "DEC",
        SIGN => "SIGN",
        NEGATE => "NEGATE",
        ABS => "ABS",
        NOT => "NOT",
        NZ => "NZ",
        ADD => "ADD",
        SUB => "SUB",
        MUL => "MUL",
        DIV => "DIV",
        MOD => "MOD",
        SHL => "SHL",
        SHR => "SHR",
        BOOLAND => "BOOLAND",
        BOOLOR => "BOOLOR",
        NUMEQUAL => "NUMEQUAL",
        NUMNOTEQUAL => "NUMNOTEQUAL",
        LT => "LT",
        GT => "GT",
        LTE => "LTE",
        GTE => "GTE",
        MIN => "MIN",
        MAX => "MAX",
        WITHIN => "WITHIN",
        SHA1 => "SHA1",
        SHA256 => "SHA256",
        HASH160 => "HASH160",
        HASH256 => "HASH256",
        CHECKSIG => "CHECKSIG",
        CHECKMULTISIG => "CHECKMULTISIG",
        ARRAYSIZE => "ARRAYSIZE",
        PACK => "PACK",
        UNPACK => "UNPACK",
        PICKITEM => "PICKITEM",
        SETITEM => "SETITEM",
        NEWARRAY => "NEWARRAY",
        NEWSTRUCT => "NEWSTRUCT",
        APPEND => "APPEND",
        REVERSE => "REVERSE",
        REMOVE => "REMOVE",
        THROW => "THROW",
        THROWIFNOT => "THROWIFNOT",
        _ => "UNKNOWN",
    }
}
