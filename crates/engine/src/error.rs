use meridian_types::ProgramHash;
use thiserror::Error;

/// Reasons the VM faults.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("no execution context")]
    NoContext,

    #[error("unknown opcode {opcode:#04x} at {position}")]
    UnknownOpcode { opcode: u8, position: usize },

    #[error("opcode {opcode:#04x} at {position} is not a push in a push-only script")]
    PushOnlyViolation { opcode: u8, position: usize },

    #[error("read past end of script at {position}")]
    ScriptOverrun { position: usize },

    #[error("jump target {target} outside script of length {len}")]
    InvalidJump { target: i64, len: usize },

    #[error("stack underflow")]
    StackUnderflow,

    #[error("stack size {size} exceeds limit {limit}")]
    StackOverflow { size: usize, limit: usize },

    #[error("item of {size} bytes exceeds limit {limit}")]
    ItemTooLarge { size: usize, limit: usize },

    #[error("array of {size} items exceeds limit {limit}")]
    ArrayTooLarge { size: usize, limit: usize },

    #[error("invocation depth exceeds limit {0}")]
    InvocationDepthExceeded(usize),

    #[error("step budget of {0} instructions exhausted")]
    StepLimitExceeded(u64),

    #[error("execution aborted")]
    Aborted,

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("invalid operand: {0}")]
    InvalidOperand(String),

    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange { index: i64, len: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown syscall {0}")]
    UnknownSyscall(String),

    #[error("no script table to resolve {0}")]
    NoScriptTable(ProgramHash),

    #[error("script {0} not found")]
    ScriptNotFound(ProgramHash),

    #[error("no script container")]
    NoScriptContainer,

    #[error("cannot serialize {0}")]
    NotSerializable(&'static str),

    #[error("script threw")]
    Thrown,

    #[error("execution stopped at a break point")]
    Break,
}
