//! Script virtual machine for Meridian witnesses and contracts.
//!
//! The engine is a stack machine over [`StackItem`]s. Scripts are loaded
//! into [`ExecutionContext`] frames on an invocation stack; each frame has
//! its own evaluation and alt stacks. Host functionality reaches the VM
//! through four seams:
//!
//! - [`ScriptContainer`]: the signed object whose message `CHECKSIG` verifies
//! - [`Crypto`]: hashing and signature verification
//! - [`ScriptTable`]: contract lookup for `APPCALL`/`TAILCALL`
//! - [`InteropService`]: named `SYSCALL` handlers
//!
//! ```text
//! load_code(verification) ─► load_code(parameter, push_only)
//!        │
//!        ▼
//!   execute() ── RET from last frame ──► Halt, results on result stack
//!        │
//!        ├── error ──► Fault
//!        └── break point ──► Break ── step_into / step_over / step_out
//! ```

mod config;
mod context;
mod engine;
mod error;
mod interop;
pub mod opcode;
mod ops;
mod stack_item;

pub use config::EngineConfig;
pub use context::{ExecutionContext, RandomAccessStack};
pub use engine::{AbortHandle, ExecutionEngine, VmState};
pub use error::VmError;
pub use interop::{
    Crypto, DefaultCrypto, InteropFn, InteropRegistry, InteropService, ScriptContainer,
    ScriptTable, GET_CALLING_SCRIPT_HASH, GET_ENTRY_SCRIPT_HASH, GET_EXECUTING_SCRIPT_HASH,
    GET_SCRIPT_CONTAINER,
};
pub use stack_item::{bigint_from_bytes, bigint_to_bytes, ItemList, StackItem};
