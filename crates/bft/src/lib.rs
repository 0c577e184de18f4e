//! dBFT consensus context and state machine.
//!
//! This crate provides a synchronous implementation of delegated Byzantine
//! fault tolerance over a fixed, ledger-defined set of bookkeepers.
//!
//! # Architecture
//!
//! [`ConsensusService`] is driven by its runner and never performs I/O:
//!
//! - `start` / `on_block_persisted` → reset the round, arm the timer
//! - `on_timer` → primary proposes, backups request a view change
//! - `on_payload` → verify the envelope, dispatch by message type
//! - `on_transaction` → fill a proposal that was waiting on transactions
//!
//! Each call returns the `Action`s the runner must perform.
//!
//! # Terminology
//!
//! - **Bookkeeper**: A validator. The ledger stores the sorted set of public
//!   keys for the next block; `N` is its size.
//!
//! - **View**: Attempt number at one height. The primary for view `v` at
//!   height `h` is bookkeeper `(h - v) mod N`; everyone else is a backup.
//!
//! - **M**: Signatures needed to commit, `N - (N - 1) / 3`.
//!
//! # Protocol
//!
//! 1. The primary waits out the block time, then broadcasts a
//!    `PrepareRequest` naming every proposal transaction by hash. The first
//!    is a BookKeeping transaction carried in full; it makes each block's
//!    hash unique. The request includes the primary's header signature.
//!
//! 2. A backup accepts the request if the timestamp is sane and the header
//!    signature verifies, fetches any transaction it is missing, checks the
//!    proposed next-bookkeeper set and answers with its own signature.
//!
//! 3. Any node holding `M` valid signatures and every transaction builds the
//!    block with a multisig witness, broadcasts the signatures it holds and
//!    persists the block.
//!
//! 4. A node that sees no progress before its timer fires asks for the next
//!    view. Timeouts double per view. When `M` bookkeepers ask for the same
//!    view, every node moves to it.

mod config;
mod consensus_state;
mod context;
mod provider;
mod service;

pub use config::{BftConfig, MAX_TIMEOUT_SHIFT};
pub use consensus_state::ConsensusState;
pub use context::{ConsensusContext, BLOCK_VERSION};
pub use provider::TransactionProvider;
pub use service::ConsensusService;

pub use meridian_messages::{
    BlockSignatures, ChangeView, ConsensusMessage, ConsensusMessageType, ConsensusPayload,
    PrepareRequest, PrepareResponse,
};
