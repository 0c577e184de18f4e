//! Core types for Meridian consensus.
//!
//! This crate provides the vocabulary shared by the pool, consensus and
//! node state machines:
//!
//! - [`Event`]: All possible inputs to the state machine
//! - [`Action`]: All possible outputs from the state machine
//! - [`EventPriority`]: Ordering priority for events at the same timestamp
//! - [`StateMachine`]: The trait that all state machines implement
//!
//! # Architecture
//!
//! ```text
//! Events → StateMachine::handle() → Actions
//! ```
//!
//! The state machine is:
//! - **Synchronous**: No async, no .await
//! - **Deterministic**: Same state + time + event = same actions
//! - **Pure-ish**: Mutates self, but performs no I/O
//!
//! All I/O is handled by the runner which:
//! 1. Delivers events to the state machine
//! 2. Executes the returned actions (broadcast, timers, persistence)
//! 3. Converts action results back into events (`BlockPersisted`)

mod action;
mod event;
mod message;
mod traits;

pub use action::{Action, TransactionStatus};
pub use event::{Event, EventPriority};
pub use message::OutboundMessage;
pub use traits::StateMachine;

/// Timer identification.
///
/// Consensus timers are keyed by round so a timer that fires after the
/// round moved on is recognisably stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    /// Round timeout: the primary proposes, backups ask for a view change.
    Consensus { height: u32, view: u8 },
}
