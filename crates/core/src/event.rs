//! Inputs to the node state machines.

use meridian_messages::{ConsensusPayload, GetTransactionsRequest};
use meridian_types::{Block, Transaction};
use std::sync::Arc;

/// Priority levels for event ordering within the same timestamp.
///
/// Lower values = higher priority (processed first). Internal events
/// (consequences of processing an event) are handled before new external
/// inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EventPriority {
    /// Internal events: consequences of prior event processing.
    Internal = 0,

    /// Timer events: scheduled by the node itself.
    Timer = 1,

    /// Network events: external inputs from other nodes.
    Network = 2,

    /// Client events: external inputs from users.
    Client = 3,
}

/// Everything a node reacts to.
///
/// Events are **passive data** - they describe something that happened.
/// Handling one yields the actions to perform next.
#[derive(Debug, Clone)]
pub enum Event {
    // ═══════════════════════════════════════════════════════════════════════
    // Timers (priority: Timer)
    // ═══════════════════════════════════════════════════════════════════════
    /// Round timeout for `(height, view)`. Ignored once the round has moved on.
    ConsensusTimer { height: u32, view: u8 },

    // ═══════════════════════════════════════════════════════════════════════
    // Network Messages (priority: Network)
    // ═══════════════════════════════════════════════════════════════════════
    /// A consensus payload arrived from a peer.
    ///
    /// Sender identity comes from the payload's `owner` and signature.
    ConsensusPayloadReceived { payload: ConsensusPayload },

    /// A transaction arrived by gossip.
    TransactionReceived { tx: Arc<Transaction> },

    /// A peer asked for transactions by hash.
    TransactionsRequested { request: GetTransactionsRequest },

    // ═══════════════════════════════════════════════════════════════════════
    // Client (priority: Client)
    // ═══════════════════════════════════════════════════════════════════════
    /// A transaction submitted locally.
    SubmitTransaction { tx: Arc<Transaction> },

    // ═══════════════════════════════════════════════════════════════════════
    // Internal (priority: Internal)
    // ═══════════════════════════════════════════════════════════════════════
    /// The runner finished persisting a block, ours or a peer's.
    BlockPersisted { block: Arc<Block> },
}

impl Event {
    /// Get the priority for this event type.
    pub fn priority(&self) -> EventPriority {
        match self {
            Event::BlockPersisted { .. } => EventPriority::Internal,

            Event::ConsensusTimer { .. } => EventPriority::Timer,

            Event::ConsensusPayloadReceived { .. }
            | Event::TransactionReceived { .. }
            | Event::TransactionsRequested { .. } => EventPriority::Network,

            Event::SubmitTransaction { .. } => EventPriority::Client,
        }
    }

    /// Check if this is an internal event.
    pub fn is_internal(&self) -> bool {
        self.priority() == EventPriority::Internal
    }

    /// Get the event type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Event::ConsensusTimer { .. } => "ConsensusTimer",
            Event::ConsensusPayloadReceived { .. } => "ConsensusPayloadReceived",
            Event::TransactionReceived { .. } => "TransactionReceived",
            Event::TransactionsRequested { .. } => "TransactionsRequested",
            Event::SubmitTransaction { .. } => "SubmitTransaction",
            Event::BlockPersisted { .. } => "BlockPersisted",
        }
    }
}
