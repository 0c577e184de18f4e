//! What a state machine asks its runner to do.

use crate::{message::OutboundMessage, TimerId};
use meridian_messages::GetTransactionsRequest;
use meridian_types::{Block, Hash256};
use std::sync::Arc;
use std::time::Duration;

/// Lifecycle of a transaction as reported to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionStatus {
    /// Admitted to the pool.
    Pending,
    /// Refused by validation or by the pool.
    Rejected { reason: String },
    /// Evicted from the pool by a conflicting transaction.
    Evicted { by: Hash256 },
    /// Included in a persisted block.
    Committed { height: u32 },
}

/// Side effects requested by a state machine.
///
/// Actions are **commands** - they describe something to do.
/// The runner performs them in order; results come back as events.
#[derive(Debug, Clone)]
pub enum Action {
    // ═══════════════════════════════════════════════════════════════════════
    // Network
    // ═══════════════════════════════════════════════════════════════════════
    /// Broadcast a message to all peers.
    Broadcast { message: OutboundMessage },

    /// Ask peers for transactions a proposal references.
    ///
    /// Answers arrive as `Event::TransactionReceived`.
    RequestTransactions { request: GetTransactionsRequest },

    // ═══════════════════════════════════════════════════════════════════════
    // Timers
    // ═══════════════════════════════════════════════════════════════════════
    /// Set a timer to fire after a duration.
    SetTimer { id: TimerId, duration: Duration },

    /// Cancel a previously set timer.
    CancelTimer { id: TimerId },

    // ═══════════════════════════════════════════════════════════════════════
    // Storage
    // ═══════════════════════════════════════════════════════════════════════
    /// Persist a block signed by a quorum of bookkeepers.
    ///
    /// The runner answers with `Event::BlockPersisted` once the block is
    /// on chain.
    PersistBlock { block: Arc<Block> },

    // ═══════════════════════════════════════════════════════════════════════
    // External Notifications
    // ═══════════════════════════════════════════════════════════════════════
    /// Report a transaction status change to clients.
    EmitTransactionStatus {
        tx_hash: Hash256,
        status: TransactionStatus,
    },
}

impl Action {
    /// Get the action type name for telemetry.
    pub fn type_name(&self) -> &'static str {
        match self {
            Action::Broadcast { .. } => "Broadcast",
            Action::RequestTransactions { .. } => "RequestTransactions",
            Action::SetTimer { .. } => "SetTimer",
            Action::CancelTimer { .. } => "CancelTimer",
            Action::PersistBlock { .. } => "PersistBlock",
            Action::EmitTransactionStatus { .. } => "EmitTransactionStatus",
        }
    }

    /// Check if this action goes out over the network.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Action::Broadcast { .. } | Action::RequestTransactions { .. }
        )
    }

    /// The outbound message, for broadcast actions.
    pub fn outbound(&self) -> Option<&OutboundMessage> {
        match self {
            Action::Broadcast { message } => Some(message),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_names() {
        let timer = Action::SetTimer {
            id: TimerId::Consensus { height: 3, view: 1 },
            duration: Duration::from_secs(12),
        };
        assert_eq!(timer.type_name(), "SetTimer");
        assert!(!timer.is_network());
        assert!(timer.outbound().is_none());

        let request = Action::RequestTransactions {
            request: GetTransactionsRequest::new(3, vec![Hash256::of(b"tx")]),
        };
        assert_eq!(request.type_name(), "RequestTransactions");
        assert!(request.is_network());
    }
}
