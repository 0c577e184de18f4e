//! Messages a node sends to its peers.

use meridian_messages::{
    ConsensusPayload, ConsensusMessageType, GetTransactionsRequest, TransactionGossip,
};

/// Outbound network messages.
///
/// Delivery and encoding are the runner's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutboundMessage {
    // ═══════════════════════════════════════════════════════════════════════
    // Consensus
    // ═══════════════════════════════════════════════════════════════════════
    /// Signed consensus payload, relayed to every bookkeeper.
    Consensus(Box<ConsensusPayload>),

    // ═══════════════════════════════════════════════════════════════════════
    // Mempool
    // ═══════════════════════════════════════════════════════════════════════
    /// Transaction gossip.
    TransactionGossip(Box<TransactionGossip>),

    /// Ask peers for proposal transactions this node is missing.
    TransactionRequest(GetTransactionsRequest),
}

impl OutboundMessage {
    /// Get a human-readable name for this message type.
    pub fn type_name(&self) -> &'static str {
        match self {
            OutboundMessage::Consensus(payload) => match payload.message() {
                Ok(message) => message.message_type().as_str(),
                Err(_) => "Consensus",
            },
            OutboundMessage::TransactionGossip(_) => "TransactionGossip",
            OutboundMessage::TransactionRequest(_) => "TransactionRequest",
        }
    }

    /// Check if this is a consensus message.
    pub fn is_consensus(&self) -> bool {
        matches!(self, OutboundMessage::Consensus(_))
    }

    /// Check if this is a mempool message.
    pub fn is_mempool(&self) -> bool {
        matches!(
            self,
            OutboundMessage::TransactionGossip(_) | OutboundMessage::TransactionRequest(_)
        )
    }

    /// Consensus message type carried by a consensus payload.
    pub fn consensus_type(&self) -> Option<ConsensusMessageType> {
        match self {
            OutboundMessage::Consensus(payload) => {
                payload.message().ok().map(|m| m.message_type())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meridian_messages::{ChangeView, ConsensusMessage, CONSENSUS_PAYLOAD_VERSION};
    use meridian_types::test_utils::test_keypair;
    use meridian_types::{Hash256, Signature};

    fn change_view_payload() -> ConsensusPayload {
        ConsensusPayload {
            version: CONSENSUS_PAYLOAD_VERSION,
            prev_hash: Hash256::ZERO,
            height: 1,
            bookkeeper_index: 0,
            timestamp: 0,
            data: ConsensusMessage::ChangeView(ChangeView {
                view_number: 0,
                new_view_number: 1,
            })
            .to_bytes(),
            owner: test_keypair(1).public_key(),
            signature: Signature::zero(),
        }
    }

    #[test]
    fn test_consensus_type_name_follows_payload() {
        let msg = OutboundMessage::Consensus(Box::new(change_view_payload()));
        assert_eq!(msg.type_name(), "ChangeView");
        assert_eq!(msg.consensus_type(), Some(ConsensusMessageType::ChangeView));
        assert!(msg.is_consensus());
        assert!(!msg.is_mempool());
    }

    #[test]
    fn test_undecodable_payload_still_named() {
        let mut payload = change_view_payload();
        payload.data = vec![0x7F];
        let msg = OutboundMessage::Consensus(Box::new(payload));
        assert_eq!(msg.type_name(), "Consensus");
        assert_eq!(msg.consensus_type(), None);
    }

    #[test]
    fn test_request_is_mempool_traffic() {
        let msg = OutboundMessage::TransactionRequest(GetTransactionsRequest::new(1, vec![]));
        assert!(msg.is_mempool());
        assert_eq!(msg.type_name(), "TransactionRequest");
    }
}
