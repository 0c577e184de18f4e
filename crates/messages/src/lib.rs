//! Network messages for the consensus protocol.
//!
//! Consensus traffic travels inside a signed [`ConsensusPayload`] whose
//! `data` field carries one encoded [`ConsensusMessage`]. Transactions are
//! relayed as [`TransactionGossip`], and a backup that is missing proposal
//! transactions asks for them with a [`GetTransactionsRequest`].

pub mod consensus;
pub mod gossip;
pub mod request;

pub use consensus::{
    BlockSignatures, ChangeView, ConsensusError, ConsensusMessage, ConsensusMessageType,
    ConsensusPayload, PrepareRequest, PrepareResponse, CONSENSUS_PAYLOAD_VERSION,
};
pub use gossip::TransactionGossip;
pub use request::GetTransactionsRequest;

/// A message that can be routed by type name.
pub trait NetworkMessage {
    /// Stable identifier used for topic routing and logging.
    fn message_type_id() -> &'static str;
}
