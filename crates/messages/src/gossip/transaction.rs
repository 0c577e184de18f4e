//! Transaction gossip message.

use crate::NetworkMessage;
use meridian_types::{CodecError, Transaction};
use std::sync::Arc;

/// Relays a pooled transaction to peers.
///
/// The transaction is shared with the pool rather than cloned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionGossip {
    pub transaction: Arc<Transaction>,
}

impl TransactionGossip {
    pub fn new(transaction: Arc<Transaction>) -> Self {
        Self { transaction }
    }

    pub fn transaction(&self) -> &Transaction {
        &self.transaction
    }

    pub fn into_transaction(self) -> Arc<Transaction> {
        self.transaction
    }

    /// Full signed wire form of the transaction.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.transaction.to_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        Transaction::from_bytes(bytes).map(|tx| Self::new(Arc::new(tx)))
    }
}

impl NetworkMessage for TransactionGossip {
    fn message_type_id() -> &'static str {
        "transaction.gossip"
    }
}
