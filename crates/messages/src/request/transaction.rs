//! Transaction fetch request.

use crate::NetworkMessage;
use meridian_types::{write_list, CodecError, Hash256, Reader, Writer};

/// Request for proposal transactions a backup does not hold.
///
/// Sent when a PrepareRequest names transactions that are neither in the
/// local pool nor already received. Answers arrive as ordinary
/// transaction gossip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetTransactionsRequest {
    /// Block height the proposal is for.
    pub height: u32,

    /// Hashes of the transactions being requested.
    pub tx_hashes: Vec<Hash256>,
}

impl GetTransactionsRequest {
    pub fn new(height: u32, tx_hashes: Vec<Hash256>) -> Self {
        Self { height, tx_hashes }
    }

    /// Get the number of transactions being requested.
    pub fn count(&self) -> usize {
        self.tx_hashes.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(5 + 32 * self.tx_hashes.len());
        w.write_u32(self.height);
        write_list(&mut w, &self.tx_hashes, |h, w| w.write_bytes(h.as_bytes()));
        w.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let height = r.read_u32()?;
        let tx_hashes = r.read_list(|r| Ok(Hash256::from_hash_bytes(r.read_array()?)))?;
        r.finish()?;
        Ok(Self { height, tx_hashes })
    }
}

impl NetworkMessage for GetTransactionsRequest {
    fn message_type_id() -> &'static str {
        "transaction.request"
    }
}
