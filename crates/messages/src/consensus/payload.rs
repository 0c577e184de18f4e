//! Signed envelope around a consensus message.

use super::{ConsensusError, ConsensusMessage};
use meridian_types::{CodecError, Hash256, KeyPair, PublicKey, Reader, Signature, Writer};

pub const CONSENSUS_PAYLOAD_VERSION: u32 = 0;

/// A consensus message as it travels between bookkeepers.
///
/// The envelope pins the message to one round (`prev_hash`, `height`) and
/// one sender (`bookkeeper_index`, `owner`). The signature covers every
/// field except itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusPayload {
    pub version: u32,
    pub prev_hash: Hash256,
    pub height: u32,
    pub bookkeeper_index: u16,
    pub timestamp: u32,
    /// Encoded [`ConsensusMessage`].
    pub data: Vec<u8>,
    pub owner: PublicKey,
    pub signature: Signature,
}

impl ConsensusPayload {
    pub fn encode_unsigned(&self, w: &mut Writer) {
        w.write_u32(self.version);
        w.write_bytes(self.prev_hash.as_bytes());
        w.write_u32(self.height);
        w.write_u16(self.bookkeeper_index);
        w.write_u32(self.timestamp);
        w.write_var_bytes(&self.data);
        self.owner.encode(w);
    }

    pub fn unsigned_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(110 + self.data.len());
        self.encode_unsigned(&mut w);
        w.into_bytes()
    }

    /// Inventory hash of the payload.
    pub fn hash(&self) -> Hash256 {
        Hash256::of(&self.unsigned_bytes())
    }

    /// Sign with the node key. `owner` must already be `key`'s public half.
    pub fn sign(&mut self, key: &KeyPair) {
        self.signature = key.sign(&self.unsigned_bytes());
    }

    /// Whether `signature` is `owner`'s signature over the envelope.
    pub fn verify(&self) -> bool {
        self.owner.verify(&self.unsigned_bytes(), &self.signature)
    }

    /// Decode the carried message.
    pub fn message(&self) -> Result<ConsensusMessage, ConsensusError> {
        ConsensusMessage::from_bytes(&self.data)
    }

    pub fn encode(&self, w: &mut Writer) {
        self.encode_unsigned(w);
        self.signature.encode(w);
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode(&mut w);
        w.into_bytes()
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            version: r.read_u32()?,
            prev_hash: Hash256::from_hash_bytes(r.read_array()?),
            height: r.read_u32()?,
            bookkeeper_index: r.read_u16()?,
            timestamp: r.read_u32()?,
            data: r.read_var_bytes()?,
            owner: PublicKey::decode(r)?,
            signature: Signature::decode(r)?,
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(bytes);
        let payload = Self::decode(&mut r)?;
        r.finish()?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{ChangeView, ConsensusMessage};
    use meridian_types::test_utils::test_keypair;

    fn signed_payload() -> (ConsensusPayload, KeyPair) {
        let key = test_keypair(7);
        let message = ConsensusMessage::ChangeView(ChangeView {
            view_number: 0,
            new_view_number: 1,
        });
        let mut payload = ConsensusPayload {
            version: CONSENSUS_PAYLOAD_VERSION,
            prev_hash: Hash256::of(b"tip"),
            height: 5,
            bookkeeper_index: 2,
            timestamp: 1_700_000_000,
            data: message.to_bytes(),
            owner: key.public_key(),
            signature: Signature::zero(),
        };
        payload.sign(&key);
        (payload, key)
    }

    #[test]
    fn test_signed_payload_verifies() {
        let (payload, _) = signed_payload();
        assert!(payload.verify());
        assert_eq!(
            payload.message().unwrap(),
            ConsensusMessage::ChangeView(ChangeView {
                view_number: 0,
                new_view_number: 1,
            })
        );
    }

    #[test]
    fn test_tampered_envelope_fails_verification() {
        let (mut payload, _) = signed_payload();
        payload.height += 1;
        assert!(!payload.verify());

        let (mut payload, _) = signed_payload();
        payload.owner = test_keypair(8).public_key();
        assert!(!payload.verify());
    }

    #[test]
    fn test_hash_excludes_signature() {
        let (mut payload, _) = signed_payload();
        let before = payload.hash();
        payload.signature = Signature::zero();
        assert_eq!(payload.hash(), before);
    }

    #[test]
    fn test_wire_form_decodes() {
        let (payload, _) = signed_payload();
        let decoded = ConsensusPayload::from_bytes(&payload.to_bytes()).unwrap();
        assert_eq!(decoded, payload);
        assert!(decoded.verify());
    }
}
