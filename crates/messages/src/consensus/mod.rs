//! dBFT consensus messages.
//!
//! Every message starts with a type byte and the sender's view number,
//! followed by a type-specific body:
//!
//! | type | tag    | body                                                        |
//! |------|--------|-------------------------------------------------------------|
//! | ChangeView      | `0x00` | `new_view_number: u8`                            |
//! | PrepareRequest  | `0x20` | `nonce: u64`, `next_bookkeeper: [u8; 20]`, hashes, bookkeeping tx, `signature: [u8; 64]` |
//! | PrepareResponse | `0x21` | `signature: [u8; 64]`                            |
//! | BlockSignatures | `0x22` | list of `(index: u16, signature: [u8; 64])`      |

mod payload;

pub use payload::{ConsensusPayload, CONSENSUS_PAYLOAD_VERSION};

use meridian_types::{
    write_list, CodecError, Hash256, ProgramHash, Reader, Signature, Transaction, Writer,
};
use thiserror::Error;

/// Errors from decoding consensus traffic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("malformed consensus message: {0}")]
    Codec(#[from] CodecError),

    #[error("unknown consensus message type: {0:#04x}")]
    UnknownMessageType(u8),

    #[error("empty consensus message")]
    Empty,
}

/// Wire tag of a consensus message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ConsensusMessageType {
    ChangeView = 0x00,
    PrepareRequest = 0x20,
    PrepareResponse = 0x21,
    BlockSignatures = 0x22,
}

impl ConsensusMessageType {
    pub fn from_u8(tag: u8) -> Result<Self, ConsensusError> {
        match tag {
            0x00 => Ok(Self::ChangeView),
            0x20 => Ok(Self::PrepareRequest),
            0x21 => Ok(Self::PrepareResponse),
            0x22 => Ok(Self::BlockSignatures),
            other => Err(ConsensusError::UnknownMessageType(other)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChangeView => "ChangeView",
            Self::PrepareRequest => "PrepareRequest",
            Self::PrepareResponse => "PrepareResponse",
            Self::BlockSignatures => "BlockSignatures",
        }
    }
}

impl std::fmt::Display for ConsensusMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to move the round to `new_view_number`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeView {
    pub view_number: u8,
    pub new_view_number: u8,
}

/// The primary's block proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareRequest {
    pub view_number: u8,
    pub nonce: u64,
    pub next_bookkeeper: ProgramHash,
    /// Hashes of every block transaction, the BookKeeping transaction first.
    pub transaction_hashes: Vec<Hash256>,
    /// The leading BookKeeping transaction, sent in full since no pool holds it.
    pub bookkeeping: Transaction,
    /// Primary's signature over the proposed header.
    pub signature: Signature,
}

/// A backup's signature over the proposed header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareResponse {
    pub view_number: u8,
    pub signature: Signature,
}

/// Header signatures collected so far, keyed by bookkeeper index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSignatures {
    pub view_number: u8,
    pub signatures: Vec<(u16, Signature)>,
}

/// One decoded consensus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsensusMessage {
    ChangeView(ChangeView),
    PrepareRequest(PrepareRequest),
    PrepareResponse(PrepareResponse),
    BlockSignatures(BlockSignatures),
}

impl ConsensusMessage {
    pub fn message_type(&self) -> ConsensusMessageType {
        match self {
            Self::ChangeView(_) => ConsensusMessageType::ChangeView,
            Self::PrepareRequest(_) => ConsensusMessageType::PrepareRequest,
            Self::PrepareResponse(_) => ConsensusMessageType::PrepareResponse,
            Self::BlockSignatures(_) => ConsensusMessageType::BlockSignatures,
        }
    }

    /// View the sender was in when it produced the message.
    pub fn view_number(&self) -> u8 {
        match self {
            Self::ChangeView(m) => m.view_number,
            Self::PrepareRequest(m) => m.view_number,
            Self::PrepareResponse(m) => m.view_number,
            Self::BlockSignatures(m) => m.view_number,
        }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_u8(self.message_type() as u8);
        w.write_u8(self.view_number());
        match self {
            Self::ChangeView(m) => w.write_u8(m.new_view_number),
            Self::PrepareRequest(m) => {
                w.write_u64(m.nonce);
                w.write_bytes(m.next_bookkeeper.as_bytes());
                write_list(w, &m.transaction_hashes, |h, w| w.write_bytes(h.as_bytes()));
                m.bookkeeping.encode(w);
                m.signature.encode(w);
            }
            Self::PrepareResponse(m) => m.signature.encode(w),
            Self::BlockSignatures(m) => {
                write_list(w, &m.signatures, |(index, sig), w| {
                    w.write_u16(*index);
                    sig.encode(w);
                });
            }
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::new();
        self.encode(&mut w);
        w.into_bytes()
    }

    /// Decode exactly one message; trailing bytes are an error.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConsensusError> {
        if bytes.is_empty() {
            return Err(ConsensusError::Empty);
        }
        let mut r = Reader::new(bytes);
        let message_type = ConsensusMessageType::from_u8(r.read_u8()?)?;
        let view_number = r.read_u8()?;

        let message = match message_type {
            ConsensusMessageType::ChangeView => Self::ChangeView(ChangeView {
                view_number,
                new_view_number: r.read_u8()?,
            }),
            ConsensusMessageType::PrepareRequest => {
                let nonce = r.read_u64()?;
                let next_bookkeeper = ProgramHash::from_bytes(r.read_array()?);
                let transaction_hashes =
                    r.read_list(|r| Ok(Hash256::from_hash_bytes(r.read_array()?)))?;
                let bookkeeping = Transaction::decode(&mut r)?;
                let signature = Signature::decode(&mut r)?;
                Self::PrepareRequest(PrepareRequest {
                    view_number,
                    nonce,
                    next_bookkeeper,
                    transaction_hashes,
                    bookkeeping,
                    signature,
                })
            }
            ConsensusMessageType::PrepareResponse => Self::PrepareResponse(PrepareResponse {
                view_number,
                signature: Signature::decode(&mut r)?,
            }),
            ConsensusMessageType::BlockSignatures => {
                let signatures =
                    r.read_list(|r| Ok((r.read_u16()?, Signature::decode(r)?)))?;
                Self::BlockSignatures(BlockSignatures {
                    view_number,
                    signatures,
                })
            }
        };
        r.finish()?;
        Ok(message)
    }
}
