//! Inputs, outputs and attributes of a transaction.

use crate::codec::{CodecError, Reader, Writer};
use crate::fixed::Fixed64;
use crate::hash::{Hash256, ProgramHash};
use std::fmt;

/// Reference to one output of an earlier transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UtxoInput {
    pub refer_tx_id: Hash256,
    pub refer_output_index: u16,
}

impl UtxoInput {
    pub fn new(refer_tx_id: Hash256, refer_output_index: u16) -> Self {
        Self {
            refer_tx_id,
            refer_output_index,
        }
    }

    /// Stable 34-byte identity: tx id followed by the little-endian index.
    pub fn key(&self) -> [u8; 34] {
        let mut out = [0u8; 34];
        out[..32].copy_from_slice(self.refer_tx_id.as_bytes());
        out[32..].copy_from_slice(&self.refer_output_index.to_le_bytes());
        out
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_bytes(self.refer_tx_id.as_bytes());
        w.write_u16(self.refer_output_index);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let refer_tx_id = Hash256::from_hash_bytes(r.read_array()?);
        let refer_output_index = r.read_u16()?;
        Ok(Self {
            refer_tx_id,
            refer_output_index,
        })
    }
}

impl fmt::Debug for UtxoInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.refer_tx_id, self.refer_output_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Output {
    pub asset_id: Hash256,
    pub value: Fixed64,
    pub program_hash: ProgramHash,
}

impl Output {
    pub fn new(asset_id: Hash256, value: Fixed64, program_hash: ProgramHash) -> Self {
        Self {
            asset_id,
            value,
            program_hash,
        }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_bytes(self.asset_id.as_bytes());
        self.value.encode(w);
        w.write_bytes(self.program_hash.as_bytes());
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            asset_id: Hash256::from_hash_bytes(r.read_array()?),
            value: Fixed64::decode(r)?,
            program_hash: ProgramHash::from_bytes(r.read_array()?),
        })
    }
}

/// Meaning of an attribute's data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AttributeUsage {
    Nonce = 0x00,
    /// Data is an extra program hash that must sign.
    Script = 0x20,
    DescriptionUrl = 0x81,
    Description = 0x90,
}

impl AttributeUsage {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::Nonce),
            0x20 => Some(Self::Script),
            0x81 => Some(Self::DescriptionUrl),
            0x90 => Some(Self::Description),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub usage: AttributeUsage,
    pub data: Vec<u8>,
}

impl Attribute {
    pub fn new(usage: AttributeUsage, data: Vec<u8>) -> Self {
        Self { usage, data }
    }

    pub fn encode(&self, w: &mut Writer) {
        w.write_u8(self.usage as u8);
        w.write_var_bytes(&self.data);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let raw = r.read_u8()?;
        let usage = AttributeUsage::from_u8(raw).ok_or(CodecError::InvalidEnumValue {
            what: "attribute usage",
            value: raw,
        })?;
        Ok(Self {
            usage,
            data: r.read_var_bytes()?,
        })
    }
}
