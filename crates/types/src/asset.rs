//! Asset descriptors carried by `RegisterAsset` transactions.

use crate::codec::{CodecError, Reader, Writer};

/// Highest precision an asset may declare.
pub const MAX_PRECISION: u8 = 8;

/// Kind of registered asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AssetType {
    GoverningToken = 0x00,
    UtilityToken = 0x01,
    Currency = 0x08,
    Token = 0x60,
    Share = 0x90,
    Invoice = 0x98,
}

impl AssetType {
    pub fn from_u8(value: u8) -> Result<Self, CodecError> {
        Ok(match value {
            0x00 => Self::GoverningToken,
            0x01 => Self::UtilityToken,
            0x08 => Self::Currency,
            0x60 => Self::Token,
            0x90 => Self::Share,
            0x98 => Self::Invoice,
            _ => {
                return Err(CodecError::InvalidEnumValue {
                    what: "asset type",
                    value,
                })
            }
        })
    }
}

/// How holdings of the asset are tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AssetRecordType {
    Utxo = 0x00,
    Balance = 0x01,
}

impl AssetRecordType {
    pub fn from_u8(value: u8) -> Result<Self, CodecError> {
        match value {
            0x00 => Ok(Self::Utxo),
            0x01 => Ok(Self::Balance),
            _ => Err(CodecError::InvalidEnumValue {
                what: "asset record type",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub name: String,
    pub description: String,
    pub precision: u8,
    pub asset_type: AssetType,
    pub record_type: AssetRecordType,
}

impl Asset {
    pub fn encode(&self, w: &mut Writer) {
        w.write_var_string(&self.name);
        w.write_var_string(&self.description);
        w.write_u8(self.precision);
        w.write_u8(self.asset_type as u8);
        w.write_u8(self.record_type as u8);
    }

    pub fn decode(r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            name: r.read_var_string()?,
            description: r.read_var_string()?,
            precision: r.read_u8()?,
            asset_type: AssetType::from_u8(r.read_u8()?)?,
            record_type: AssetRecordType::from_u8(r.read_u8()?)?,
        })
    }
}
