//! Per-type transaction payloads.
//!
//! The [`Payload`] variant determines the transaction type; [`TransactionType`]
//! is only the wire tag.

use crate::asset::Asset;
use crate::codec::{write_list, CodecError, Reader, Writer};
use crate::crypto::PublicKey;
use crate::fixed::Fixed64;
use crate::hash::ProgramHash;
use crate::utxo::UtxoInput;

/// Wire tag of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum TransactionType {
    BookKeeping = 0x00,
    IssueAsset = 0x01,
    BookKeeper = 0x02,
    Claim = 0x03,
    Enrollment = 0x04,
    Vote = 0x05,
    DataFile = 0x12,
    RegisterAsset = 0x40,
    TransferAsset = 0x80,
    Record = 0x81,
    Deploy = 0xd0,
    Invoke = 0xd1,
}

impl TransactionType {
    pub fn from_u8(tag: u8) -> Result<Self, CodecError> {
        Ok(match tag {
            0x00 => Self::BookKeeping,
            0x01 => Self::IssueAsset,
            0x02 => Self::BookKeeper,
            0x03 => Self::Claim,
            0x04 => Self::Enrollment,
            0x05 => Self::Vote,
            0x12 => Self::DataFile,
            0x40 => Self::RegisterAsset,
            0x80 => Self::TransferAsset,
            0x81 => Self::Record,
            0xd0 => Self::Deploy,
            0xd1 => Self::Invoke,
            other => return Err(CodecError::UnknownTransactionType(other)),
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BookKeeping => "BookKeeping",
            Self::IssueAsset => "IssueAsset",
            Self::BookKeeper => "BookKeeper",
            Self::Claim => "Claim",
            Self::Enrollment => "Enrollment",
            Self::Vote => "Vote",
            Self::DataFile => "DataFile",
            Self::RegisterAsset => "RegisterAsset",
            Self::TransferAsset => "TransferAsset",
            Self::Record => "Record",
            Self::Deploy => "Deploy",
            Self::Invoke => "Invoke",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a bookkeeper set change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BookKeeperAction {
    Add = 0x00,
    Sub = 0x01,
}

impl BookKeeperAction {
    fn from_u8(value: u8) -> Result<Self, CodecError> {
        match value {
            0x00 => Ok(Self::Add),
            0x01 => Ok(Self::Sub),
            _ => Err(CodecError::InvalidEnumValue {
                what: "bookkeeper action",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployCode {
    pub code: Vec<u8>,
    pub param_types: Vec<u8>,
    pub return_type: u8,
    pub need_storage: bool,
    pub name: String,
    pub version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    BookKeeping {
        nonce: u64,
    },
    IssueAsset,
    BookKeeper {
        pub_key: PublicKey,
        action: BookKeeperAction,
        cert: Vec<u8>,
        issuer: PublicKey,
    },
    Claim {
        claims: Vec<UtxoInput>,
    },
    Enrollment {
        pub_key: PublicKey,
    },
    Vote {
        pub_keys: Vec<PublicKey>,
        account: ProgramHash,
    },
    DataFile {
        ipfs_path: String,
        filename: String,
        note: String,
        issuer: PublicKey,
    },
    RegisterAsset {
        asset: Asset,
        amount: Fixed64,
        issuer: PublicKey,
        controller: ProgramHash,
    },
    TransferAsset,
    Record {
        record_type: String,
        record_data: Vec<u8>,
    },
    Deploy(Box<DeployCode>),
    Invoke {
        code: Vec<u8>,
        gas_limit: Fixed64,
    },
}

impl Payload {
    pub fn tx_type(&self) -> TransactionType {
        match self {
            Self::BookKeeping { .. } => TransactionType::BookKeeping,
            Self::IssueAsset => TransactionType::IssueAsset,
            Self::BookKeeper { .. } => TransactionType::BookKeeper,
            Self::Claim { .. } => TransactionType::Claim,
            Self::Enrollment { .. } => TransactionType::Enrollment,
            Self::Vote { .. } => TransactionType::Vote,
            Self::DataFile { .. } => TransactionType::DataFile,
            Self::RegisterAsset { .. } => TransactionType::RegisterAsset,
            Self::TransferAsset => TransactionType::TransferAsset,
            Self::Record { .. } => TransactionType::Record,
            Self::Deploy(_) => TransactionType::Deploy,
            Self::Invoke { .. } => TransactionType::Invoke,
        }
    }

    /// Serialize the body only; the tag is written by the transaction.
    pub fn encode(&self, w: &mut Writer) {
        match self {
            Self::BookKeeping { nonce } => w.write_u64(*nonce),
            Self::IssueAsset | Self::TransferAsset => {}
            Self::BookKeeper {
                pub_key,
                action,
                cert,
                issuer,
            } => {
                pub_key.encode(w);
                w.write_u8(*action as u8);
                w.write_var_bytes(cert);
                issuer.encode(w);
            }
            Self::Claim { claims } => write_list(w, claims, |c, w| c.encode(w)),
            Self::Enrollment { pub_key } => pub_key.encode(w),
            Self::Vote { pub_keys, account } => {
                write_list(w, pub_keys, |k, w| k.encode(w));
                w.write_bytes(account.as_bytes());
            }
            Self::DataFile {
                ipfs_path,
                filename,
                note,
                issuer,
            } => {
                w.write_var_string(ipfs_path);
                w.write_var_string(filename);
                w.write_var_string(note);
                issuer.encode(w);
            }
            Self::RegisterAsset {
                asset,
                amount,
                issuer,
                controller,
            } => {
                asset.encode(w);
                amount.encode(w);
                issuer.encode(w);
                w.write_bytes(controller.as_bytes());
            }
            Self::Record {
                record_type,
                record_data,
            } => {
                w.write_var_string(record_type);
                w.write_var_bytes(record_data);
            }
            Self::Deploy(d) => {
                w.write_var_bytes(&d.code);
                w.write_var_bytes(&d.param_types);
                w.write_u8(d.return_type);
                w.write_bool(d.need_storage);
                w.write_var_string(&d.name);
                w.write_var_string(&d.version);
                w.write_var_string(&d.author);
                w.write_var_string(&d.email);
                w.write_var_string(&d.description);
            }
            Self::Invoke { code, gas_limit } => {
                w.write_var_bytes(code);
                gas_limit.encode(w);
            }
        }
    }

    /// Parse the body for an already-read tag.
    pub fn decode(tx_type: TransactionType, r: &mut Reader<'_>) -> Result<Self, CodecError> {
        Ok(match tx_type {
            TransactionType::BookKeeping => Self::BookKeeping {
                nonce: r.read_u64()?,
            },
            TransactionType::IssueAsset => Self::IssueAsset,
            TransactionType::BookKeeper => Self::BookKeeper {
                pub_key: PublicKey::decode(r)?,
                action: BookKeeperAction::from_u8(r.read_u8()?)?,
                cert: r.read_var_bytes()?,
                issuer: PublicKey::decode(r)?,
            },
            TransactionType::Claim => Self::Claim {
                claims: r.read_list(UtxoInput::decode)?,
            },
            TransactionType::Enrollment => Self::Enrollment {
                pub_key: PublicKey::decode(r)?,
            },
            TransactionType::Vote => Self::Vote {
                pub_keys: r.read_list(PublicKey::decode)?,
                account: ProgramHash::from_bytes(r.read_array()?),
            },
            TransactionType::DataFile => Self::DataFile {
                ipfs_path: r.read_var_string()?,
                filename: r.read_var_string()?,
                note: r.read_var_string()?,
                issuer: PublicKey::decode(r)?,
            },
            TransactionType::RegisterAsset => Self::RegisterAsset {
                asset: Asset::decode(r)?,
                amount: Fixed64::decode(r)?,
                issuer: PublicKey::decode(r)?,
                controller: ProgramHash::from_bytes(r.read_array()?),
            },
            TransactionType::TransferAsset => Self::TransferAsset,
            TransactionType::Record => Self::Record {
                record_type: r.read_var_string()?,
                record_data: r.read_var_bytes()?,
            },
            TransactionType::Deploy => Self::Deploy(Box::new(DeployCode {
                code: r.read_var_bytes()?,
                param_types: r.read_var_bytes()?,
                return_type: r.read_u8()?,
                need_storage: r.read_bool()?,
                name: r.read_var_string()?,
                version: r.read_var_string()?,
                author: r.read_var_string()?,
                email: r.read_var_string()?,
                description: r.read_var_string()?,
            })),
            TransactionType::Invoke => Self::Invoke {
                code: r.read_var_bytes()?,
                gas_limit: Fixed64::decode(r)?,
            },
        })
    }
}
