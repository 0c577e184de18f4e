//! Core types for the Meridian ledger.
//!
//! This crate provides the foundational types shared by the VM, the
//! transaction pool and consensus:
//!
//! - **Primitives**: [`Hash256`], [`ProgramHash`], [`Fixed64`], ed25519 keys
//! - **Codec**: little-endian [`Writer`] / [`Reader`] with var-uint lengths
//! - **Ledger model**: transactions, payloads, blocks, accounts
//! - **Ledger seam**: the [`LedgerStore`] trait consulted by validation
//!
//! # Design Philosophy
//!
//! This crate does not depend on any other workspace crate, making it the
//! foundation layer.

mod account;
mod asset;
mod block;
mod codec;
mod crypto;
mod fixed;
mod hash;
mod ledger;
mod payload;
mod script;
mod transaction;
mod utxo;

pub mod genesis;

pub use account::Account;
pub use asset::{Asset, AssetRecordType, AssetType, MAX_PRECISION};
pub use block::{bookkeeper_address, quorum_threshold, Block, BlockHeader};
pub use codec::{write_list, CodecError, Reader, Writer};
pub use crypto::{KeyPair, PublicKey, Signature};
pub use fixed::{Fixed64, FIXED64_DECIMALS};
pub use hash::{
    compute_merkle_root, hash160, hash256, sha256, to_code_hash, Hash256, HexError, ProgramHash,
};
pub use ledger::{LedgerError, LedgerStore};
pub use payload::{BookKeeperAction, DeployCode, Payload, TransactionType};
pub use script::{
    account_program_hash, multisig_redeem_script, op, signature_redeem_script,
    signatures_parameter, Program, ScriptBuilder,
};
pub use transaction::{AssetAmounts, Transaction, TransactionError};
pub use utxo::{Attribute, AttributeUsage, Output, UtxoInput};

/// Test utilities.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
