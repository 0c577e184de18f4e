//! Read-side seam onto the persisted chain.
//!
//! The storage engine itself is an external collaborator; pool and consensus
//! only see this trait. Every error means "unknown": callers fail the step
//! that needed the answer rather than assuming an empty or zero value.

use crate::account::Account;
use crate::block::{Block, BlockHeader};
use crate::crypto::PublicKey;
use crate::fixed::Fixed64;
use crate::hash::{Hash256, ProgramHash};
use crate::transaction::Transaction;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    #[error("ledger unavailable: {0}")]
    Unavailable(String),
}

impl LedgerError {
    pub fn not_found(what: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            what,
            key: key.to_string(),
        }
    }
}

/// Synchronous ledger queries.
///
/// Implementations that wrap a blocking store are expected to bound each call
/// and report a timeout as [`LedgerError::Unavailable`].
pub trait LedgerStore: Send + Sync {
    fn get_transaction(&self, hash: &Hash256) -> Result<Transaction, LedgerError>;

    /// Total amount of `asset_id` issued on chain so far.
    fn get_quantity_issued(&self, asset_id: &Hash256) -> Result<Fixed64, LedgerError>;

    fn get_block(&self, hash: &Hash256) -> Result<Block, LedgerError>;

    fn get_block_hash(&self, height: u32) -> Result<Hash256, LedgerError>;

    fn get_account(&self, program_hash: &ProgramHash) -> Result<Account, LedgerError>;

    fn get_header(&self, hash: &Hash256) -> Result<BlockHeader, LedgerError>;

    fn contains_transaction(&self, hash: &Hash256) -> Result<bool, LedgerError>;

    /// Whether any input of `tx` is already spent on chain.
    fn is_double_spend(&self, tx: &Transaction) -> Result<bool, LedgerError>;

    fn current_height(&self) -> u32;

    fn current_block_hash(&self) -> Hash256;

    /// Bookkeepers that sign the next block, in ascending key order.
    fn bookkeepers(&self) -> Result<Vec<PublicKey>, LedgerError>;
}
