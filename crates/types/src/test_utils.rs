//! Test utilities: an in-memory ledger and signing helpers.

use crate::account::Account;
use crate::block::{Block, BlockHeader};
use crate::crypto::{KeyPair, PublicKey};
use crate::fixed::Fixed64;
use crate::genesis;
use crate::hash::{Hash256, ProgramHash};
use crate::ledger::{LedgerError, LedgerStore};
use crate::payload::TransactionType;
use crate::script::{signature_redeem_script, signatures_parameter, Program};
use crate::transaction::Transaction;
use crate::utxo::{Attribute, AttributeUsage, Output, UtxoInput};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// Deterministic key pair from a seed byte.
pub fn test_keypair(seed: u8) -> KeyPair {
    KeyPair::from_seed([seed; 32])
}

/// Attach a single-signature witness for `key` to `tx`.
pub fn sign_transaction(tx: &mut Transaction, key: &KeyPair) {
    let signature = key.sign(&tx.hash_data());
    tx.set_programs(vec![Program::new(
        signatures_parameter(&[signature]),
        signature_redeem_script(&key.public_key()),
    )]);
}

#[derive(Default)]
struct Inner {
    transactions: HashMap<Hash256, Transaction>,
    blocks: HashMap<Hash256, Block>,
    block_hashes: Vec<Hash256>,
    issued: HashMap<Hash256, Fixed64>,
    spent: HashSet<UtxoInput>,
    accounts: HashMap<ProgramHash, Account>,
    bookkeepers: Vec<PublicKey>,
    fund_nonce: u64,
    unavailable: bool,
}

/// [`LedgerStore`] backed by hash maps.
///
/// Starts from the genesis block. Persisting a block records its
/// transactions, marks spent outputs, accumulates issued quantities and
/// updates account balances.
pub struct MemoryLedger {
    inner: RwLock<Inner>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::with_bookkeepers(Vec::new())
    }

    pub fn with_bookkeepers(mut bookkeepers: Vec<PublicKey>) -> Self {
        bookkeepers.sort();
        let genesis = genesis::genesis_block(&bookkeepers);
        let ledger = Self {
            inner: RwLock::new(Inner {
                bookkeepers,
                ..Inner::default()
            }),
        };
        ledger.persist_block(&genesis);
        ledger
    }

    /// Apply a block on top of the current tip.
    pub fn persist_block(&self, block: &Block) {
        let mut inner = self.inner.write();
        for tx in &block.transactions {
            // Debit the owners of spent outputs before marking them spent.
            for input in tx.utxo_inputs() {
                let referenced = inner
                    .transactions
                    .get(&input.refer_tx_id)
                    .and_then(|prev| prev.outputs().get(usize::from(input.refer_output_index)))
                    .copied();
                if let Some(output) = referenced {
                    inner
                        .accounts
                        .entry(output.program_hash)
                        .or_insert_with(|| Account::new(output.program_hash))
                        .debit(output.asset_id, output.value);
                }
                inner.spent.insert(*input);
            }
            for output in tx.outputs() {
                inner
                    .accounts
                    .entry(output.program_hash)
                    .or_insert_with(|| Account::new(output.program_hash))
                    .credit(output.asset_id, output.value);
            }
            if tx.tx_type() == TransactionType::IssueAsset {
                for (asset, amount) in tx.merged_outputs() {
                    *inner.issued.entry(asset).or_default() += amount;
                }
            }
            inner.transactions.insert(tx.hash(), tx.clone());
        }
        let hash = block.hash();
        inner.block_hashes.push(hash);
        inner.blocks.insert(hash, block.clone());
    }

    /// Record a transaction without a block. Issuance is not counted.
    pub fn insert_transaction(&self, tx: Transaction) {
        self.inner.write().transactions.insert(tx.hash(), tx);
    }

    /// Record an on-chain output of `value` owned by `owner` and return the
    /// transaction holding it at index 0.
    pub fn fund(&self, owner: ProgramHash, asset_id: Hash256, value: Fixed64) -> Transaction {
        let nonce = {
            let mut inner = self.inner.write();
            inner.fund_nonce += 1;
            inner.fund_nonce
        };
        let tx = Transaction::issue_asset(vec![Output::new(asset_id, value, owner)])
            .with_attributes(vec![Attribute::new(
                AttributeUsage::Nonce,
                nonce.to_le_bytes().to_vec(),
            )]);
        self.insert_transaction(tx.clone());
        tx
    }

    pub fn mark_spent(&self, input: UtxoInput) {
        self.inner.write().spent.insert(input);
    }

    pub fn set_issued(&self, asset_id: Hash256, amount: Fixed64) {
        self.inner.write().issued.insert(asset_id, amount);
    }

    /// Make every fallible query fail with [`LedgerError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.inner.write().unavailable = unavailable;
    }

    fn check_available(inner: &Inner) -> Result<(), LedgerError> {
        if inner.unavailable {
            return Err(LedgerError::Unavailable("memory ledger offline".into()));
        }
        Ok(())
    }
}

impl LedgerStore for MemoryLedger {
    fn get_transaction(&self, hash: &Hash256) -> Result<Transaction, LedgerError> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        inner
            .transactions
            .get(hash)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("transaction", hash))
    }

    fn get_quantity_issued(&self, asset_id: &Hash256) -> Result<Fixed64, LedgerError> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        Ok(inner.issued.get(asset_id).copied().unwrap_or_default())
    }

    fn get_block(&self, hash: &Hash256) -> Result<Block, LedgerError> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        inner
            .blocks
            .get(hash)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("block", hash))
    }

    fn get_block_hash(&self, height: u32) -> Result<Hash256, LedgerError> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        inner
            .block_hashes
            .get(height as usize)
            .copied()
            .ok_or_else(|| LedgerError::not_found("block at height", height))
    }

    fn get_account(&self, program_hash: &ProgramHash) -> Result<Account, LedgerError> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        inner
            .accounts
            .get(program_hash)
            .cloned()
            .ok_or_else(|| LedgerError::not_found("account", program_hash))
    }

    fn get_header(&self, hash: &Hash256) -> Result<BlockHeader, LedgerError> {
        self.get_block(hash).map(|b| b.header)
    }

    fn contains_transaction(&self, hash: &Hash256) -> Result<bool, LedgerError> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        Ok(inner.transactions.contains_key(hash))
    }

    fn is_double_spend(&self, tx: &Transaction) -> Result<bool, LedgerError> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        Ok(tx.utxo_inputs().iter().any(|i| inner.spent.contains(i)))
    }

    fn current_height(&self) -> u32 {
        let inner = self.inner.read();
        inner.block_hashes.len().saturating_sub(1) as u32
    }

    fn current_block_hash(&self) -> Hash256 {
        self.inner
            .read()
            .block_hashes
            .last()
            .copied()
            .unwrap_or(Hash256::ZERO)
    }

    fn bookkeepers(&self) -> Result<Vec<PublicKey>, LedgerError> {
        let inner = self.inner.read();
        Self::check_available(&inner)?;
        Ok(inner.bookkeepers.clone())
    }
}
