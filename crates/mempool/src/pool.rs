//! The pending transaction pool.

use crate::config::MempoolConfig;
use crate::error::ErrCode;
use crate::validation::{verify_transaction, verify_transaction_with_ledger};
use meridian_types::{
    Block, Fixed64, Hash256, LedgerStore, Payload, Transaction, TransactionType, UtxoInput,
};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// A validated transaction and the network fee it pays.
#[derive(Debug, Clone)]
pub struct PoolTransaction {
    pub tx: Arc<Transaction>,
    pub fee: Fixed64,
}

/// Registered supply and on-chain issuance of an asset, read from the
/// ledger before the pool lock is taken.
#[derive(Debug, Clone, Copy)]
struct IssueQuota {
    registered: Fixed64,
    issued: Fixed64,
    delta: Fixed64,
}

#[derive(Default)]
struct Inner {
    tx_index: HashMap<Hash256, PoolTransaction>,
    issued_summary: HashMap<Hash256, Fixed64>,
    spent_inputs: HashMap<UtxoInput, Hash256>,
}

impl Inner {
    fn insert(&mut self, entry: PoolTransaction) {
        let hash = entry.tx.hash();
        for input in entry.tx.utxo_inputs() {
            self.spent_inputs.insert(*input, hash);
        }
        if entry.tx.tx_type() == TransactionType::IssueAsset {
            for (asset_id, delta) in entry.tx.merged_outputs() {
                *self.issued_summary.entry(asset_id).or_default() += delta;
            }
        }
        self.tx_index.insert(hash, entry);
    }

    /// Remove `hash` with its input claims and pending issuance.
    fn evict(&mut self, hash: &Hash256) -> Option<PoolTransaction> {
        let entry = self.tx_index.remove(hash)?;
        for input in entry.tx.utxo_inputs() {
            if self.spent_inputs.get(input) == Some(hash) {
                self.spent_inputs.remove(input);
            }
        }
        if entry.tx.tx_type() == TransactionType::IssueAsset {
            for (asset_id, delta) in entry.tx.merged_outputs() {
                self.decrease_issued(&asset_id, delta);
            }
        }
        Some(entry)
    }

    /// Subtract from the pending issuance. An asset with nothing left
    /// pending loses its entry.
    fn decrease_issued(&mut self, asset_id: &Hash256, delta: Fixed64) {
        if let Some(amount) = self.issued_summary.get_mut(asset_id) {
            let remaining = *amount - delta;
            if remaining.is_negative() || remaining.is_zero() {
                self.issued_summary.remove(asset_id);
            } else {
                *amount = remaining;
            }
        }
    }

    /// Pooled transactions holding a claim on any of `inputs`.
    fn conflicts(&self, inputs: &[UtxoInput]) -> HashSet<Hash256> {
        inputs
            .iter()
            .filter_map(|input| self.spent_inputs.get(input).copied())
            .collect()
    }

    /// Pending issuance of `asset_id` once `victims` have been evicted.
    fn pending_issuance(&self, asset_id: &Hash256, victims: &HashSet<Hash256>) -> Fixed64 {
        let mut pending = self
            .issued_summary
            .get(asset_id)
            .copied()
            .unwrap_or_default();
        for victim in victims {
            if let Some(entry) = self.tx_index.get(victim) {
                if entry.tx.tx_type() == TransactionType::IssueAsset {
                    if let Some(delta) = entry.tx.merged_outputs().get(asset_id) {
                        pending -= *delta;
                    }
                }
            }
        }
        if pending.is_negative() {
            Fixed64::ZERO
        } else {
            pending
        }
    }

    fn sorted_by_fee(&self) -> Vec<&PoolTransaction> {
        let mut entries: Vec<&PoolTransaction> = self.tx_index.values().collect();
        entries.sort_by(|a, b| {
            b.fee
                .cmp(&a.fee)
                .then_with(|| a.tx.hash().cmp(&b.tx.hash()))
        });
        entries
    }
}

/// Validated transactions waiting for a block.
///
/// All three indexes live behind one lock, so a reader never sees a
/// transaction without its input claims or issuance.
pub struct TxPool {
    config: MempoolConfig,
    ledger: Arc<dyn LedgerStore>,
    inner: RwLock<Inner>,
}

impl TxPool {
    pub fn new(config: MempoolConfig, ledger: Arc<dyn LedgerStore>) -> Self {
        Self {
            config,
            ledger,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn config(&self) -> &MempoolConfig {
        &self.config
    }

    /// Validate `tx` and admit it.
    ///
    /// A transaction that spends an input already claimed by a pooled
    /// transaction evicts that transaction. Admission is all-or-nothing:
    /// a rejected transaction leaves the pool untouched.
    #[instrument(skip(self, tx), fields(tx_hash = %tx.hash(), tx_type = %tx.tx_type()))]
    pub fn append(&self, tx: Transaction) -> Result<Arc<Transaction>, ErrCode> {
        let ledger = self.ledger.as_ref();
        let hash = tx.hash();

        if self.contains(&hash) {
            return Err(ErrCode::DuplicatedTx);
        }
        if let Err(e) = verify_transaction(&tx, ledger) {
            info!(error = %e, "transaction verification failed");
            return Err(e);
        }
        if let Err(e) = verify_transaction_with_ledger(&tx, ledger, &self.config.utility_asset) {
            info!(error = %e, "transaction verification with ledger failed");
            return Err(e);
        }

        let fee = tx.network_fee(ledger, &self.config.utility_asset)?;
        let quotas = self.issue_quotas(&tx)?;
        let tx = Arc::new(tx);

        let mut inner = self.inner.write();
        if inner.tx_index.contains_key(&hash) {
            return Err(ErrCode::DuplicatedTx);
        }

        let victims = inner.conflicts(tx.utxo_inputs());
        for (asset_id, quota) in &quotas {
            let pending = inner.pending_issuance(asset_id, &victims);
            if quota.registered < quota.issued + pending + quota.delta {
                info!(
                    asset = %asset_id,
                    registered = %quota.registered,
                    issued = %quota.issued,
                    pending = %pending,
                    delta = %quota.delta,
                    "issuance exceeds registered amount"
                );
                return Err(ErrCode::SummaryAsset);
            }
        }

        for victim in &victims {
            if inner.evict(victim).is_some() {
                info!(evicted = %victim, "input conflict, keeping the newer transaction");
            }
        }
        inner.insert(PoolTransaction {
            tx: Arc::clone(&tx),
            fee,
        });
        debug!(pool_size = inner.tx_index.len(), fee = %fee, "transaction added to pool");
        Ok(tx)
    }

    /// Quota inputs for each asset an IssueAsset transaction mints. Assets
    /// registered with a negative (unlimited) amount are skipped.
    fn issue_quotas(&self, tx: &Transaction) -> Result<BTreeMap<Hash256, IssueQuota>, ErrCode> {
        let mut quotas = BTreeMap::new();
        if tx.tx_type() != TransactionType::IssueAsset {
            return Ok(quotas);
        }
        for (asset_id, delta) in tx.merged_outputs() {
            let registration = self.ledger.get_transaction(&asset_id)?;
            let Payload::RegisterAsset { amount, .. } = registration.payload() else {
                return Err(ErrCode::SummaryAsset);
            };
            if amount.is_negative() {
                continue;
            }
            let issued = self.ledger.get_quantity_issued(&asset_id)?;
            quotas.insert(
                asset_id,
                IssueQuota {
                    registered: *amount,
                    issued,
                    delta,
                },
            );
        }
        Ok(quotas)
    }

    /// Fee-descending snapshot and the summed network fee. With `by_count`
    /// the snapshot is capped at `max_tx_in_block`.
    pub fn get_ordered(&self, by_count: bool) -> (HashMap<Hash256, Arc<Transaction>>, Fixed64) {
        let ordered = self.ordered_entries(by_count);
        let fee: Fixed64 = ordered.iter().map(|e| e.fee).sum();
        let map = ordered
            .into_iter()
            .map(|e| (e.tx.hash(), e.tx))
            .collect();
        (map, fee)
    }

    /// Same selection as [`TxPool::get_ordered`], highest fee first.
    pub fn ordered_transactions(&self, by_count: bool) -> Vec<Arc<Transaction>> {
        self.ordered_entries(by_count)
            .into_iter()
            .map(|e| e.tx)
            .collect()
    }

    fn ordered_entries(&self, by_count: bool) -> Vec<PoolTransaction> {
        let inner = self.inner.read();
        let sorted = inner.sorted_by_fee();
        let limit = if by_count && self.config.max_tx_in_block > 0 {
            self.config.max_tx_in_block.min(sorted.len())
        } else {
            sorted.len()
        };
        sorted.into_iter().take(limit).cloned().collect()
    }

    /// Drop everything `block` made obsolete: its own transactions, their
    /// input claims and pending issuance, and any pooled transaction that
    /// spends an input the block consumed.
    #[instrument(skip(self, block), fields(height = block.height(), tx_count = block.transactions.len()))]
    pub fn clean_submitted(&self, block: &Block) {
        let block_hashes: HashSet<Hash256> = block.transactions.iter().map(|t| t.hash()).collect();
        let mut inner = self.inner.write();

        let mut cleaned = 0usize;
        for tx in block.user_transactions() {
            if inner.tx_index.remove(&tx.hash()).is_some() {
                cleaned += 1;
            }
        }

        let mut conflicting = HashSet::new();
        for tx in &block.transactions {
            for input in tx.utxo_inputs() {
                if let Some(owner) = inner.spent_inputs.remove(input) {
                    if !block_hashes.contains(&owner) {
                        conflicting.insert(owner);
                    }
                }
            }
            if tx.tx_type() == TransactionType::IssueAsset {
                for (asset_id, delta) in tx.merged_outputs() {
                    inner.decrease_issued(&asset_id, delta);
                }
            }
        }

        for hash in &conflicting {
            if inner.evict(hash).is_some() {
                debug!(evicted = %hash, "input consumed by block");
            }
        }

        debug!(
            cleaned,
            evicted = conflicting.len(),
            remaining = inner.tx_index.len(),
            "cleaned submitted transactions"
        );
    }

    pub fn get(&self, hash: &Hash256) -> Option<Arc<Transaction>> {
        self.inner.read().tx_index.get(hash).map(|e| Arc::clone(&e.tx))
    }

    pub fn contains(&self, hash: &Hash256) -> bool {
        self.inner.read().tx_index.contains_key(hash)
    }

    pub fn count(&self) -> usize {
        self.inner.read().tx_index.len()
    }

    pub fn list_hashes(&self) -> Vec<Hash256> {
        self.inner.read().tx_index.keys().copied().collect()
    }

    /// Pending (not yet persisted) issuance of `asset_id`.
    pub fn issued_summary(&self, asset_id: &Hash256) -> Fixed64 {
        self.inner
            .read()
            .issued_summary
            .get(asset_id)
            .copied()
            .unwrap_or_default()
    }

    /// Pooled transaction claiming `input`, if any.
    pub fn spent_by(&self, input: &UtxoInput) -> Option<Hash256> {
        self.inner.read().spent_inputs.get(input).copied()
    }
}

impl std::fmt::Debug for TxPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TxPool")
            .field("count", &self.count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
