//! Where consensus finds pending transactions.

use meridian_mempool::TxPool;
use meridian_types::{Hash256, Transaction};
use std::sync::Arc;

/// Read access to validated, not yet committed transactions.
pub trait TransactionProvider: Send + Sync {
    fn get_transaction(&self, hash: &Hash256) -> Option<Arc<Transaction>>;

    /// Candidates for the next proposal, highest fee first, capped at the
    /// block size limit.
    fn proposal_transactions(&self) -> Vec<Arc<Transaction>>;
}

impl TransactionProvider for TxPool {
    fn get_transaction(&self, hash: &Hash256) -> Option<Arc<Transaction>> {
        self.get(hash)
    }

    fn proposal_transactions(&self) -> Vec<Arc<Transaction>> {
        self.ordered_transactions(true)
    }
}
