//! Transaction pool for the Meridian node.
//!
//! Incoming transactions pass three gates before they are pooled:
//!
//! 1. [`verify_transaction`]: structure, asset precision and witnesses
//!    (each witness runs in the VM against the transaction)
//! 2. [`verify_transaction_with_ledger`]: duplicates and spends on chain,
//!    reference resolution, balance
//! 3. [`TxPool::append`]: conflicts with other pooled transactions and the
//!    pending issuance quota, checked under the pool's write lock
//!
//! Input conflicts inside the pool resolve in favour of the newer
//! transaction regardless of fee.

mod config;
mod error;
mod pool;
mod validation;

pub use config::{MempoolConfig, DEFAULT_MAX_TX_IN_BLOCK};
pub use error::ErrCode;
pub use pool::{PoolTransaction, TxPool};
pub use validation::{verify_transaction, verify_transaction_with_ledger};
