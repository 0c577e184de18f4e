//! Point-to-point requests.

mod transaction;

pub use transaction::GetTransactionsRequest;
