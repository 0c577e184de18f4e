//! Messages relayed to every peer.

mod transaction;

pub use transaction::TransactionGossip;
