use meridian_types::{LedgerError, TransactionError};
use thiserror::Error;

/// Why a transaction was refused by validation or by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ErrCode {
    #[error("unknown error")]
    Unknown,

    #[error("transaction already in pool")]
    DuplicatedTx,

    #[error("transaction spends the same input twice")]
    DuplicateInput,

    #[error("output value does not fit the asset precision")]
    AssetPrecision,

    #[error("inputs and outputs do not balance")]
    TransactionBalance,

    #[error("invalid attribute program")]
    AttributeProgram,

    #[error("witness verification failed: {0}")]
    TransactionContracts(String),

    #[error("invalid payload: {0}")]
    TransactionPayload(String),

    #[error("input already spent on chain")]
    DoubleSpend,

    #[error("transaction already on chain")]
    TxHashDuplicate,

    #[error("issuance exceeds registered amount")]
    SummaryAsset,

    #[error("ledger unavailable: {0}")]
    LedgerUnavailable(#[from] LedgerError),

    #[error("malformed transaction: {0}")]
    Structural(String),
}

impl From<TransactionError> for ErrCode {
    fn from(err: TransactionError) -> Self {
        match err {
            TransactionError::Ledger(e) => Self::LedgerUnavailable(e),
            TransactionError::OutputIndexOutOfRange { .. } => Self::Structural(err.to_string()),
            TransactionError::NotRegisterAsset(_) => Self::TransactionPayload(err.to_string()),
            TransactionError::InvalidScriptAttribute => Self::AttributeProgram,
            TransactionError::NegativeNetworkFee(_) => Self::TransactionBalance,
        }
    }
}
