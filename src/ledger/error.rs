use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Insufficient credits: balance {balance}, required {required}")]
    InsufficientBalance { balance: i64, required: u64 },

    #[error("Storage unavailable: {0}")]
    StoreUnavailable(#[from] anyhow::Error),
}
