use thiserror::Error;

use stockledger_core::DomainError;

/// Storage failures that are not the caller's fault.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend failure in {operation}: {message}")]
    Backend { operation: &'static str, message: String },

    /// A persisted row no longer satisfies the domain invariants.
    #[error("corrupt stored data: {0}")]
    Corrupt(String),

    #[error("store lock poisoned")]
    LockPoisoned,
}

/// Error returned by every ledger operation.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// The domain error, if this failure is one the caller can act on.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            LedgerError::Domain(e) => Some(e),
            LedgerError::Store(_) => None,
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;
