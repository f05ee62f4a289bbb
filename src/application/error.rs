use thiserror::Error;

use crate::domain::{AccountId, AccountStatus, Cents, TransactionId};

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Insufficient funds in account {account_number}: balance {balance}, required {required}")]
    InsufficientFunds {
        account_number: String,
        balance: Cents,
        required: Cents,
    },

    #[error("Account {account_number} is {status}; only active accounts can move money")]
    AccountNotActive {
        account_number: String,
        status: AccountStatus,
    },

    #[error("Cannot transfer from an account to itself")]
    SameAccountTransfer,

    #[error("Duplicate reference number: {0}")]
    DuplicateReference(String),

    #[error("Operation conflicted with a concurrent update; safe to retry")]
    Conflict,

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    /// Classify a storage-layer failure. Uniqueness violations become
    /// [`LedgerError::DuplicateReference`] and SQLite busy errors become the
    /// retryable [`LedgerError::Conflict`]; everything else stays opaque.
    pub(crate) fn from_storage(err: anyhow::Error) -> Self {
        if let Some(sqlx::Error::Database(db_err)) = err.downcast_ref::<sqlx::Error>() {
            if db_err.is_unique_violation() {
                return LedgerError::DuplicateReference(db_err.message().to_string());
            }

            // SQLITE_BUSY and its extended codes surface lock contention.
            if matches!(
                db_err.code().as_deref(),
                Some("5") | Some("261") | Some("517")
            ) {
                return LedgerError::Conflict;
            }
        }

        LedgerError::Storage(err)
    }

    /// Whether the caller may retry the operation with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Conflict | LedgerError::Storage(_))
    }
}
