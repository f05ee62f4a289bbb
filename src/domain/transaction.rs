use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Cents, as_decimal};

pub type TransactionId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
    Payment,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdrawal => "withdrawal",
            TransactionKind::Transfer => "transfer",
            TransactionKind::Payment => "payment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(TransactionKind::Deposit),
            "withdrawal" => Some(TransactionKind::Withdrawal),
            "transfer" => Some(TransactionKind::Transfer),
            "payment" => Some(TransactionKind::Payment),
            _ => None,
        }
    }

    /// Withdrawals and payments follow the same debit rule.
    pub fn is_debit(&self) -> bool {
        matches!(self, TransactionKind::Withdrawal | TransactionKind::Payment)
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One movement of money against a single account.
///
/// A transaction is born `pending` and moves to `completed` only once the
/// matching balance mutation has been durably applied. A transfer produces
/// two transactions (debit and credit leg) whose reference numbers share a
/// common prefix with `-OUT`/`-IN` suffixes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    pub kind: TransactionKind,
    /// Amount in cents (always positive).
    #[serde(rename = "amount", with = "as_decimal")]
    pub amount_cents: Cents,
    pub description: String,
    /// Globally unique, human-auditable identifier.
    pub reference_number: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Create a new pending transaction.
    pub fn new(
        account_id: AccountId,
        kind: TransactionKind,
        amount_cents: Cents,
        description: impl Into<String>,
        reference_number: String,
    ) -> Self {
        assert!(amount_cents > 0, "Transaction amount must be positive");
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            account_id,
            kind,
            amount_cents,
            description: description.into(),
            reference_number,
            status: TransactionStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Reference number for a standalone transaction, e.g. "TXN17245728001234".
///
/// Millisecond timestamp plus a random four-digit suffix: collisions are
/// negligible and creation order is roughly preserved for audit display.
/// The database UNIQUE constraint is the actual uniqueness guarantee.
pub fn transaction_reference() -> String {
    format!("TXN{}", reference_suffix())
}

/// Shared prefix for the two legs of a transfer, e.g. "TRF17245728001234".
/// The debit leg appends "-OUT" and the credit leg "-IN" so both legs of
/// one transfer stay correlatable.
pub fn transfer_reference() -> String {
    format!("TRF{}", reference_suffix())
}

fn reference_suffix() -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..10_000);
    format!("{}{:04}", Utc::now().timestamp_millis(), suffix)
}
