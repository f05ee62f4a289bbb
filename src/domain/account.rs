use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, as_decimal};

pub type AccountId = Uuid;
pub type OwnerId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Everyday spending account
    Checking,
    /// Interest-bearing savings account
    Savings,
    /// Brokerage-style investment account
    Investment,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Checking => "checking",
            AccountType::Savings => "savings",
            AccountType::Investment => "investment",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "checking" => Some(AccountType::Checking),
            "savings" => Some(AccountType::Savings),
            "investment" => Some(AccountType::Investment),
            _ => None,
        }
    }

    /// Three-letter prefix used when generating account numbers.
    pub fn number_prefix(&self) -> &'static str {
        match self {
            AccountType::Checking => "CHE",
            AccountType::Savings => "SAV",
            AccountType::Investment => "INV",
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
    Frozen,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
            AccountStatus::Frozen => "frozen",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            "frozen" => Some(AccountStatus::Frozen),
            _ => None,
        }
    }

    /// Only active accounts may move money.
    pub fn is_active(&self) -> bool {
        matches!(self, AccountStatus::Active)
    }
}

impl std::fmt::Display for AccountStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A customer account holding a non-negative balance.
///
/// Accounts are created with a zero balance and `active` status, and are
/// never deleted; administrative status changes (`inactive`, `frozen`) are
/// the only soft-lifecycle transitions. The balance is mutated exclusively
/// through ledger operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub owner_id: OwnerId,
    pub account_type: AccountType,
    /// Unique human-facing identifier, e.g. "CHE1724572800123042".
    pub account_number: String,
    /// Current balance in cents; never negative after a successful operation.
    #[serde(rename = "balance", with = "as_decimal")]
    pub balance_cents: Cents,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Open a new account with a freshly generated account number,
    /// zero balance and active status.
    pub fn new(owner_id: OwnerId, account_type: AccountType) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            owner_id,
            account_type,
            account_number: generate_account_number(account_type),
            balance_cents: 0,
            status: AccountStatus::Active,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// Generate a human-facing account number: type prefix, millisecond
/// timestamp and a random three-digit suffix. The timestamp keeps numbers
/// roughly ordered by creation time; the database enforces uniqueness.
pub fn generate_account_number(account_type: AccountType) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1000);
    format!(
        "{}{}{:03}",
        account_type.number_prefix(),
        Utc::now().timestamp_millis(),
        suffix
    )
}
