use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{Row, Sqlite, SqliteExecutor, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Account, AccountId, AccountStatus, AccountType, Cents, OwnerId, Transaction, TransactionId,
    TransactionKind, TransactionStatus,
};

use super::MIGRATION_001_INITIAL;

/// How long a writer waits on the database lock before the operation is
/// surfaced as a retryable conflict instead of hanging.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Repository for persisting and querying accounts and transactions.
///
/// This is the record store the ledger service orchestrates mutations
/// against; SQLite owns durability. Multi-write operations run inside an
/// immediate transaction obtained from [`Repository::begin`], so they are
/// applied all-or-nothing and writers serialize.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;

        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Begin a write transaction.
    ///
    /// `BEGIN IMMEDIATE` takes the write lock up front, so concurrent
    /// mutations of the same database serialize instead of racing between
    /// their reads and writes. Dropping the returned transaction without
    /// committing rolls every statement back.
    pub async fn begin(&self) -> Result<sqlx::Transaction<'static, Sqlite>> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .context("Failed to begin write transaction")
    }

    // ========================
    // Account operations
    // ========================

    /// Save a new account to the database.
    pub async fn save_account(&self, account: &Account) -> Result<()> {
        Self::insert_account(&self.pool, account).await
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        Self::fetch_account(&self.pool, id).await
    }

    /// Get an account by its human-facing account number.
    pub async fn get_account_by_number(&self, number: &str) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = ?"
        ))
        .bind(number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account by number")?;

        row.as_ref().map(row_to_account).transpose()
    }

    /// List all accounts belonging to an owner, oldest first.
    pub async fn list_accounts_for_owner(&self, owner_id: OwnerId) -> Result<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE owner_id = ? ORDER BY created_at"
        ))
        .bind(owner_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list accounts for owner")?;

        rows.iter().map(row_to_account).collect()
    }

    /// Set an account's status (the administrative freeze/unfreeze path).
    /// Returns the updated account, or `None` if it does not exist.
    pub async fn set_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "UPDATE accounts SET status = ?, updated_at = ? WHERE id = ? RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(status.as_str())
        .bind(updated_at.to_rfc3339())
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to update account status")?;

        row.as_ref().map(row_to_account).transpose()
    }

    /// Insert an account using the given executor (pool or open transaction).
    pub async fn insert_account(
        executor: impl SqliteExecutor<'_>,
        account: &Account,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO accounts (id, owner_id, account_type, account_number, balance_cents, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(account.id.to_string())
        .bind(account.owner_id.to_string())
        .bind(account.account_type.as_str())
        .bind(&account.account_number)
        .bind(account.balance_cents)
        .bind(account.status.as_str())
        .bind(account.created_at.to_rfc3339())
        .bind(account.updated_at.to_rfc3339())
        .execute(executor)
        .await
        .context("Failed to save account")?;
        Ok(())
    }

    /// Fetch an account using the given executor (pool or open transaction).
    pub async fn fetch_account(
        executor: impl SqliteExecutor<'_>,
        id: AccountId,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(row_to_account).transpose()
    }

    /// Credit an account balance. The status guard is re-asserted at write
    /// time; returns the updated account or `None` if the guard failed.
    pub async fn credit_account(
        executor: impl SqliteExecutor<'_>,
        id: AccountId,
        amount_cents: Cents,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents + ?, updated_at = ?
            WHERE id = ? AND status = 'active'
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(amount_cents)
        .bind(updated_at.to_rfc3339())
        .bind(id.to_string())
        .fetch_optional(executor)
        .await
        .context("Failed to credit account")?;

        row.as_ref().map(row_to_account).transpose()
    }

    /// Debit an account balance. The status and sufficient-funds guards are
    /// re-asserted at write time so a stale read can never drive the balance
    /// negative; returns the updated account or `None` if a guard failed.
    pub async fn debit_account(
        executor: impl SqliteExecutor<'_>,
        id: AccountId,
        amount_cents: Cents,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Account>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE accounts
            SET balance_cents = balance_cents - ?, updated_at = ?
            WHERE id = ? AND status = 'active' AND balance_cents >= ?
            RETURNING {ACCOUNT_COLUMNS}
            "#
        ))
        .bind(amount_cents)
        .bind(updated_at.to_rfc3339())
        .bind(id.to_string())
        .bind(amount_cents)
        .fetch_optional(executor)
        .await
        .context("Failed to debit account")?;

        row.as_ref().map(row_to_account).transpose()
    }

    // ========================
    // Transaction operations
    // ========================

    /// Insert a transaction using the given executor (pool or open transaction).
    pub async fn insert_transaction(
        executor: impl SqliteExecutor<'_>,
        transaction: &Transaction,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO transactions (id, account_id, kind, amount_cents, description, reference_number, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(transaction.id.to_string())
        .bind(transaction.account_id.to_string())
        .bind(transaction.kind.as_str())
        .bind(transaction.amount_cents)
        .bind(&transaction.description)
        .bind(&transaction.reference_number)
        .bind(transaction.status.as_str())
        .bind(transaction.created_at.to_rfc3339())
        .bind(transaction.updated_at.to_rfc3339())
        .execute(executor)
        .await
        .context("Failed to save transaction")?;

        Ok(())
    }

    /// Update a transaction's status.
    pub async fn mark_transaction(
        executor: impl SqliteExecutor<'_>,
        id: TransactionId,
        status: TransactionStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE transactions SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(updated_at.to_rfc3339())
            .bind(id.to_string())
            .execute(executor)
            .await
            .context("Failed to update transaction status")?;

        Ok(())
    }

    /// Get a transaction by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>> {
        let row = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch transaction")?;

        row.as_ref().map(row_to_transaction).transpose()
    }

    /// List transactions for one account, newest first.
    pub async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id = ? ORDER BY created_at DESC"
        ))
        .bind(account_id.to_string())
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(row_to_transaction).collect()
    }

    /// List transactions across several accounts, newest first.
    pub async fn list_transactions_for_accounts(
        &self,
        account_ids: &[AccountId],
    ) -> Result<Vec<Transaction>> {
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; account_ids.len()].join(", ");
        let query = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE account_id IN ({placeholders}) ORDER BY created_at DESC"
        );

        let mut sql_query = sqlx::query(&query);
        for id in account_ids {
            sql_query = sql_query.bind(id.to_string());
        }

        let rows = sql_query
            .fetch_all(&self.pool)
            .await
            .context("Failed to list transactions for accounts")?;

        rows.iter().map(row_to_transaction).collect()
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, owner_id, account_type, account_number, balance_cents, status, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, account_id, kind, amount_cents, description, reference_number, status, created_at, updated_at";

fn row_to_account(row: &SqliteRow) -> Result<Account> {
    let id_str: String = row.get("id");
    let owner_str: String = row.get("owner_id");
    let type_str: String = row.get("account_type");
    let status_str: String = row.get("status");

    Ok(Account {
        id: Uuid::parse_str(&id_str).context("Invalid account ID")?,
        owner_id: Uuid::parse_str(&owner_str).context("Invalid owner ID")?,
        account_type: AccountType::from_str(&type_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid account type: {}", type_str))?,
        account_number: row.get("account_number"),
        balance_cents: row.get("balance_cents"),
        status: AccountStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid account status: {}", status_str))?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
    let id_str: String = row.get("id");
    let account_str: String = row.get("account_id");
    let kind_str: String = row.get("kind");
    let status_str: String = row.get("status");

    Ok(Transaction {
        id: Uuid::parse_str(&id_str).context("Invalid transaction ID")?,
        account_id: Uuid::parse_str(&account_str).context("Invalid account ID")?,
        kind: TransactionKind::from_str(&kind_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction kind: {}", kind_str))?,
        amount_cents: row.get("amount_cents"),
        description: row.get("description"),
        reference_number: row.get("reference_number"),
        status: TransactionStatus::from_str(&status_str)
            .ok_or_else(|| anyhow::anyhow!("Invalid transaction status: {}", status_str))?,
        created_at: parse_timestamp(row, "created_at")?,
        updated_at: parse_timestamp(row, "updated_at")?,
    })
}

fn parse_timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>> {
    let raw: String = row.get(column);
    Ok(DateTime::parse_from_rfc3339(&raw)
        .with_context(|| format!("Invalid {} timestamp", column))?
        .with_timezone(&Utc))
}
