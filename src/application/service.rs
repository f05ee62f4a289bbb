use chrono::Utc;

use crate::domain::{
    Account, AccountId, AccountStatus, AccountType, Cents, OwnerId, Transaction, TransactionId,
    TransactionKind, TransactionStatus, format_cents, transaction_reference, transfer_reference,
};
use crate::storage::Repository;

use super::LedgerError;

/// The ledger service: the sole arbiter of whether a balance mutation can
/// happen and whether it did happen.
///
/// Every mutating operation runs inside one immediate database transaction,
/// so the balance check, the transaction records and the balance writes are
/// applied as a single all-or-nothing unit. A transaction record reaches
/// `completed` status only in the same envelope that moved the money.
#[derive(Clone)]
pub struct LedgerService {
    repo: Repository,
}

/// Result of a completed transfer: the debit leg on the source account and
/// the credit leg on the destination account, sharing a reference prefix.
pub struct TransferOutcome {
    pub withdrawal: Transaction,
    pub deposit: Transaction,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a new database at the given path.
    pub async fn init(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, LedgerError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account for an owner: zero balance, active status,
    /// freshly generated account number.
    pub async fn open_account(
        &self,
        owner_id: OwnerId,
        account_type: AccountType,
    ) -> Result<Account, LedgerError> {
        let account = Account::new(owner_id, account_type);
        self.repo
            .save_account(&account)
            .await
            .map_err(LedgerError::from_storage)?;

        tracing::info!(
            account = %account.account_number,
            owner = %owner_id,
            kind = %account_type,
            "account opened"
        );
        Ok(account)
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.repo
            .get_account(id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Get an account by its human-facing account number.
    pub async fn get_account_by_number(&self, number: &str) -> Result<Option<Account>, LedgerError> {
        Ok(self.repo.get_account_by_number(number).await?)
    }

    /// List all accounts belonging to an owner.
    pub async fn list_accounts_for_owner(
        &self,
        owner_id: OwnerId,
    ) -> Result<Vec<Account>, LedgerError> {
        Ok(self.repo.list_accounts_for_owner(owner_id).await?)
    }

    /// Change an account's status (administrative freeze/unfreeze path).
    pub async fn set_account_status(
        &self,
        id: AccountId,
        status: AccountStatus,
    ) -> Result<Account, LedgerError> {
        let account = self
            .repo
            .set_account_status(id, status, Utc::now())
            .await
            .map_err(LedgerError::from_storage)?
            .ok_or(LedgerError::AccountNotFound(id))?;

        tracing::info!(account = %account.account_number, status = %status, "account status changed");
        Ok(account)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Credit an account.
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
        description: impl Into<String>,
    ) -> Result<Transaction, LedgerError> {
        self.apply_single(account_id, TransactionKind::Deposit, amount_cents, description.into())
            .await
    }

    /// Debit an account, failing fast with `InsufficientFunds` before any
    /// write when the balance does not cover the amount.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
        description: impl Into<String>,
    ) -> Result<Transaction, LedgerError> {
        self.apply_single(
            account_id,
            TransactionKind::Withdrawal,
            amount_cents,
            description.into(),
        )
        .await
    }

    /// Debit an account for a payment. Same rule as [`LedgerService::withdraw`],
    /// recorded with the `payment` transaction kind.
    pub async fn pay(
        &self,
        account_id: AccountId,
        amount_cents: Cents,
        description: impl Into<String>,
    ) -> Result<Transaction, LedgerError> {
        self.apply_single(account_id, TransactionKind::Payment, amount_cents, description.into())
            .await
    }

    /// Move money between two accounts.
    ///
    /// Both transaction records, both balance updates and both status
    /// transitions commit together or roll back together; no single-leg
    /// transfer can ever be left half-applied.
    pub async fn transfer(
        &self,
        from_account_id: AccountId,
        to_account_id: AccountId,
        amount_cents: Cents,
        description: impl Into<String>,
    ) -> Result<TransferOutcome, LedgerError> {
        let description = description.into();
        validate_amount(amount_cents)?;
        if from_account_id == to_account_id {
            return Err(LedgerError::SameAccountTransfer);
        }

        let mut tx = self.repo.begin().await.map_err(LedgerError::from_storage)?;

        let from_account = Repository::fetch_account(&mut *tx, from_account_id)
            .await
            .map_err(LedgerError::from_storage)?
            .ok_or(LedgerError::AccountNotFound(from_account_id))?;
        let to_account = Repository::fetch_account(&mut *tx, to_account_id)
            .await
            .map_err(LedgerError::from_storage)?
            .ok_or(LedgerError::AccountNotFound(to_account_id))?;

        require_active(&from_account)?;
        require_active(&to_account)?;

        if from_account.balance_cents < amount_cents {
            return Err(LedgerError::InsufficientFunds {
                account_number: from_account.account_number,
                balance: from_account.balance_cents,
                required: amount_cents,
            });
        }

        let reference = transfer_reference();
        let mut withdrawal = Transaction::new(
            from_account_id,
            TransactionKind::Transfer,
            amount_cents,
            format!("Transfer to {}: {}", to_account.account_number, description),
            format!("{reference}-OUT"),
        );
        let mut deposit = Transaction::new(
            to_account_id,
            TransactionKind::Transfer,
            amount_cents,
            format!(
                "Transfer from {}: {}",
                from_account.account_number, description
            ),
            format!("{reference}-IN"),
        );

        Repository::insert_transaction(&mut *tx, &withdrawal)
            .await
            .map_err(LedgerError::from_storage)?;
        Repository::insert_transaction(&mut *tx, &deposit)
            .await
            .map_err(LedgerError::from_storage)?;

        let now = Utc::now();
        Repository::debit_account(&mut *tx, from_account_id, amount_cents, now)
            .await
            .map_err(LedgerError::from_storage)?
            .ok_or(LedgerError::Conflict)?;
        Repository::credit_account(&mut *tx, to_account_id, amount_cents, now)
            .await
            .map_err(LedgerError::from_storage)?
            .ok_or(LedgerError::Conflict)?;

        Repository::mark_transaction(&mut *tx, withdrawal.id, TransactionStatus::Completed, now)
            .await
            .map_err(LedgerError::from_storage)?;
        Repository::mark_transaction(&mut *tx, deposit.id, TransactionStatus::Completed, now)
            .await
            .map_err(LedgerError::from_storage)?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::from_storage(e.into()))?;

        withdrawal.status = TransactionStatus::Completed;
        withdrawal.updated_at = now;
        deposit.status = TransactionStatus::Completed;
        deposit.updated_at = now;

        tracing::info!(
            reference = %reference,
            amount = %format_cents(amount_cents),
            from = %withdrawal.account_id,
            to = %deposit.account_id,
            "transfer completed"
        );

        Ok(TransferOutcome {
            withdrawal,
            deposit,
        })
    }

    /// Shared path for deposits, withdrawals and payments.
    async fn apply_single(
        &self,
        account_id: AccountId,
        kind: TransactionKind,
        amount_cents: Cents,
        description: String,
    ) -> Result<Transaction, LedgerError> {
        validate_amount(amount_cents)?;

        let mut tx = self.repo.begin().await.map_err(LedgerError::from_storage)?;

        let account = Repository::fetch_account(&mut *tx, account_id)
            .await
            .map_err(LedgerError::from_storage)?
            .ok_or(LedgerError::AccountNotFound(account_id))?;

        require_active(&account)?;

        // Fail fast before any write: no transaction record is persisted
        // for a rejected debit.
        if kind.is_debit() && account.balance_cents < amount_cents {
            return Err(LedgerError::InsufficientFunds {
                account_number: account.account_number,
                balance: account.balance_cents,
                required: amount_cents,
            });
        }

        let mut record = Transaction::new(
            account_id,
            kind,
            amount_cents,
            description,
            transaction_reference(),
        );
        Repository::insert_transaction(&mut *tx, &record)
            .await
            .map_err(LedgerError::from_storage)?;

        let now = Utc::now();
        let updated = if kind.is_debit() {
            Repository::debit_account(&mut *tx, account_id, amount_cents, now).await
        } else {
            Repository::credit_account(&mut *tx, account_id, amount_cents, now).await
        };
        // The guards re-assert status and funds at write time; a miss here
        // means a concurrent change slipped between read and write.
        let updated = updated
            .map_err(LedgerError::from_storage)?
            .ok_or(LedgerError::Conflict)?;

        Repository::mark_transaction(&mut *tx, record.id, TransactionStatus::Completed, now)
            .await
            .map_err(LedgerError::from_storage)?;

        tx.commit()
            .await
            .map_err(|e| LedgerError::from_storage(e.into()))?;

        record.status = TransactionStatus::Completed;
        record.updated_at = now;

        tracing::info!(
            account = %updated.account_number,
            reference = %record.reference_number,
            kind = %kind,
            amount = %format_cents(amount_cents),
            balance = %format_cents(updated.balance_cents),
            "transaction completed"
        );

        Ok(record)
    }

    // ========================
    // Transaction queries
    // ========================

    /// Get a transaction by ID.
    pub async fn get_transaction(&self, id: TransactionId) -> Result<Transaction, LedgerError> {
        self.repo
            .get_transaction(id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// List transactions for one account, newest first.
    pub async fn list_transactions(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, LedgerError> {
        // Resolve the account first so a bad ID is a clean error rather
        // than an empty history.
        let account = self.get_account(account_id).await?;
        Ok(self.repo.list_transactions_for_account(account.id).await?)
    }

    /// List transactions across several accounts, newest first.
    pub async fn list_transactions_for_accounts(
        &self,
        account_ids: &[AccountId],
    ) -> Result<Vec<Transaction>, LedgerError> {
        Ok(self
            .repo
            .list_transactions_for_accounts(account_ids)
            .await?)
    }
}

fn validate_amount(amount_cents: Cents) -> Result<(), LedgerError> {
    if amount_cents <= 0 {
        return Err(LedgerError::InvalidAmount(
            "Amount must be positive".to_string(),
        ));
    }
    Ok(())
}

fn require_active(account: &Account) -> Result<(), LedgerError> {
    if !account.is_active() {
        return Err(LedgerError::AccountNotActive {
            account_number: account.account_number.clone(),
            status: account.status,
        });
    }
    Ok(())
}
