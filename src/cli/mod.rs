use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use crate::application::LedgerService;
use crate::domain::{AccountStatus, AccountType, Transaction, format_cents, parse_cents};

/// CashPoint - core banking ledger
#[derive(Parser)]
#[command(name = "cashpoint")]
#[command(about = "Move money between accounts with an auditable transaction trail")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "cashpoint.db")]
    pub database: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Open a new account for an owner
    Open {
        /// Owner (user) ID
        owner: String,

        /// Account type: checking, savings, investment
        #[arg(short = 't', long, default_value = "checking")]
        account_type: String,
    },

    /// Deposit money into an account
    Deposit {
        /// Account ID
        account: String,

        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,

        /// Description of the deposit
        #[arg(short, long, default_value = "Deposit")]
        description: String,
    },

    /// Withdraw money from an account
    Withdraw {
        /// Account ID
        account: String,

        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,

        /// Description of the withdrawal
        #[arg(short, long, default_value = "Withdrawal")]
        description: String,
    },

    /// Pay from an account (same rule as withdraw, recorded as a payment)
    Pay {
        /// Account ID
        account: String,

        /// Amount to pay (e.g., "50.00" or "50")
        amount: String,

        /// Description of the payment
        #[arg(short, long, default_value = "Payment")]
        description: String,
    },

    /// Transfer money between two accounts
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Source account ID
        #[arg(long)]
        from: String,

        /// Destination account ID
        #[arg(long)]
        to: String,

        /// Description of the transfer
        #[arg(short, long, default_value = "Transfer")]
        description: String,
    },

    /// Show an account and its balance
    Balance {
        /// Account ID
        account: String,
    },

    /// List all accounts belonging to an owner
    Accounts {
        /// Owner (user) ID
        owner: String,
    },

    /// Show transaction history for an account, newest first
    History {
        /// Account ID
        account: String,

        /// Maximum number of transactions to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Change an account's status (active, inactive, frozen)
    SetStatus {
        /// Account ID
        account: String,

        /// New status
        status: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Open {
                owner,
                account_type,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let owner_id = parse_id(&owner, "owner")?;
                let account_type = AccountType::from_str(&account_type).with_context(|| {
                    format!(
                        "Invalid account type '{}'. Use checking, savings or investment",
                        account_type
                    )
                })?;

                let account = service.open_account(owner_id, account_type).await?;
                println!(
                    "Opened {} account {} ({})",
                    account.account_type, account.account_number, account.id
                );
            }

            Commands::Deposit {
                account,
                amount,
                description,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let account_id = parse_id(&account, "account")?;
                let amount_cents = parse_amount(&amount)?;

                let txn = service.deposit(account_id, amount_cents, description).await?;
                print_transaction_result("Deposited", &txn);
            }

            Commands::Withdraw {
                account,
                amount,
                description,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let account_id = parse_id(&account, "account")?;
                let amount_cents = parse_amount(&amount)?;

                let txn = service
                    .withdraw(account_id, amount_cents, description)
                    .await?;
                print_transaction_result("Withdrew", &txn);
            }

            Commands::Pay {
                account,
                amount,
                description,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let account_id = parse_id(&account, "account")?;
                let amount_cents = parse_amount(&amount)?;

                let txn = service.pay(account_id, amount_cents, description).await?;
                print_transaction_result("Paid", &txn);
            }

            Commands::Transfer {
                amount,
                from,
                to,
                description,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let from_id = parse_id(&from, "source account")?;
                let to_id = parse_id(&to, "destination account")?;
                let amount_cents = parse_amount(&amount)?;

                let outcome = service
                    .transfer(from_id, to_id, amount_cents, description)
                    .await?;
                println!(
                    "Transferred {} ({} / {})",
                    format_cents(outcome.withdrawal.amount_cents),
                    outcome.withdrawal.reference_number,
                    outcome.deposit.reference_number
                );
            }

            Commands::Balance { account } => {
                let service = LedgerService::connect(&self.database).await?;
                let account_id = parse_id(&account, "account")?;

                let account = service.get_account(account_id).await?;
                println!(
                    "{} [{}] {}: {}",
                    account.account_number,
                    account.account_type,
                    account.status,
                    format_cents(account.balance_cents)
                );
            }

            Commands::Accounts { owner } => {
                let service = LedgerService::connect(&self.database).await?;
                let owner_id = parse_id(&owner, "owner")?;

                let accounts = service.list_accounts_for_owner(owner_id).await?;
                if accounts.is_empty() {
                    println!("No accounts for owner {}", owner_id);
                }
                for account in accounts {
                    println!(
                        "{}  {}  [{}] {}  {}",
                        account.id,
                        account.account_number,
                        account.account_type,
                        account.status,
                        format_cents(account.balance_cents)
                    );
                }
            }

            Commands::History { account, limit } => {
                let service = LedgerService::connect(&self.database).await?;
                let account_id = parse_id(&account, "account")?;

                let transactions = service.list_transactions(account_id).await?;
                let shown = limit.unwrap_or(transactions.len());
                for txn in transactions.iter().take(shown) {
                    println!(
                        "{}  {:<10}  {:>12}  [{}]  {}",
                        txn.created_at.format("%Y-%m-%d %H:%M:%S"),
                        txn.kind.to_string(),
                        format_cents(txn.amount_cents),
                        txn.status,
                        txn.description
                    );
                }
            }

            Commands::SetStatus { account, status } => {
                let service = LedgerService::connect(&self.database).await?;
                let account_id = parse_id(&account, "account")?;
                let status = AccountStatus::from_str(&status).with_context(|| {
                    format!(
                        "Invalid status '{}'. Use active, inactive or frozen",
                        status
                    )
                })?;

                let account = service.set_account_status(account_id, status).await?;
                println!("{} is now {}", account.account_number, account.status);
            }
        }

        Ok(())
    }
}

fn parse_id(raw: &str, what: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("Invalid {} ID (expected UUID): {}", what, raw))
}

fn parse_amount(raw: &str) -> Result<i64> {
    parse_cents(raw).context("Invalid amount format. Use '50.00' or '50'")
}

fn print_transaction_result(verb: &str, txn: &Transaction) {
    println!(
        "{} {} ({}, {})",
        verb,
        format_cents(txn.amount_cents),
        txn.reference_number,
        txn.status
    );
}
