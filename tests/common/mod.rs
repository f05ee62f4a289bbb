// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use cashpoint::application::LedgerService;
use cashpoint::domain::{Account, AccountType, Cents};
use tempfile::TempDir;
use uuid::Uuid;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Open a checking account for a fresh owner and seed it with a balance.
/// Returns the account as persisted after the seed deposit.
pub async fn open_funded_account(service: &LedgerService, balance: Cents) -> Result<Account> {
    let account = service
        .open_account(Uuid::new_v4(), AccountType::Checking)
        .await?;
    if balance > 0 {
        service
            .deposit(account.id, balance, "Opening balance")
            .await?;
    }
    Ok(service.get_account(account.id).await?)
}
