mod common;

use anyhow::Result;
use cashpoint::application::LedgerError;
use cashpoint::domain::{AccountStatus, AccountType};
use common::{open_funded_account, test_service};
use uuid::Uuid;

#[tokio::test]
async fn test_new_account_starts_empty_and_active() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let owner = Uuid::new_v4();
    let account = service.open_account(owner, AccountType::Checking).await?;

    assert_eq!(account.balance_cents, 0);
    assert_eq!(account.status, AccountStatus::Active);
    assert_eq!(account.owner_id, owner);
    assert!(account.account_number.starts_with("CHE"));

    // The persisted copy matches what was returned
    let stored = service.get_account(account.id).await?;
    assert_eq!(stored.balance_cents, 0);
    assert_eq!(stored.account_number, account.account_number);

    Ok(())
}

#[tokio::test]
async fn test_account_number_prefix_follows_type() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let owner = Uuid::new_v4();

    let savings = service.open_account(owner, AccountType::Savings).await?;
    let investment = service.open_account(owner, AccountType::Investment).await?;

    assert!(savings.account_number.starts_with("SAV"));
    assert!(investment.account_number.starts_with("INV"));

    Ok(())
}

#[tokio::test]
async fn test_list_accounts_only_returns_owner_accounts() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let alice = Uuid::new_v4();
    let bob = Uuid::new_v4();
    service.open_account(alice, AccountType::Checking).await?;
    service.open_account(alice, AccountType::Savings).await?;
    service.open_account(bob, AccountType::Checking).await?;

    let accounts = service.list_accounts_for_owner(alice).await?;
    assert_eq!(accounts.len(), 2);
    assert!(accounts.iter().all(|a| a.owner_id == alice));

    Ok(())
}

#[tokio::test]
async fn test_lookup_by_account_number() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service
        .open_account(Uuid::new_v4(), AccountType::Checking)
        .await?;

    let found = service
        .get_account_by_number(&account.account_number)
        .await?
        .expect("account should be found by number");
    assert_eq!(found.id, account.id);

    assert!(service.get_account_by_number("CHE0000000000000000").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_status_change_roundtrip() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service
        .open_account(Uuid::new_v4(), AccountType::Checking)
        .await?;

    let frozen = service
        .set_account_status(account.id, AccountStatus::Frozen)
        .await?;
    assert_eq!(frozen.status, AccountStatus::Frozen);

    let reactivated = service
        .set_account_status(account.id, AccountStatus::Active)
        .await?;
    assert_eq!(reactivated.status, AccountStatus::Active);

    Ok(())
}

#[tokio::test]
async fn test_status_change_on_missing_account_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service
        .set_account_status(Uuid::new_v4(), AccountStatus::Frozen)
        .await;
    assert!(matches!(result, Err(LedgerError::AccountNotFound(_))));

    Ok(())
}

#[tokio::test]
async fn test_frozen_account_rejects_all_mutations() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let frozen = open_funded_account(&service, 10_000).await?;
    let other = open_funded_account(&service, 10_000).await?;
    service
        .set_account_status(frozen.id, AccountStatus::Frozen)
        .await?;

    let deposit = service.deposit(frozen.id, 5_000, "blocked").await;
    assert!(matches!(deposit, Err(LedgerError::AccountNotActive { .. })));

    let withdraw = service.withdraw(frozen.id, 5_000, "blocked").await;
    assert!(matches!(withdraw, Err(LedgerError::AccountNotActive { .. })));

    let outgoing = service.transfer(frozen.id, other.id, 5_000, "blocked").await;
    assert!(matches!(outgoing, Err(LedgerError::AccountNotActive { .. })));

    let incoming = service.transfer(other.id, frozen.id, 5_000, "blocked").await;
    assert!(matches!(incoming, Err(LedgerError::AccountNotActive { .. })));

    // Nothing moved on either side
    assert_eq!(service.get_account(frozen.id).await?.balance_cents, 10_000);
    assert_eq!(service.get_account(other.id).await?.balance_cents, 10_000);

    Ok(())
}

#[tokio::test]
async fn test_inactive_account_rejects_withdrawals() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = open_funded_account(&service, 10_000).await?;
    service
        .set_account_status(account.id, AccountStatus::Inactive)
        .await?;

    let result = service.withdraw(account.id, 1_000, "blocked").await;
    assert!(matches!(
        result,
        Err(LedgerError::AccountNotActive {
            status: AccountStatus::Inactive,
            ..
        })
    ));
    assert_eq!(service.get_account(account.id).await?.balance_cents, 10_000);

    Ok(())
}

#[tokio::test]
async fn test_updated_at_refreshes_on_mutation() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account = service
        .open_account(Uuid::new_v4(), AccountType::Checking)
        .await?;
    service.deposit(account.id, 1_000, "seed").await?;

    let updated = service.get_account(account.id).await?;
    assert!(updated.updated_at >= account.updated_at);
    assert_eq!(updated.created_at, account.created_at);

    Ok(())
}
