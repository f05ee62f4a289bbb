mod common;

use anyhow::Result;
use cashpoint::application::LedgerError;
use common::{open_funded_account, test_service};

/// Two concurrent withdrawals racing for the same balance: exactly one may
/// win. The loser sees `InsufficientFunds` once the winner has committed,
/// or `Conflict` if it lost the write lock, but the balance can never go
/// negative and never reflects both debits.
#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_withdrawals_never_double_spend() -> Result<()> {
    let (service, _temp) = test_service().await?;

    // Balance 100.00, two concurrent withdrawals of 60.00
    let account = open_funded_account(&service, 10_000).await?;

    let first = {
        let service = service.clone();
        let id = account.id;
        tokio::spawn(async move { service.withdraw(id, 6_000, "first").await })
    };
    let second = {
        let service = service.clone();
        let id = account.id;
        tokio::spawn(async move { service.withdraw(id, 6_000, "second").await })
    };

    let results = [first.await?, second.await?];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one withdrawal may succeed");

    for result in &results {
        if let Err(err) = result {
            assert!(
                matches!(
                    err,
                    LedgerError::InsufficientFunds { .. } | LedgerError::Conflict
                ),
                "unexpected failure: {err}"
            );
        }
    }

    let updated = service.get_account(account.id).await?;
    assert_eq!(updated.balance_cents, 4_000);

    // Only the winning withdrawal left a record next to the seed deposit
    let history = service.list_transactions(account.id).await?;
    assert_eq!(history.len(), 2);

    Ok(())
}

/// Concurrent transfers in opposite directions between the same two
/// accounts must both settle (or one may fail retryably), without deadlock
/// and without breaking the conservation law.
#[tokio::test(flavor = "multi_thread")]
async fn test_opposing_transfers_conserve_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let a = open_funded_account(&service, 10_000).await?;
    let b = open_funded_account(&service, 10_000).await?;

    let ab = {
        let service = service.clone();
        let (from, to) = (a.id, b.id);
        tokio::spawn(async move { service.transfer(from, to, 3_000, "a to b").await })
    };
    let ba = {
        let service = service.clone();
        let (from, to) = (b.id, a.id);
        tokio::spawn(async move { service.transfer(from, to, 2_000, "b to a").await })
    };

    for result in [ab.await?, ba.await?] {
        if let Err(err) = result {
            assert!(matches!(err, LedgerError::Conflict), "unexpected failure: {err}");
        }
    }

    let total = service.get_account(a.id).await?.balance_cents
        + service.get_account(b.id).await?.balance_cents;
    assert_eq!(total, 20_000, "opposing transfers must conserve total balance");

    Ok(())
}
