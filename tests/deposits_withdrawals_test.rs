mod common;

use anyhow::Result;
use common::{test_service, TestAccount};
use ledgerbank::application::AppError;
use ledgerbank::domain::TransactionType;

#[tokio::test]
async fn test_deposit_increases_balance_and_records_row() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = TestAccount::open(&service, "amara").await?;

    let balance = service.deposit(&account.session, 10000).await?;
    assert_eq!(balance, 10000);
    assert_eq!(service.balance(&account.session).await?, 10000);

    let transactions = service.transactions(&account.session).await?;
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0].account_number, account.account_number);
    assert_eq!(transactions[0].transaction_type, TransactionType::Deposit);
    assert_eq!(transactions[0].amount, 10000);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_records_positive_amount() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = TestAccount::funded(&service, "bongani", 10000).await?;

    let balance = service.withdraw(&account.session, 3000).await?;
    assert_eq!(balance, 7000);

    let transactions = service.transactions(&account.session).await?;
    assert_eq!(transactions.len(), 2);
    // Newest first
    assert_eq!(transactions[0].transaction_type, TransactionType::Withdraw);
    assert_eq!(transactions[0].amount, 3000);
    assert_eq!(transactions[1].transaction_type, TransactionType::Deposit);

    Ok(())
}

#[tokio::test]
async fn test_balance_after_deposits_and_withdrawals() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = TestAccount::open(&service, "chipo").await?;

    let deposits = [2500, 10000, 1, 499, 75000];
    let withdrawals = [1000, 20000, 1];

    for amount in deposits {
        service.deposit(&account.session, amount).await?;
    }
    for amount in withdrawals {
        service.withdraw(&account.session, amount).await?;
    }

    let expected: i64 = deposits.iter().sum::<i64>() - withdrawals.iter().sum::<i64>();
    assert_eq!(service.balance(&account.session).await?, expected);
    assert_eq!(
        service.transactions(&account.session).await?.len(),
        deposits.len() + withdrawals.len()
    );

    Ok(())
}

#[tokio::test]
async fn test_non_positive_amounts_are_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = TestAccount::funded(&service, "dumisani", 5000).await?;

    for amount in [0, -1, -5000] {
        assert!(matches!(
            service.deposit(&account.session, amount).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.withdraw(&account.session, amount).await,
            Err(AppError::Validation(_))
        ));
    }

    assert_eq!(service.balance(&account.session).await?, 5000);
    assert_eq!(service.transactions(&account.session).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_more_than_balance_leaves_state_unchanged() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = TestAccount::funded(&service, "ebo", 7000).await?;

    let result = service.withdraw(&account.session, 100000).await;
    match result {
        Err(AppError::InsufficientFunds { balance, requested }) => {
            assert_eq!(balance, 7000);
            assert_eq!(requested, 100000);
        }
        other => panic!("expected insufficient funds, got {:?}", other),
    }

    assert_eq!(service.balance(&account.session).await?, 7000);
    assert_eq!(service.transactions(&account.session).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_withdraw_exact_balance_is_allowed() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = TestAccount::funded(&service, "fatima", 4200).await?;

    assert_eq!(service.withdraw(&account.session, 4200).await?, 0);
    assert!(matches!(
        service.withdraw(&account.session, 1).await,
        Err(AppError::InsufficientFunds { balance: 0, .. })
    ));

    Ok(())
}

#[tokio::test]
async fn test_ledger_stays_consistent() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let a = TestAccount::funded(&service, "gugu", 50000).await?;
    let b = TestAccount::funded(&service, "hlengiwe", 1000).await?;

    service.withdraw(&a.session, 1234).await?;
    let _ = service.withdraw(&b.session, 999999).await;
    service.transfer(&a.session, b.account_number, 10000).await?;
    service.transfer(&b.session, a.account_number, 500).await?;

    let report = service.verify_ledger().await?;
    assert!(report.is_consistent(), "{:?}", report);
    assert_eq!(report.account_count, 2);
    assert_eq!(report.transaction_count, 7);
    assert_eq!(report.total_balance, 50000 + 1000 - 1234);

    Ok(())
}

#[tokio::test]
async fn test_deposit_beyond_balance_limit_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = TestAccount::funded(&service, "vuyo", i64::MAX).await?;

    let result = service.deposit(&account.session, 1).await;
    assert!(matches!(result, Err(AppError::BalanceLimitExceeded(n)) if n == account.account_number));

    assert_eq!(service.balance(&account.session).await?, i64::MAX);
    assert_eq!(service.transactions(&account.session).await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_verify_ledger_totals_beyond_i64() -> Result<()> {
    let (service, _temp) = test_service().await?;
    TestAccount::funded(&service, "wandile", i64::MAX).await?;
    TestAccount::funded(&service, "xoli", 1).await?;

    let report = service.verify_ledger().await?;
    assert!(report.is_consistent());
    assert_eq!(report.total_balance, i128::from(i64::MAX) + 1);

    Ok(())
}
