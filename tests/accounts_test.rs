mod common;

use std::collections::HashSet;

use anyhow::Result;
use common::{registration, test_service, test_service_with, TestAccount};
use ledgerbank::application::AppError;

#[tokio::test]
async fn test_register_starts_with_zero_balance() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let account_number = service
        .register_account(registration("thandi", "s3cret"))
        .await?;
    assert!((10000..=99999).contains(&account_number));

    let session = service.authenticate("thandi", "s3cret").await?;
    assert_eq!(session.account_number(), account_number);
    assert_eq!(service.balance(&session).await?, 0);
    assert!(service.transactions(&session).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_register_stores_details_and_hashes_password() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let account = TestAccount::open(&service, "sipho").await?;

    let summary = service.account_summary(&account.session).await?;
    assert_eq!(summary.account.account_number, account.account_number);
    assert_eq!(summary.account.first_name, "Test");
    assert_eq!(summary.account.username, "sipho");
    assert_eq!(summary.account.phone_number, "0821234567");
    assert_ne!(summary.account.password_hash, "sipho-pw");
    assert_eq!(summary.account.password_hash.len(), 64);

    Ok(())
}

#[tokio::test]
async fn test_register_rejects_each_empty_field() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let blanks: [fn(&mut ledgerbank::domain::Registration); 6] = [
        |r| r.first_name.clear(),
        |r| r.last_name.clear(),
        |r| r.phone_number.clear(),
        |r| r.id_number.clear(),
        |r| r.username.clear(),
        |r| r.password = "  ".into(),
    ];

    for blank in blanks {
        let mut reg = registration("lerato", "pw");
        blank(&mut reg);
        let result = service.register_account(reg).await;
        assert!(
            matches!(result, Err(AppError::Validation(_))),
            "expected validation error, got {:?}",
            result
        );
    }

    let report = service.verify_ledger().await?;
    assert_eq!(report.account_count, 0, "No account row may be written");

    Ok(())
}

#[tokio::test]
async fn test_register_rejects_taken_username() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .register_account(registration("naledi", "first"))
        .await?;

    let result = service
        .register_account(registration("naledi", "second"))
        .await;
    assert!(matches!(result, Err(AppError::UsernameTaken(ref name)) if name == "naledi"));

    assert_eq!(service.verify_ledger().await?.account_count, 1);
    // The original password still works, the second one never got stored
    service.authenticate("naledi", "first").await?;
    assert!(matches!(
        service.authenticate("naledi", "second").await,
        Err(AppError::AuthFailed)
    ));

    Ok(())
}

#[tokio::test]
async fn test_authenticate_requires_exact_password() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .register_account(registration("zanele", "password1"))
        .await?;

    assert!(service.authenticate("zanele", "password1").await.is_ok());

    for wrong in ["password2", "Password1", "password1 ", "password"] {
        let result = service.authenticate("zanele", wrong).await;
        assert!(
            matches!(result, Err(AppError::AuthFailed)),
            "password {:?} must not authenticate",
            wrong
        );
    }

    Ok(())
}

#[tokio::test]
async fn test_authenticate_unknown_user_fails() -> Result<()> {
    let (service, _temp) = test_service().await?;
    service
        .register_account(registration("kagiso", "pw"))
        .await?;

    let result = service.authenticate("kagis0", "pw").await;
    assert!(matches!(result, Err(AppError::AuthFailed)));

    Ok(())
}

#[tokio::test]
async fn test_authenticate_rejects_empty_fields() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(matches!(
        service.authenticate("", "pw").await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        service.authenticate("someone", "").await,
        Err(AppError::Validation(_))
    ));

    Ok(())
}

#[tokio::test]
async fn test_account_numbers_are_unique() -> Result<()> {
    let (service, _temp) = test_service_with(|config| {
        config.account_number_range = 10000..=10019;
        // Enough draws that filling the last free slot cannot plausibly miss
        config.allocation_attempts = 1000;
    })
    .await?;

    let mut numbers = HashSet::new();
    for i in 0..20 {
        let number = service
            .register_account(registration(&format!("user{}", i), "pw"))
            .await?;
        assert!((10000..=10019).contains(&number));
        assert!(numbers.insert(number), "account number {} reused", number);
    }

    Ok(())
}

#[tokio::test]
async fn test_exhausted_number_range_is_internal_error() -> Result<()> {
    let (service, _temp) = test_service_with(|config| {
        config.account_number_range = 10000..=10001;
    })
    .await?;

    service.register_account(registration("first", "pw")).await?;
    service.register_account(registration("second", "pw")).await?;

    let err = service
        .register_account(registration("third", "pw"))
        .await
        .unwrap_err();
    assert!(err.is_internal(), "got {:?}", err);
    assert_eq!(service.verify_ledger().await?.account_count, 2);

    Ok(())
}
