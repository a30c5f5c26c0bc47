// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use ledgerbank::application::LedgerService;
use ledgerbank::config::Config;
use ledgerbank::domain::{AccountNumber, Registration, Session};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    test_service_with(|_| {}).await
}

/// Helper to create a test service with adjusted configuration
pub async fn test_service_with(adjust: impl FnOnce(&mut Config)) -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let mut config = Config {
        database_path: db_path.to_str().unwrap().to_string(),
        ..Config::default()
    };
    adjust(&mut config);
    let service = LedgerService::init(config).await?;
    Ok((service, temp_dir))
}

/// A second pool on the test database, for changing it behind the service's back
pub async fn side_pool(temp_dir: &TempDir) -> Result<SqlitePool> {
    let db_path = temp_dir.path().join("test.db");
    let pool = SqlitePool::connect(&format!("sqlite:{}", db_path.display())).await?;
    Ok(pool)
}

/// Registration details with every field filled in
pub fn registration(username: &str, password: &str) -> Registration {
    Registration {
        first_name: "Test".into(),
        last_name: format!("User {}", username),
        phone_number: "0821234567".into(),
        id_number: "9001015009087".into(),
        username: username.into(),
        password: password.into(),
    }
}

/// An account opened through the service, already logged in
pub struct TestAccount {
    pub account_number: AccountNumber,
    pub session: Session,
}

impl TestAccount {
    /// Register and log in with the given username (password is "<username>-pw")
    pub async fn open(service: &LedgerService, username: &str) -> Result<Self> {
        let password = format!("{}-pw", username);
        let account_number = service
            .register_account(registration(username, &password))
            .await?;
        let session = service.authenticate(username, &password).await?;
        Ok(Self {
            account_number,
            session,
        })
    }

    /// Register, log in and deposit an opening amount
    pub async fn funded(service: &LedgerService, username: &str, amount: i64) -> Result<Self> {
        let account = Self::open(service, username).await?;
        service.deposit(&account.session, amount).await?;
        Ok(account)
    }
}
