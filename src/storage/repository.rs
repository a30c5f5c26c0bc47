use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::domain::{
    Account, AccountNumber, Cents, LedgerEntry, Registration, Transaction, TransactionType,
};

use super::MIGRATION_001_INITIAL;

/// Outcome of opening an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateAccountOutcome {
    Created(AccountNumber),
    UsernameTaken,
    /// Every drawn account number was already in use
    NumbersExhausted { attempts: u32 },
}

/// Outcome of a guarded debit (withdrawal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    Applied { balance: Cents },
    InsufficientFunds { balance: Cents },
    AccountMissing,
}

/// Outcome of a credit (deposit).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    Applied { balance: Cents },
    /// The new balance would not fit in `Cents`
    LimitExceeded { balance: Cents },
    AccountMissing,
}

/// Outcome of moving money between two accounts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    Applied {
        from_balance: Cents,
        to_balance: Cents,
    },
    InsufficientFunds {
        balance: Cents,
    },
    SenderMissing,
    RecipientMissing,
    /// The recipient cannot hold the credited amount
    RecipientLimitExceeded,
}

/// Row counts used by ledger verification.
#[derive(Debug, Clone)]
pub struct LedgerStats {
    pub account_count: i64,
    pub transaction_count: i64,
    pub non_positive_amounts: i64,
}

/// Repository for persisting accounts and their transaction log.
///
/// Every balance change is written in the same database transaction as its
/// ledger rows, so the two can never drift apart.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database.
    ///
    /// `busy_timeout` bounds how long a writer waits for another writer's lock.
    pub async fn connect(database_url: &str, busy_timeout: Duration) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("Invalid database URL: {}", database_url))?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(busy_timeout);

        let pool = SqlitePoolOptions::new()
            .connect_with(options)
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

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str, busy_timeout: Duration) -> Result<Self> {
        let repo = Self::connect(database_url, busy_timeout).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account with a zero balance under a randomly drawn number.
    ///
    /// Colliding numbers are redrawn inside the same transaction, up to
    /// `max_attempts` draws.
    pub async fn create_account(
        &self,
        registration: &Registration,
        password_hash: &str,
        number_range: RangeInclusive<AccountNumber>,
        max_attempts: u32,
    ) -> Result<CreateAccountOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        for attempt in 1..=max_attempts {
            let candidate = draw_account_number(&number_range);

            let inserted = sqlx::query(
                r#"
                INSERT INTO accounts (account_number, first_name, last_name, phone_number, id_number, username, password_hash, balance)
                VALUES (?, ?, ?, ?, ?, ?, ?, 0)
                ON CONFLICT (account_number) DO NOTHING
                "#,
            )
            .bind(candidate)
            .bind(registration.first_name.trim())
            .bind(registration.last_name.trim())
            .bind(registration.phone_number.trim())
            .bind(registration.id_number.trim())
            .bind(registration.username.trim())
            .bind(password_hash)
            .execute(&mut *tx)
            .await;

            match inserted {
                Ok(result) if result.rows_affected() == 1 => {
                    tx.commit().await.context("Failed to commit new account")?;
                    return Ok(CreateAccountOutcome::Created(candidate));
                }
                Ok(_) => {
                    tracing::debug!(candidate, attempt, "account number already in use");
                }
                // The account number conflict is absorbed above, so any
                // remaining uniqueness failure is the username.
                Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                    return Ok(CreateAccountOutcome::UsernameTaken);
                }
                Err(err) => return Err(err).context("Failed to save account"),
            }
        }

        Ok(CreateAccountOutcome::NumbersExhausted {
            attempts: max_attempts,
        })
    }

    /// Get an account by number.
    pub async fn get_account(&self, account_number: AccountNumber) -> Result<Option<Account>> {
        let row = sqlx::query(
            r#"
            SELECT account_number, first_name, last_name, phone_number, id_number, username, password_hash, balance
            FROM accounts
            WHERE account_number = ?
            "#,
        )
        .bind(account_number)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Find the account holding exactly this username and password hash.
    pub async fn find_account_by_credentials(
        &self,
        username: &str,
        password_hash: &str,
    ) -> Result<Option<AccountNumber>> {
        let row = sqlx::query(
            r#"
            SELECT account_number
            FROM accounts
            WHERE username = ? AND password_hash = ?
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to look up credentials")?;

        Ok(row.map(|row| row.try_get("account_number")).transpose()?)
    }

    /// Current balance, or `None` if the account does not exist.
    pub async fn get_balance(&self, account_number: AccountNumber) -> Result<Option<Cents>> {
        let row = sqlx::query("SELECT balance FROM accounts WHERE account_number = ?")
            .bind(account_number)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch balance")?;

        Ok(row.map(|row| row.try_get("balance")).transpose()?)
    }

    /// Stored balances for every account.
    pub async fn stored_balances(&self) -> Result<HashMap<AccountNumber, Cents>> {
        let rows = sqlx::query("SELECT account_number, balance FROM accounts")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list balances")?;

        rows.iter()
            .map(|row| -> Result<(AccountNumber, Cents)> {
                Ok((row.try_get("account_number")?, row.try_get("balance")?))
            })
            .collect()
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        Ok(Account {
            account_number: row.try_get("account_number")?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            phone_number: row.try_get("phone_number")?,
            id_number: row.try_get("id_number")?,
            username: row.try_get("username")?,
            password_hash: row.try_get("password_hash")?,
            balance: row.try_get("balance")?,
        })
    }

    // ========================
    // Balance mutations
    // ========================

    /// Credit an account if the result stays representable, and record the deposit.
    pub async fn deposit(&self, entry: &LedgerEntry) -> Result<CreditOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        match credit(&mut tx, entry.account_number, entry.amount).await? {
            CreditOutcome::Applied { balance } => {
                insert_entry(&mut tx, entry).await?;
                tx.commit().await.context("Failed to commit deposit")?;
                Ok(CreditOutcome::Applied { balance })
            }
            rejected => Ok(rejected),
        }
    }

    /// Debit an account if it holds at least the entry's amount, and record the withdrawal.
    pub async fn withdraw(&self, entry: &LedgerEntry) -> Result<DebitOutcome> {
        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        match debit(&mut tx, entry.account_number, entry.amount).await? {
            DebitOutcome::Applied { balance } => {
                insert_entry(&mut tx, entry).await?;
                tx.commit().await.context("Failed to commit withdrawal")?;
                Ok(DebitOutcome::Applied { balance })
            }
            rejected => Ok(rejected),
        }
    }

    /// Move money between two accounts and record both legs.
    ///
    /// `legs` must be the sender's debit followed by the recipient's credit,
    /// as built by `LedgerEntry::transfer_legs`.
    pub async fn transfer(&self, legs: &[LedgerEntry; 2]) -> Result<TransferOutcome> {
        let [debit_leg, credit_leg] = legs;
        let amount = credit_leg.amount;

        let mut tx = self.pool.begin().await.context("Failed to begin transaction")?;

        let from_balance = match debit(&mut tx, debit_leg.account_number, amount).await? {
            DebitOutcome::Applied { balance } => balance,
            DebitOutcome::InsufficientFunds { balance } => {
                return Ok(TransferOutcome::InsufficientFunds { balance });
            }
            DebitOutcome::AccountMissing => return Ok(TransferOutcome::SenderMissing),
        };

        // Returning early drops `tx`, which rolls the debit back.
        let to_balance = match credit(&mut tx, credit_leg.account_number, amount).await? {
            CreditOutcome::Applied { balance } => balance,
            CreditOutcome::LimitExceeded { .. } => {
                return Ok(TransferOutcome::RecipientLimitExceeded);
            }
            CreditOutcome::AccountMissing => return Ok(TransferOutcome::RecipientMissing),
        };

        insert_entry(&mut tx, debit_leg).await?;
        insert_entry(&mut tx, credit_leg).await?;
        tx.commit().await.context("Failed to commit transfer")?;

        Ok(TransferOutcome::Applied {
            from_balance,
            to_balance,
        })
    }

    // ========================
    // Ledger queries
    // ========================

    /// Transactions for one account, newest first.
    pub async fn list_transactions(&self, account_number: AccountNumber) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, account_number, transaction_type, amount, timestamp
            FROM transactions
            WHERE account_number = ?
            ORDER BY timestamp DESC, transaction_id DESC
            "#,
        )
        .bind(account_number)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Every transaction in insertion order.
    pub async fn list_all_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT transaction_id, account_number, transaction_type, amount, timestamp
            FROM transactions
            ORDER BY transaction_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// Get statistics for ledger verification.
    pub async fn get_ledger_stats(&self) -> Result<LedgerStats> {
        let account_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM accounts")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count accounts")?
            .try_get("count")?;

        let transaction_count: i64 = sqlx::query("SELECT COUNT(*) as count FROM transactions")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count transactions")?
            .try_get("count")?;

        // Only the sending leg of a transfer may carry a negative amount
        let non_positive_amounts: i64 = sqlx::query(
            r#"
            SELECT COUNT(*) as count
            FROM transactions
            WHERE amount = 0
               OR (amount < 0 AND transaction_type != 'Transfer')
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .context("Failed to count invalid amounts")?
        .try_get("count")?;

        Ok(LedgerStats {
            account_count,
            transaction_count,
            non_positive_amounts,
        })
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let type_str: String = row.try_get("transaction_type")?;
        let timestamp_str: String = row.try_get("timestamp")?;

        Ok(Transaction {
            id: row.try_get("transaction_id")?,
            account_number: row.try_get("account_number")?,
            transaction_type: TransactionType::from_str(&type_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", type_str))?,
            amount: row.try_get("amount")?,
            timestamp: parse_timestamp(&timestamp_str)?,
        })
    }
}

fn draw_account_number(range: &RangeInclusive<AccountNumber>) -> AccountNumber {
    rand::thread_rng().gen_range(range.clone())
}

/// Add to a balance only if the result still fits in `Cents`.
///
/// SQLite silently turns an overflowing integer sum into a REAL, so the
/// ceiling is part of the guard instead of being left to the addition.
async fn credit(
    conn: &mut SqliteConnection,
    account_number: AccountNumber,
    amount: Cents,
) -> Result<CreditOutcome> {
    let row = sqlx::query(
        r#"
        UPDATE accounts
        SET balance = balance + ?
        WHERE account_number = ? AND balance <= ? - ?
        RETURNING balance
        "#,
    )
    .bind(amount)
    .bind(account_number)
    .bind(Cents::MAX)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to credit account")?;

    if let Some(row) = row {
        return Ok(CreditOutcome::Applied {
            balance: row.try_get("balance")?,
        });
    }

    Ok(match current_balance(conn, account_number).await? {
        Some(balance) => CreditOutcome::LimitExceeded { balance },
        None => CreditOutcome::AccountMissing,
    })
}

/// Subtract from a balance only if it covers the amount.
///
/// The funds check and the decrement are one statement, so concurrent
/// debits cannot both pass against the same balance.
async fn debit(
    conn: &mut SqliteConnection,
    account_number: AccountNumber,
    amount: Cents,
) -> Result<DebitOutcome> {
    let row = sqlx::query(
        r#"
        UPDATE accounts
        SET balance = balance - ?
        WHERE account_number = ? AND balance >= ?
        RETURNING balance
        "#,
    )
    .bind(amount)
    .bind(account_number)
    .bind(amount)
    .fetch_optional(&mut *conn)
    .await
    .context("Failed to debit account")?;

    if let Some(row) = row {
        return Ok(DebitOutcome::Applied {
            balance: row.try_get("balance")?,
        });
    }

    Ok(match current_balance(conn, account_number).await? {
        Some(balance) => DebitOutcome::InsufficientFunds { balance },
        None => DebitOutcome::AccountMissing,
    })
}

async fn current_balance(
    conn: &mut SqliteConnection,
    account_number: AccountNumber,
) -> Result<Option<Cents>> {
    let row = sqlx::query("SELECT balance FROM accounts WHERE account_number = ?")
        .bind(account_number)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch balance")?;

    Ok(row.map(|row| row.try_get("balance")).transpose()?)
}

async fn insert_entry(conn: &mut SqliteConnection, entry: &LedgerEntry) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO transactions (account_number, transaction_type, amount, timestamp)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(entry.account_number)
    .bind(entry.transaction_type.as_str())
    .bind(entry.amount)
    .bind(format_timestamp(entry.timestamp))
    .execute(&mut *conn)
    .await
    .context("Failed to save transaction")?;
    Ok(())
}

/// Fixed-width RFC 3339 so stored timestamps sort lexically.
fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Accepts our RFC 3339 form and SQLite's `CURRENT_TIMESTAMP` default.
fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .with_context(|| format!("Invalid timestamp: {}", s))?;
    Ok(naive.and_utc())
}
