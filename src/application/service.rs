use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{
    compute_all_balances, hash_password, reconcile, Account, AccountNumber, Cents, LedgerEntry, LedgerReport,
    Registration, Session, Transaction, WideCents,
};
use crate::storage::{CreateAccountOutcome, CreditOutcome, DebitOutcome, Repository, TransferOutcome};

use super::AppError;

/// Application service providing the banking operations.
/// This is the primary interface for any client (CLI, tests, a future web front end).
#[derive(Clone)]
pub struct LedgerService {
    repo: Repository,
    config: Config,
}

/// Result of a completed transfer, from the sender's point of view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferReceipt {
    pub from_account: AccountNumber,
    pub to_account: AccountNumber,
    pub amount: Cents,
    /// Sender's balance after the transfer
    pub balance: Cents,
}

/// Everything the account dashboard shows.
#[derive(Debug, Clone)]
pub struct AccountSummary {
    pub account: Account,
    /// Newest first
    pub transactions: Vec<Transaction>,
}

impl LedgerService {
    /// Create a new service over an already connected repository.
    pub fn new(repo: Repository, config: Config) -> Self {
        Self { repo, config }
    }

    /// Create the database if needed and bring its schema up to date.
    pub async fn init(config: Config) -> Result<Self, AppError> {
        let repo = Repository::init(&config.database_url_create(), config.busy_timeout).await?;
        Ok(Self::new(repo, config))
    }

    /// Connect to an existing database.
    pub async fn connect(config: Config) -> Result<Self, AppError> {
        let repo = Repository::connect(&config.database_url(), config.busy_timeout).await?;
        Ok(Self::new(repo, config))
    }

    // ========================
    // Accounts
    // ========================

    /// Open an account with a zero balance and return its number.
    pub async fn register_account(&self, registration: Registration) -> Result<AccountNumber, AppError> {
        let missing = registration.missing_fields();
        if !missing.is_empty() {
            warn!(fields = ?missing, "registration rejected");
            return Err(AppError::Validation(format!(
                "All fields must be filled (missing: {})",
                missing.join(", ")
            )));
        }

        let password_hash = hash_password(&registration.password);
        let outcome = self
            .repo
            .create_account(
                &registration,
                &password_hash,
                self.config.account_number_range.clone(),
                self.config.allocation_attempts,
            )
            .await?;

        match outcome {
            CreateAccountOutcome::Created(account_number) => {
                info!(account_number, "account registered");
                Ok(account_number)
            }
            CreateAccountOutcome::UsernameTaken => {
                warn!("registration rejected: username taken");
                Err(AppError::UsernameTaken(registration.username.trim().to_string()))
            }
            CreateAccountOutcome::NumbersExhausted { attempts } => {
                Err(AppError::Internal(anyhow::anyhow!(
                    "No free account number found after {} attempts",
                    attempts
                )))
            }
        }
    }

    /// Check a username and password and open a session for the matching account.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<Session, AppError> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(AppError::Validation(
                "Please fill both the username and password fields".to_string(),
            ));
        }

        let password_hash = hash_password(password);
        match self
            .repo
            .find_account_by_credentials(username, &password_hash)
            .await?
        {
            Some(account_number) => {
                info!(account_number, "login succeeded");
                Ok(Session::new(account_number))
            }
            None => {
                warn!("login failed");
                Err(AppError::AuthFailed)
            }
        }
    }

    // ========================
    // Balance mutations
    // ========================

    /// Add money to the session's account. Returns the new balance.
    pub async fn deposit(&self, session: &Session, amount: Cents) -> Result<Cents, AppError> {
        let account_number = session.account_number();
        ensure_positive(amount, "Deposit")?;

        let entry = LedgerEntry::deposit(account_number, amount);
        match self.repo.deposit(&entry).await? {
            CreditOutcome::Applied { balance } => {
                info!(account_number, amount, balance, "deposit recorded");
                Ok(balance)
            }
            CreditOutcome::LimitExceeded { balance } => {
                warn!(account_number, amount, balance, "deposit rejected: balance limit");
                Err(AppError::BalanceLimitExceeded(account_number))
            }
            CreditOutcome::AccountMissing => Err(AppError::AccountNotFound(account_number)),
        }
    }

    /// Take money out of the session's account. Returns the new balance.
    pub async fn withdraw(&self, session: &Session, amount: Cents) -> Result<Cents, AppError> {
        let account_number = session.account_number();
        ensure_positive(amount, "Withdrawal")?;

        let entry = LedgerEntry::withdrawal(account_number, amount);
        match self.repo.withdraw(&entry).await? {
            DebitOutcome::Applied { balance } => {
                info!(account_number, amount, balance, "withdrawal recorded");
                Ok(balance)
            }
            DebitOutcome::InsufficientFunds { balance } => {
                warn!(account_number, amount, "withdrawal rejected: insufficient funds");
                Err(AppError::InsufficientFunds {
                    balance,
                    requested: amount,
                })
            }
            DebitOutcome::AccountMissing => Err(AppError::AccountNotFound(account_number)),
        }
    }

    /// Send money from the session's account to another account.
    pub async fn transfer(
        &self,
        session: &Session,
        to_account: AccountNumber,
        amount: Cents,
    ) -> Result<TransferReceipt, AppError> {
        let from_account = session.account_number();
        if to_account == from_account {
            return Err(AppError::SameAccount);
        }
        ensure_positive(amount, "Transfer")?;

        let legs = LedgerEntry::transfer_legs(from_account, to_account, amount);
        match self.repo.transfer(&legs).await? {
            TransferOutcome::Applied { from_balance, .. } => {
                info!(from_account, to_account, amount, "transfer recorded");
                Ok(TransferReceipt {
                    from_account,
                    to_account,
                    amount,
                    balance: from_balance,
                })
            }
            TransferOutcome::InsufficientFunds { balance } => {
                warn!(from_account, amount, "transfer rejected: insufficient funds");
                Err(AppError::InsufficientFunds {
                    balance,
                    requested: amount,
                })
            }
            TransferOutcome::SenderMissing => Err(AppError::AccountNotFound(from_account)),
            TransferOutcome::RecipientLimitExceeded => {
                warn!(from_account, to_account, amount, "transfer rejected: recipient balance limit");
                Err(AppError::BalanceLimitExceeded(to_account))
            }
            TransferOutcome::RecipientMissing => {
                warn!(from_account, to_account, "transfer rejected: unknown recipient");
                Err(AppError::AccountNotFound(to_account))
            }
        }
    }

    // ========================
    // Queries
    // ========================

    /// Current balance of the session's account.
    pub async fn balance(&self, session: &Session) -> Result<Cents, AppError> {
        let account_number = session.account_number();
        self.repo
            .get_balance(account_number)
            .await?
            .ok_or(AppError::AccountNotFound(account_number))
    }

    /// Transaction history of the session's account, newest first.
    pub async fn transactions(&self, session: &Session) -> Result<Vec<Transaction>, AppError> {
        Ok(self.repo.list_transactions(session.account_number()).await?)
    }

    /// Account details with full history, as shown on the dashboard.
    pub async fn account_summary(&self, session: &Session) -> Result<AccountSummary, AppError> {
        let account_number = session.account_number();
        let account = self
            .repo
            .get_account(account_number)
            .await?
            .ok_or(AppError::AccountNotFound(account_number))?;
        let transactions = self.repo.list_transactions(account_number).await?;

        Ok(AccountSummary {
            account,
            transactions,
        })
    }

    /// Reconcile every stored balance against the transaction log.
    pub async fn verify_ledger(&self) -> Result<LedgerReport, AppError> {
        let stats = self.repo.get_ledger_stats().await?;
        let stored = self.repo.stored_balances().await?;
        let transactions = self.repo.list_all_transactions().await?;
        let ledger = compute_all_balances(&transactions);

        let (drifted_accounts, orphaned_accounts) = reconcile(&stored, &ledger);
        let report = LedgerReport {
            account_count: stats.account_count,
            transaction_count: stats.transaction_count,
            total_balance: stored.values().copied().map(WideCents::from).sum(),
            drifted_accounts,
            orphaned_accounts,
            non_positive_amounts: stats.non_positive_amounts,
        };

        if !report.is_consistent() {
            warn!(
                drifted = report.drifted_accounts.len(),
                orphaned = report.orphaned_accounts.len(),
                "ledger verification found inconsistencies"
            );
        }
        Ok(report)
    }
}

fn ensure_positive(amount: Cents, what: &str) -> Result<(), AppError> {
    if amount <= 0 {
        warn!(amount, "{} rejected: non-positive amount", what);
        return Err(AppError::Validation(format!(
            "{} amount must be positive",
            what
        )));
    }
    Ok(())
}
