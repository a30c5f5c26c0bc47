use thiserror::Error;

use crate::domain::{format_currency, AccountNumber, Cents};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid username or password")]
    AuthFailed,

    #[error(
        "Insufficient funds: balance {}, requested {}",
        money(.balance),
        money(.requested)
    )]
    InsufficientFunds { balance: Cents, requested: Cents },

    #[error("Cannot transfer to the same account")]
    SameAccount,

    #[error("Account not found: {0}")]
    AccountNotFound(AccountNumber),

    #[error("Account {0} cannot hold a larger balance")]
    BalanceLimitExceeded(AccountNumber),

    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

fn money(cents: &Cents) -> String {
    format_currency(*cents)
}

impl AppError {
    /// True for infrastructure failures, false for rejected business rules.
    pub fn is_internal(&self) -> bool {
        matches!(self, AppError::Internal(_))
    }
}
