use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountNumber, Cents};

pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    Deposit,
    Withdraw,
    /// One leg of a transfer between two accounts
    Transfer,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "Deposit",
            TransactionType::Withdraw => "Withdraw",
            TransactionType::Transfer => "Transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Deposit" => Some(TransactionType::Deposit),
            "Withdraw" => Some(TransactionType::Withdraw),
            "Transfer" => Some(TransactionType::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger row as stored. Rows are append-only and never updated.
///
/// `amount` is positive for deposits, withdrawals and the receiving leg of a
/// transfer, and negative for the sending leg.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account_number: AccountNumber,
    pub transaction_type: TransactionType,
    pub amount: Cents,
    pub timestamp: DateTime<Utc>,
}

impl Transaction {
    /// Signed change this row made to its account's balance.
    pub fn balance_effect(&self) -> Cents {
        balance_effect(self.transaction_type, self.amount)
    }
}

pub fn balance_effect(transaction_type: TransactionType, amount: Cents) -> Cents {
    match transaction_type {
        TransactionType::Deposit => amount,
        TransactionType::Withdraw => -amount,
        TransactionType::Transfer => amount,
    }
}

/// A ledger row waiting to be written. The id is assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub account_number: AccountNumber,
    pub transaction_type: TransactionType,
    pub amount: Cents,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn deposit(account_number: AccountNumber, amount: Cents) -> Self {
        assert!(amount > 0, "Deposit amount must be positive");
        Self {
            account_number,
            transaction_type: TransactionType::Deposit,
            amount,
            timestamp: Utc::now(),
        }
    }

    pub fn withdrawal(account_number: AccountNumber, amount: Cents) -> Self {
        assert!(amount > 0, "Withdrawal amount must be positive");
        Self {
            account_number,
            transaction_type: TransactionType::Withdraw,
            amount,
            timestamp: Utc::now(),
        }
    }

    /// Both legs of a transfer: the sender's debit first, then the recipient's credit.
    /// The legs share one timestamp.
    pub fn transfer_legs(from: AccountNumber, to: AccountNumber, amount: Cents) -> [Self; 2] {
        assert!(amount > 0, "Transfer amount must be positive");
        assert!(from != to, "Transfer legs must touch two accounts");
        let timestamp = Utc::now();
        [
            Self {
                account_number: from,
                transaction_type: TransactionType::Transfer,
                amount: -amount,
                timestamp,
            },
            Self {
                account_number: to,
                transaction_type: TransactionType::Transfer,
                amount,
                timestamp,
            },
        ]
    }

    pub fn balance_effect(&self) -> Cents {
        balance_effect(self.transaction_type, self.amount)
    }
}
