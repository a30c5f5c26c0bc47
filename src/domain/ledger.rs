use std::collections::HashMap;

use serde::Serialize;

use super::{AccountNumber, Cents, Transaction, WideCents};

/// Ledger-implied balances for every account that has at least one row.
///
/// Sums are widened so a corrupted or extreme ledger is reported as drift
/// instead of overflowing.
pub fn compute_all_balances(transactions: &[Transaction]) -> HashMap<AccountNumber, WideCents> {
    let mut balances: HashMap<AccountNumber, WideCents> = HashMap::new();

    for transaction in transactions {
        *balances.entry(transaction.account_number).or_insert(0) +=
            WideCents::from(transaction.balance_effect());
    }

    balances
}

/// An account whose stored balance disagrees with its ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceDrift {
    pub account_number: AccountNumber,
    pub stored_balance: Cents,
    pub ledger_balance: WideCents,
}

impl BalanceDrift {
    pub fn difference(&self) -> WideCents {
        WideCents::from(self.stored_balance) - self.ledger_balance
    }
}

/// Result of reconciling stored balances against the transaction log.
#[derive(Debug, Clone, Serialize)]
pub struct LedgerReport {
    pub account_count: i64,
    pub transaction_count: i64,
    pub total_balance: WideCents,
    pub drifted_accounts: Vec<BalanceDrift>,
    /// Accounts referenced by ledger rows that have no account row
    pub orphaned_accounts: Vec<AccountNumber>,
    pub non_positive_amounts: i64,
}

impl LedgerReport {
    pub fn is_consistent(&self) -> bool {
        self.drifted_accounts.is_empty()
            && self.orphaned_accounts.is_empty()
            && self.non_positive_amounts == 0
    }
}

/// Compare stored balances with ledger-implied balances.
///
/// Accounts with no rows are expected to hold zero. Ledger balances for
/// account numbers that do not exist are reported as orphans.
pub fn reconcile(
    stored: &HashMap<AccountNumber, Cents>,
    ledger: &HashMap<AccountNumber, WideCents>,
) -> (Vec<BalanceDrift>, Vec<AccountNumber>) {
    let mut drifted: Vec<BalanceDrift> = stored
        .iter()
        .filter_map(|(&account_number, &stored_balance)| {
            let ledger_balance = ledger.get(&account_number).copied().unwrap_or(0);
            (WideCents::from(stored_balance) != ledger_balance).then_some(BalanceDrift {
                account_number,
                stored_balance,
                ledger_balance,
            })
        })
        .collect();
    drifted.sort_by_key(|d| d.account_number);

    let mut orphaned: Vec<AccountNumber> = ledger
        .keys()
        .filter(|account_number| !stored.contains_key(account_number))
        .copied()
        .collect();
    orphaned.sort_unstable();

    (drifted, orphaned)
}
