use super::AccountNumber;

/// Request-scoped proof that a caller has authenticated.
///
/// Every balance-changing operation takes a `&Session` instead of reading an
/// ambient "current user". Outside this crate a session can only be obtained
/// from `LedgerService::authenticate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    account_number: AccountNumber,
}

impl Session {
    pub(crate) fn new(account_number: AccountNumber) -> Self {
        Self { account_number }
    }

    pub fn account_number(&self) -> AccountNumber {
        self.account_number
    }
}
