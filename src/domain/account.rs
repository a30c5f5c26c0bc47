use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use super::Cents;

/// Numeric account identifier handed out at registration.
pub type AccountNumber = i64;

/// Account numbers are five-digit values drawn from this range unless configured otherwise.
pub const DEFAULT_ACCOUNT_NUMBER_RANGE: RangeInclusive<AccountNumber> = 10000..=99999;

/// A bank account as stored. The password is only ever held as its hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub account_number: AccountNumber,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub id_number: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub balance: Cents,
}

impl Account {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Details supplied when opening an account.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub id_number: String,
    pub username: String,
    pub password: String,
}

impl Registration {
    /// Names of required fields that are empty or whitespace only, in form order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("first name", &self.first_name),
            ("last name", &self.last_name),
            ("phone number", &self.phone_number),
            ("ID number", &self.id_number),
            ("username", &self.username),
            ("password", &self.password),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete() -> Registration {
        Registration {
            first_name: "Thandi".into(),
            last_name: "Nkosi".into(),
            phone_number: "0821234567".into(),
            id_number: "9001015009087".into(),
            username: "thandi".into(),
            password: "s3cret".into(),
        }
    }

    #[test]
    fn test_complete_registration_has_no_missing_fields() {
        assert!(complete().missing_fields().is_empty());
    }

    #[test]
    fn test_each_empty_field_is_reported() {
        let mut reg = complete();
        reg.phone_number = String::new();
        reg.password = "   ".into();
        assert_eq!(reg.missing_fields(), vec!["phone number", "password"]);
    }

    #[test]
    fn test_default_range_is_five_digits() {
        assert_eq!(*DEFAULT_ACCOUNT_NUMBER_RANGE.start(), 10000);
        assert_eq!(*DEFAULT_ACCOUNT_NUMBER_RANGE.end(), 99999);
    }
}
