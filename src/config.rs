//! Runtime configuration.
//!
//! Defaults are overridden by environment variables, which are in turn
//! overridden by command-line flags.

use std::ops::RangeInclusive;
use std::time::Duration;

use crate::domain::{AccountNumber, DEFAULT_ACCOUNT_NUMBER_RANGE};

/// Main configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite database file path.
    pub database_path: String,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
    /// Range account numbers are drawn from.
    pub account_number_range: RangeInclusive<AccountNumber>,
    /// Draws attempted before registration gives up on finding a free number.
    pub allocation_attempts: u32,
    /// How long a writer waits for the database lock.
    pub busy_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "ledgerbank.db".to_string(),
            log_level: "warn".to_string(),
            account_number_range: DEFAULT_ACCOUNT_NUMBER_RANGE,
            allocation_attempts: 32,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A variable that is set but cannot be parsed is an error rather than
    /// a silent fallback to the default.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(path) = lookup("LEDGERBANK_DATABASE") {
            config.database_path = path;
        }

        if let Some(level) = lookup("LEDGERBANK_LOG") {
            config.log_level = level;
        }

        if let Some(ms) = lookup("LEDGERBANK_BUSY_TIMEOUT_MS") {
            let ms = ms
                .trim()
                .parse()
                .map_err(|_| format!("LEDGERBANK_BUSY_TIMEOUT_MS is not a number of milliseconds: {}", ms))?;
            config.busy_timeout = Duration::from_millis(ms);
        }

        if let Some(range) = lookup("LEDGERBANK_ACCOUNT_RANGE") {
            config.account_number_range = parse_range(&range)
                .ok_or_else(|| format!("LEDGERBANK_ACCOUNT_RANGE must look like 10000-99999: {}", range))?;
        }

        if let Some(attempts) = lookup("LEDGERBANK_ALLOCATION_ATTEMPTS") {
            config.allocation_attempts = attempts
                .trim()
                .parse()
                .map_err(|_| format!("LEDGERBANK_ALLOCATION_ATTEMPTS is not a count: {}", attempts))?;
        }

        Ok(config)
    }

    /// URL for opening an existing database.
    pub fn database_url(&self) -> String {
        format!("sqlite:{}", self.database_path)
    }

    /// URL that also creates the database file if missing.
    pub fn database_url_create(&self) -> String {
        format!("sqlite:{}?mode=rwc", self.database_path)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.database_path.is_empty() {
            return Err("Database path cannot be empty".to_string());
        }

        if self.account_number_range.is_empty() {
            return Err("Account number range is empty".to_string());
        }

        if *self.account_number_range.start() <= 0 {
            return Err("Account numbers must be positive".to_string());
        }

        if self.allocation_attempts == 0 {
            return Err("Allocation attempts must be at least 1".to_string());
        }

        Ok(())
    }
}

/// Parse "start-end" into an inclusive range.
fn parse_range(s: &str) -> Option<RangeInclusive<AccountNumber>> {
    let (start, end) = s.trim().split_once('-')?;
    Some(start.trim().parse().ok()?..=end.trim().parse().ok()?)
}
