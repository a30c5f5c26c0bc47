use std::io::Write;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::LedgerService;
use crate::domain::{format_cents, AccountNumber, Cents, Session, Transaction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementFormat {
    Csv,
    Json,
}

impl StatementFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(StatementFormat::Csv),
            "json" => Some(StatementFormat::Json),
            _ => None,
        }
    }
}

/// Account statement as written in JSON form
#[derive(Debug, Clone, Serialize)]
pub struct Statement {
    pub account_number: AccountNumber,
    pub generated_at: DateTime<Utc>,
    pub balance_cents: Cents,
    pub transactions: Vec<Transaction>,
}

/// Writes the authenticated account's history to CSV or JSON
pub struct StatementExporter<'a> {
    service: &'a LedgerService,
    session: &'a Session,
}

impl<'a> StatementExporter<'a> {
    pub fn new(service: &'a LedgerService, session: &'a Session) -> Self {
        Self { service, session }
    }

    /// Write the statement in the given format. Returns the number of transactions written.
    pub async fn export<W: Write>(&self, format: StatementFormat, writer: W) -> Result<usize> {
        match format {
            StatementFormat::Csv => self.export_csv(writer).await,
            StatementFormat::Json => Ok(self.export_json(writer).await?.transactions.len()),
        }
    }

    /// One CSV record per transaction, newest first
    pub async fn export_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let transactions = self.service.transactions(self.session).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        csv_writer.write_record(["transaction_id", "type", "amount", "timestamp"])?;

        for transaction in &transactions {
            csv_writer.write_record([
                transaction.id.to_string(),
                transaction.transaction_type.to_string(),
                format_cents(transaction.amount),
                transaction.timestamp.to_rfc3339(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    pub async fn export_json<W: Write>(&self, writer: W) -> Result<Statement> {
        let summary = self.service.account_summary(self.session).await?;
        let statement = Statement {
            account_number: summary.account.account_number,
            generated_at: Utc::now(),
            balance_cents: summary.account.balance,
            transactions: summary.transactions,
        };

        serde_json::to_writer_pretty(writer, &statement)?;
        Ok(statement)
    }
}
