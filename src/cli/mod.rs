use std::fs::File;
use std::io::{stdout, Write};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use crate::application::{LedgerService, StatementExporter, StatementFormat};
use crate::config::Config;
use crate::domain::{format_currency, parse_cents, AccountNumber, Registration, Session};
use crate::logging;

/// ledgerbank - personal banking ledger
#[derive(Parser)]
#[command(name = "ledgerbank")]
#[command(about = "Accounts, deposits, withdrawals and transfers over a local SQLite ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path [env: LEDGERBANK_DATABASE, default: ledgerbank.db]
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Login credentials for commands acting on an account
#[derive(Args)]
pub struct Credentials {
    /// Account username
    #[arg(short, long, env = "LEDGERBANK_USERNAME")]
    pub username: String,

    /// Account password
    #[arg(short, long, env = "LEDGERBANK_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Open a new account
    Register {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        phone_number: String,

        /// National ID or passport number
        #[arg(long)]
        id_number: String,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Check credentials and print the account number
    Login {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Show account details, balance and transaction history
    Dashboard {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Show the current balance
    Balance {
        #[command(flatten)]
        credentials: Credentials,
    },

    /// Deposit money into your account
    Deposit {
        /// Amount to deposit (e.g., "50.00" or "50")
        amount: String,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Withdraw money from your account
    Withdraw {
        /// Amount to withdraw (e.g., "50.00" or "50")
        amount: String,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Send money to another account
    Transfer {
        /// Amount to transfer (e.g., "50.00" or "50")
        amount: String,

        /// Recipient account number
        #[arg(long)]
        to: AccountNumber,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Export your transaction history
    Statement {
        /// Format: csv, json
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        credentials: Credentials,
    },

    /// Verify stored balances against the transaction log
    Check,
}

impl Cli {
    fn config(&self) -> Result<Config> {
        let mut config =
            Config::from_env().map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
        if let Some(database) = &self.database {
            config.database_path = database.clone();
        }
        if self.verbose {
            config.log_level = "debug".to_string();
        }
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Configuration error: {}", e))?;
        Ok(config)
    }

    pub async fn run(self) -> Result<()> {
        let config = self.config()?;
        logging::init(&config.log_level);

        match self.command {
            Commands::Init => {
                let path = config.database_path.clone();
                LedgerService::init(config).await?;
                println!("Database initialized: {}", path);
            }

            Commands::Register {
                first_name,
                last_name,
                phone_number,
                id_number,
                credentials,
            } => {
                let service = LedgerService::connect(config).await?;
                let account_number = service
                    .register_account(Registration {
                        first_name,
                        last_name,
                        phone_number,
                        id_number,
                        username: credentials.username,
                        password: credentials.password,
                    })
                    .await?;
                println!(
                    "Account created successfully! Your account number is {}",
                    account_number
                );
            }

            Commands::Login { credentials } => {
                let service = LedgerService::connect(config).await?;
                let session = login(&service, &credentials).await?;
                println!(
                    "Login successful! Account number: {}",
                    session.account_number()
                );
            }

            Commands::Dashboard { credentials } => {
                let service = LedgerService::connect(config).await?;
                let session = login(&service, &credentials).await?;
                run_dashboard_command(&service, &session).await?;
            }

            Commands::Balance { credentials } => {
                let service = LedgerService::connect(config).await?;
                let session = login(&service, &credentials).await?;
                let balance = service.balance(&session).await?;
                println!("Balance: {}", format_currency(balance));
            }

            Commands::Deposit {
                amount,
                credentials,
            } => {
                let service = LedgerService::connect(config).await?;
                let session = login(&service, &credentials).await?;
                let amount = parse_amount(&amount)?;
                let balance = service.deposit(&session, amount).await?;
                println!("{} deposited successfully.", format_currency(amount));
                println!("Balance: {}", format_currency(balance));
            }

            Commands::Withdraw {
                amount,
                credentials,
            } => {
                let service = LedgerService::connect(config).await?;
                let session = login(&service, &credentials).await?;
                let amount = parse_amount(&amount)?;
                let balance = service.withdraw(&session, amount).await?;
                println!("{} withdrawn successfully.", format_currency(amount));
                println!("Balance: {}", format_currency(balance));
            }

            Commands::Transfer {
                amount,
                to,
                credentials,
            } => {
                let service = LedgerService::connect(config).await?;
                let session = login(&service, &credentials).await?;
                let amount = parse_amount(&amount)?;
                let receipt = service.transfer(&session, to, amount).await?;
                println!(
                    "{} transferred successfully to account {}.",
                    format_currency(receipt.amount),
                    receipt.to_account
                );
                println!("Balance: {}", format_currency(receipt.balance));
            }

            Commands::Statement {
                format,
                output,
                credentials,
            } => {
                let service = LedgerService::connect(config).await?;
                let session = login(&service, &credentials).await?;
                run_statement_command(&service, &session, &format, output.as_deref()).await?;
            }

            Commands::Check => {
                let service = LedgerService::connect(config).await?;
                run_check_command(&service).await?;
            }
        }

        Ok(())
    }
}

async fn login(service: &LedgerService, credentials: &Credentials) -> Result<Session> {
    Ok(service
        .authenticate(&credentials.username, &credentials.password)
        .await?)
}

fn parse_amount(amount: &str) -> Result<i64> {
    parse_cents(amount).with_context(|| format!("Invalid amount '{}'. Use '50.00' or '50'", amount))
}

async fn run_dashboard_command(service: &LedgerService, session: &Session) -> Result<()> {
    let summary = service.account_summary(session).await?;
    let account = &summary.account;

    println!("Welcome, {}", account.full_name());
    println!("  Account number: {}", account.account_number);
    println!("  Balance:        {}", format_currency(account.balance));
    println!();

    if summary.transactions.is_empty() {
        println!("No transactions yet.");
        return Ok(());
    }

    println!("{:<10} {:<10} {:>14}  {}", "ID", "TYPE", "AMOUNT", "DATE");
    println!("{}", "-".repeat(58));
    for transaction in &summary.transactions {
        println!(
            "{:<10} {:<10} {:>14}  {}",
            transaction.id,
            transaction.transaction_type,
            format_currency(transaction.amount),
            transaction.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

async fn run_statement_command(
    service: &LedgerService,
    session: &Session,
    format: &str,
    output: Option<&str>,
) -> Result<()> {
    let format = StatementFormat::from_str(format).ok_or_else(|| {
        anyhow::anyhow!("Invalid statement format '{}'. Valid formats: csv, json", format)
    })?;

    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path))?;
            Box::new(file)
        }
        None => Box::new(stdout()),
    };

    let exporter = StatementExporter::new(service, session);
    let count = exporter.export(format, writer).await?;
    if let Some(path) = output {
        eprintln!("Exported {} transactions to {}", count, path);
    }
    Ok(())
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    let report = service.verify_ledger().await?;

    println!("Accounts:      {}", report.account_count);
    println!("Transactions:  {}", report.transaction_count);
    println!("Total balance: {}", format_currency(report.total_balance));
    println!();

    if report.is_consistent() {
        println!("Ledger is consistent.");
        return Ok(());
    }

    for drift in &report.drifted_accounts {
        println!(
            "Account {}: stored {} but ledger implies {} (off by {})",
            drift.account_number,
            format_currency(drift.stored_balance),
            format_currency(drift.ledger_balance),
            format_currency(drift.difference())
        );
    }
    for account_number in &report.orphaned_accounts {
        println!("Ledger rows reference missing account {}", account_number);
    }
    if report.non_positive_amounts > 0 {
        println!(
            "{} ledger rows carry an invalid amount",
            report.non_positive_amounts
        );
    }

    anyhow::bail!("Ledger verification failed")
}
