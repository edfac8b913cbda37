use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::api;
use crate::application::LedgerService;
use crate::domain::AccountId;
use crate::io::Exporter;
use crate::observability::LogFormat;

/// Account Ledger - balances and transaction history over HTTP
#[derive(Parser)]
#[command(name = "account-ledger")]
#[command(about = "Account balances backed by an append-only transaction ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, env = "LEDGER_DATABASE", default_value = "ledger.db")]
    pub database: String,

    /// Log output format
    #[arg(
        long,
        env = "LEDGER_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text,
        global = true
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database and apply the schema
    Init,

    /// Serve the HTTP API
    Serve {
        /// Address to listen on
        #[arg(short, long, env = "LEDGER_BIND", default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },

    /// Verify every balance against its ledger
    Check,

    /// Export an account's transaction history
    Export {
        /// Account ID
        account_id: AccountId,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Json,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Init => {
                LedgerService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Serve { bind } => {
                let service = LedgerService::init(&self.database).await?;
                info!(database = %self.database, "Ledger ready");
                api::serve(service, bind).await?;
            }

            Commands::Check => {
                let service = LedgerService::connect(&self.database).await?;
                run_check_command(&service).await?;
            }

            Commands::Export {
                account_id,
                format,
                output,
            } => {
                let service = LedgerService::connect(&self.database).await?;
                let writer: Box<dyn Write> = match &output {
                    Some(path) => Box::new(BufWriter::new(
                        File::create(path)
                            .with_context(|| format!("Failed to create {}", path))?,
                    )),
                    None => Box::new(io::stdout().lock()),
                };

                let exporter = Exporter::new(&service);
                let count = match format {
                    ExportFormat::Csv => exporter.export_history_csv(account_id, writer).await?,
                    ExportFormat::Json => {
                        exporter
                            .export_history_json(account_id, writer)
                            .await?
                            .transactions
                            .len()
                    }
                };

                eprintln!("Exported {} transactions for account {}", count, account_id);
            }
        }

        Ok(())
    }
}

async fn run_check_command(service: &LedgerService) -> Result<()> {
    println!("Checking ledger integrity...\n");

    let report = service.check_integrity().await?;

    println!("Accounts:     {}", report.account_count);
    println!("Transactions: {}", report.transaction_count);
    println!("Total balance: {}", report.total_balance);
    println!();

    if report.is_healthy() {
        println!("Ledger is consistent.");
    } else {
        println!("Issues found:");
        for issue in &report.issues {
            println!("  - {}", issue);
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_export_arguments() {
        let cli = Cli::try_parse_from([
            "account-ledger",
            "--database",
            "bank.db",
            "export",
            "42",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.database, "bank.db");
        match cli.command {
            Commands::Export {
                account_id,
                format,
                output,
            } => {
                assert_eq!(account_id, 42);
                assert_eq!(format, ExportFormat::Json);
                assert!(output.is_none());
            }
            _ => panic!("expected export command"),
        }
    }

    #[test]
    fn test_parse_serve_bind_address() {
        let cli =
            Cli::try_parse_from(["account-ledger", "serve", "--bind", "0.0.0.0:9000"]).unwrap();
        match cli.command {
            Commands::Serve { bind } => assert_eq!(bind.port(), 9000),
            _ => panic!("expected serve command"),
        }
    }
}
