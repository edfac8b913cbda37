use account_ledger::cli::Cli;
use account_ledger::observability::init_tracing;
use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing("info", cli.log_format);
    cli.run().await
}
