use anyhow::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::io::Write;

use crate::application::LedgerService;
use crate::domain::{Account, AccountId, Transaction};

/// One account and its full ledger, as written by the JSON export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatement {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub account: Account,
    pub transactions: Vec<Transaction>,
}

/// Exporter for writing account history to various formats
pub struct Exporter<'a> {
    service: &'a LedgerService,
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a LedgerService) -> Self {
        Self { service }
    }

    /// Export an account's history to CSV, most recent first, with the
    /// balance as it stood right after each entry.
    pub async fn export_history_csv<W: Write>(
        &self,
        account_id: AccountId,
        writer: W,
    ) -> Result<usize> {
        let (account, transactions) = self.load(account_id).await?;
        let mut csv_writer = csv::Writer::from_writer(writer);

        // Write header
        csv_writer.write_record(["id", "timestamp", "type", "amount", "balance_after"])?;

        let mut balance_after = account.balance;
        for tx in &transactions {
            csv_writer.write_record(&[
                tx.id.to_string(),
                tx.timestamp.to_rfc3339(),
                tx.kind.as_str().to_string(),
                tx.amount.to_string(),
                balance_after.to_string(),
            ])?;
            // Walking backwards in time: undo this entry
            balance_after -= tx.kind.signed(tx.amount);
        }

        csv_writer.flush()?;
        Ok(transactions.len())
    }

    /// Export an account and its history as a JSON statement
    pub async fn export_history_json<W: Write>(
        &self,
        account_id: AccountId,
        mut writer: W,
    ) -> Result<AccountStatement> {
        let (account, transactions) = self.load(account_id).await?;

        let statement = AccountStatement {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            account,
            transactions,
        };

        let json = serde_json::to_string_pretty(&statement)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(statement)
    }

    async fn load(&self, account_id: AccountId) -> Result<(Account, Vec<Transaction>)> {
        Ok(self.service.get_account_statement(account_id).await?)
    }
}

/// Opening balance implied by a statement: current balance with every
/// ledger entry undone.
pub fn implied_opening_balance(statement: &AccountStatement) -> Decimal {
    statement
        .transactions
        .iter()
        .fold(statement.account.balance, |balance, tx| {
            balance - tx.kind.signed(tx.amount)
        })
}
