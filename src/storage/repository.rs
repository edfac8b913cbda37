use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use tracing::{debug, instrument};

use crate::domain::{
    Account, AccountId, MovementError, NewAccount, NewTransaction, Transaction, TransactionType,
};

use super::MIGRATION_001_INITIAL;

/// How long a writer waits for the database lock before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_CONNECTIONS: u32 = 8;

/// Outcome of an attempted balance movement.
#[derive(Debug)]
pub enum MovementOutcome {
    /// Balance updated and ledger entry appended, both committed.
    Applied {
        account: Account,
        transaction: Transaction,
    },
    /// No account with that id; nothing was written.
    AccountNotFound,
    /// The domain rule refused the movement; nothing was written.
    Rejected(MovementError),
}

/// Repository for persisting and querying accounts and their ledger.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database URL.
    /// The file is only created if the URL asks for it (`?mode=rwc`).
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context("Invalid database URL")?
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_with(options)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    /// Check that the database answers queries.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .context("Database ping failed")?;
        Ok(())
    }

    // ========================
    // Account operations
    // ========================

    /// Insert a new account and return it with its assigned id.
    #[instrument(skip(self, account), fields(name = %account.name))]
    pub async fn save_account(&self, account: &NewAccount) -> Result<Account> {
        let balance = account.balance.to_string();

        let row = sqlx::query(
            r#"
            INSERT INTO accounts (name, balance, opening_balance)
            VALUES (?, ?, ?)
            RETURNING id, name, balance
            "#,
        )
        .bind(&account.name)
        .bind(&balance)
        .bind(&balance)
        .fetch_one(&self.pool)
        .await
        .context("Failed to save account")?;

        Self::row_to_account(&row)
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let row = sqlx::query("SELECT id, name, balance FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch account")?;

        row.as_ref().map(Self::row_to_account).transpose()
    }

    /// Whether an account with this ID exists.
    pub async fn account_exists(&self, id: AccountId) -> Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = ?) AS found")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to check account existence")?;

        Ok(row.get::<i64, _>("found") != 0)
    }

    /// List all accounts in creation order.
    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query("SELECT id, name, balance FROM accounts ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list accounts")?;

        rows.iter().map(Self::row_to_account).collect()
    }

    /// Opening balance recorded for each account at creation.
    pub async fn opening_balances(&self) -> Result<HashMap<AccountId, Decimal>> {
        let rows = sqlx::query("SELECT id, opening_balance FROM accounts")
            .fetch_all(&self.pool)
            .await
            .context("Failed to fetch opening balances")?;

        let mut balances = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: AccountId = row.get("id");
            let opening: String = row.get("opening_balance");
            balances.insert(id, parse_decimal(&opening, "opening_balance")?);
        }

        Ok(balances)
    }

    /// Apply a deposit or withdrawal as one unit of work.
    ///
    /// The first statement bumps the account version, which takes the write
    /// lock before the balance is read. Concurrent movements on the same
    /// database are therefore serialized and cannot lose updates. Any early
    /// return drops the transaction, which rolls it back.
    #[instrument(skip(self, kind, amount), fields(kind = %kind, amount = %amount))]
    pub async fn apply_movement(
        &self,
        account_id: AccountId,
        kind: TransactionType,
        amount: Decimal,
    ) -> Result<MovementOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let row = sqlx::query(
            r#"
            UPDATE accounts
            SET version = version + 1
            WHERE id = ?
            RETURNING id, name, balance
            "#,
        )
        .bind(account_id)
        .fetch_optional(&mut *tx)
        .await
        .context("Failed to lock account")?;

        let Some(row) = row else {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(MovementOutcome::AccountNotFound);
        };
        let mut account = Self::row_to_account(&row)?;

        let new_balance = match account.balance_after(kind, amount) {
            Ok(balance) => balance,
            Err(err) => {
                tx.rollback().await.context("Failed to roll back")?;
                return Ok(MovementOutcome::Rejected(err));
            }
        };

        sqlx::query("UPDATE accounts SET balance = ? WHERE id = ?")
            .bind(new_balance.to_string())
            .bind(account_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update balance")?;

        let pending = NewTransaction::new(account_id, amount, kind);
        let row = sqlx::query(
            r#"
            INSERT INTO transactions (account_id, amount, type, timestamp)
            VALUES (?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(pending.account_id)
        .bind(pending.amount.to_string())
        .bind(pending.kind.as_str())
        .bind(format_timestamp(&pending.timestamp))
        .fetch_one(&mut *tx)
        .await
        .context("Failed to record transaction")?;
        let transaction_id: i64 = row.get("id");

        tx.commit().await.context("Failed to commit movement")?;

        account.balance = new_balance;
        debug!(transaction_id, balance = %account.balance, "Movement committed");

        Ok(MovementOutcome::Applied {
            account,
            transaction: pending.into_recorded(transaction_id),
        })
    }

    fn row_to_account(row: &SqliteRow) -> Result<Account> {
        let balance: String = row.get("balance");

        Ok(Account {
            id: row.get("id"),
            name: row.get("name"),
            balance: parse_decimal(&balance, "balance")?,
        })
    }

    // ========================
    // Transaction operations
    // ========================

    /// List the ledger of one account, most recent first.
    /// Entries sharing a timestamp come out in reverse insertion order.
    pub async fn list_transactions_for_account(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, type, timestamp
            FROM transactions
            WHERE account_id = ?
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions for account")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    /// An account together with its ledger, most recent first, read from a
    /// single snapshot so the balance and the entries agree.
    pub async fn account_with_history(
        &self,
        account_id: AccountId,
    ) -> Result<Option<(Account, Vec<Transaction>)>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin transaction")?;

        let row = sqlx::query("SELECT id, name, balance FROM accounts WHERE id = ?")
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await
            .context("Failed to fetch account")?;

        let Some(row) = row else {
            tx.rollback().await.context("Failed to roll back")?;
            return Ok(None);
        };
        let account = Self::row_to_account(&row)?;

        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, type, timestamp
            FROM transactions
            WHERE account_id = ?
            ORDER BY timestamp DESC, id DESC
            "#,
        )
        .bind(account_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to list transactions for account")?;

        tx.commit().await.context("Failed to commit")?;

        let transactions = rows
            .iter()
            .map(Self::row_to_transaction)
            .collect::<Result<Vec<_>>>()?;
        Ok(Some((account, transactions)))
    }

    /// List every transaction, grouped by account in insertion order.
    pub async fn list_transactions(&self) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(
            r#"
            SELECT id, account_id, amount, type, timestamp
            FROM transactions
            ORDER BY account_id, id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list transactions")?;

        rows.iter().map(Self::row_to_transaction).collect()
    }

    fn row_to_transaction(row: &SqliteRow) -> Result<Transaction> {
        let amount: String = row.get("amount");
        let kind: String = row.get("type");
        let timestamp: String = row.get("timestamp");

        Ok(Transaction {
            id: row.get("id"),
            account_id: row.get("account_id"),
            amount: parse_decimal(&amount, "amount")?,
            kind: TransactionType::from_str(&kind)
                .ok_or_else(|| anyhow::anyhow!("Invalid transaction type: {}", kind))?,
            timestamp: DateTime::parse_from_rfc3339(&timestamp)
                .context("Invalid timestamp")?
                .with_timezone(&Utc),
        })
    }
}

/// Fixed-width UTC rendering so that text order is chronological order.
fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_decimal(value: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(value).with_context(|| format!("Invalid decimal in {}: {}", column, value))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_timestamps_sort_lexicographically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
        let late = early + chrono::Duration::microseconds(1);

        let a = format_timestamp(&early);
        let b = format_timestamp(&late);

        assert_eq!(a, "2024-01-15T09:30:00.000000Z");
        assert_eq!(a.len(), b.len());
        assert!(a < b);
    }

    #[test]
    fn test_parse_decimal_keeps_scale() {
        let value = parse_decimal("1500.00", "balance").unwrap();
        assert_eq!(value.to_string(), "1500.00");
        assert!(parse_decimal("abc", "balance").is_err());
    }
}
