use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{info, instrument, warn};

use crate::domain::{
    build_integrity_report, Account, AccountId, IntegrityReport, LedgerSnapshot, MovementError,
    NewAccount, Transaction, TransactionType,
};
use crate::storage::{MovementOutcome, Repository};

use super::AppError;

/// Application service providing the ledger operations.
/// This is the primary interface for any client (HTTP, CLI, tests).
#[derive(Clone)]
pub struct LedgerService {
    repo: Repository,
}

impl LedgerService {
    /// Create a new ledger service with the given repository.
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }

    /// Initialize a database at the given path, creating it if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Verify the backing store is reachable.
    pub async fn health_check(&self) -> Result<(), AppError> {
        Ok(self.repo.ping().await?)
    }

    // ========================
    // Account operations
    // ========================

    /// Open a new account. A missing initial balance means zero.
    #[instrument(skip(self))]
    pub async fn create_account(
        &self,
        name: String,
        initial_balance: Option<Decimal>,
    ) -> Result<Account, AppError> {
        let balance = initial_balance.unwrap_or(Decimal::ZERO);
        if balance < Decimal::ZERO {
            return Err(AppError::InvalidAmount(
                "Initial balance cannot be negative".to_string(),
            ));
        }

        let account = self
            .repo
            .save_account(&NewAccount::new(name).with_balance(balance))
            .await?;

        info!(account_id = account.id, balance = %account.balance, "Account created");
        Ok(account)
    }

    /// Get an account by ID.
    pub async fn get_account(&self, id: AccountId) -> Result<Option<Account>, AppError> {
        Ok(self.repo.get_account(id).await?)
    }

    /// List all accounts.
    pub async fn list_accounts(&self) -> Result<Vec<Account>, AppError> {
        Ok(self.repo.list_accounts().await?)
    }

    // ========================
    // Ledger operations
    // ========================

    /// Deposit money into an account.
    pub async fn deposit(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Account, AppError> {
        self.move_funds(account_id, TransactionType::Deposit, amount).await
    }

    /// Withdraw money from an account.
    pub async fn withdraw(
        &self,
        account_id: AccountId,
        amount: Decimal,
    ) -> Result<Account, AppError> {
        self.move_funds(account_id, TransactionType::Withdrawal, amount).await
    }

    /// Transaction history for an account, most recent first.
    pub async fn get_transaction_history(
        &self,
        account_id: AccountId,
    ) -> Result<Vec<Transaction>, AppError> {
        if !self.repo.account_exists(account_id).await? {
            return Err(AppError::AccountNotFound(account_id));
        }

        Ok(self.repo.list_transactions_for_account(account_id).await?)
    }

    /// An account with its full history, both taken from the same snapshot.
    pub async fn get_account_statement(
        &self,
        account_id: AccountId,
    ) -> Result<(Account, Vec<Transaction>), AppError> {
        self.repo
            .account_with_history(account_id)
            .await?
            .ok_or(AppError::AccountNotFound(account_id))
    }

    #[instrument(skip(self, kind, amount), fields(kind = %kind, amount = %amount))]
    async fn move_funds(
        &self,
        account_id: AccountId,
        kind: TransactionType,
        amount: Decimal,
    ) -> Result<Account, AppError> {
        // Validate amount before touching storage
        if amount <= Decimal::ZERO {
            return Err(AppError::InvalidAmount(non_positive_message(kind)));
        }

        match self.repo.apply_movement(account_id, kind, amount).await? {
            MovementOutcome::Applied {
                account,
                transaction,
            } => {
                info!(
                    transaction_id = transaction.id,
                    balance = %account.balance,
                    "Movement recorded"
                );
                Ok(account)
            }
            MovementOutcome::AccountNotFound => Err(AppError::AccountNotFound(account_id)),
            MovementOutcome::Rejected(MovementError::InsufficientFunds { balance, requested }) => {
                warn!(%balance, %requested, "Withdrawal rejected");
                Err(AppError::InsufficientFunds {
                    account_id,
                    balance,
                    requested,
                })
            }
            MovementOutcome::Rejected(err @ MovementError::BalanceOverflow { .. }) => {
                warn!(error = %err, "Deposit rejected");
                Err(AppError::InvalidAmount(err.to_string()))
            }
            MovementOutcome::Rejected(MovementError::NonPositiveAmount(_)) => {
                Err(AppError::InvalidAmount(non_positive_message(kind)))
            }
        }
    }

    // ========================
    // Integrity operations
    // ========================

    /// Re-derive every balance from its ledger and report discrepancies.
    pub async fn check_integrity(&self) -> Result<IntegrityReport, AppError> {
        let accounts = self.repo.list_accounts().await?;
        let mut openings = self.repo.opening_balances().await?;

        let mut by_account: HashMap<AccountId, Vec<Transaction>> = HashMap::new();
        for tx in self.repo.list_transactions().await? {
            by_account.entry(tx.account_id).or_default().push(tx);
        }

        let snapshots: Vec<LedgerSnapshot> = accounts
            .into_iter()
            .map(|account| LedgerSnapshot {
                opening_balance: openings.remove(&account.id).unwrap_or(Decimal::ZERO),
                transactions: by_account.remove(&account.id).unwrap_or_default(),
                account,
            })
            .collect();

        // Whatever is left belongs to no known account
        let orphans: Vec<Transaction> = by_account.into_values().flatten().collect();

        Ok(build_integrity_report(&snapshots, &orphans))
    }
}

fn non_positive_message(kind: TransactionType) -> String {
    match kind {
        TransactionType::Deposit => "Deposit amount must be positive".to_string(),
        TransactionType::Withdrawal => "Withdrawal amount must be positive".to_string(),
    }
}
