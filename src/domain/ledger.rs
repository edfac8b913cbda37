use rust_decimal::Decimal;

use super::{Account, AccountId, Transaction, TransactionId};

/// Compute an account balance from its opening balance and ledger.
/// Balance = opening + sum of deposits - sum of withdrawals
pub fn compute_balance(opening_balance: Decimal, transactions: &[Transaction]) -> Decimal {
    transactions.iter().fold(opening_balance, |balance, tx| {
        balance + tx.kind.signed(tx.amount)
    })
}

/// Why a deposit or withdrawal cannot be applied to an account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementError {
    NonPositiveAmount(Decimal),
    InsufficientFunds { balance: Decimal, requested: Decimal },
    BalanceOverflow { balance: Decimal, amount: Decimal },
}

impl std::fmt::Display for MovementError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MovementError::NonPositiveAmount(amount) => {
                write!(f, "Amount must be positive, got {}", amount)
            }
            MovementError::InsufficientFunds { balance, requested } => write!(
                f,
                "Insufficient funds: balance {}, requested {}",
                balance, requested
            ),
            MovementError::BalanceOverflow { balance, amount } => write!(
                f,
                "Balance {} cannot grow by {} without exceeding the supported range",
                balance, amount
            ),
        }
    }
}

impl std::error::Error for MovementError {}

/// One account together with everything needed to re-derive its balance.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub account: Account,
    pub opening_balance: Decimal,
    pub transactions: Vec<Transaction>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IntegrityIssue {
    BalanceMismatch {
        account_id: AccountId,
        stored: Decimal,
        computed: Decimal,
    },
    NegativeBalance {
        account_id: AccountId,
        balance: Decimal,
    },
    NonPositiveAmount {
        transaction_id: TransactionId,
        amount: Decimal,
    },
    OrphanTransaction {
        transaction_id: TransactionId,
        account_id: AccountId,
    },
}

impl std::fmt::Display for IntegrityIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityIssue::BalanceMismatch {
                account_id,
                stored,
                computed,
            } => write!(
                f,
                "Account {} stores balance {} but its ledger adds up to {}",
                account_id, stored, computed
            ),
            IntegrityIssue::NegativeBalance {
                account_id,
                balance,
            } => write!(f, "Account {} has negative balance {}", account_id, balance),
            IntegrityIssue::NonPositiveAmount {
                transaction_id,
                amount,
            } => write!(
                f,
                "Transaction {} has non-positive amount {}",
                transaction_id, amount
            ),
            IntegrityIssue::OrphanTransaction {
                transaction_id,
                account_id,
            } => write!(
                f,
                "Transaction {} references missing account {}",
                transaction_id, account_id
            ),
        }
    }
}

/// Result of verifying every account against its ledger.
#[derive(Debug, Clone)]
pub struct IntegrityReport {
    pub account_count: usize,
    pub transaction_count: usize,
    pub total_balance: Decimal,
    pub issues: Vec<IntegrityIssue>,
}

impl IntegrityReport {
    pub fn is_healthy(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Check the balance invariant for every snapshot and flag malformed
/// ledger rows.
pub fn build_integrity_report(
    snapshots: &[LedgerSnapshot],
    orphans: &[Transaction],
) -> IntegrityReport {
    let mut issues = Vec::new();
    let mut transaction_count = orphans.len();
    let mut total_balance = Decimal::ZERO;

    for snapshot in snapshots {
        let account = &snapshot.account;
        transaction_count += snapshot.transactions.len();
        total_balance += account.balance;

        let computed = compute_balance(snapshot.opening_balance, &snapshot.transactions);
        if computed != account.balance {
            issues.push(IntegrityIssue::BalanceMismatch {
                account_id: account.id,
                stored: account.balance,
                computed,
            });
        }

        if account.balance < Decimal::ZERO {
            issues.push(IntegrityIssue::NegativeBalance {
                account_id: account.id,
                balance: account.balance,
            });
        }

        for tx in &snapshot.transactions {
            if tx.amount <= Decimal::ZERO {
                issues.push(IntegrityIssue::NonPositiveAmount {
                    transaction_id: tx.id,
                    amount: tx.amount,
                });
            }
        }
    }

    for tx in orphans {
        issues.push(IntegrityIssue::OrphanTransaction {
            transaction_id: tx.id,
            account_id: tx.account_id,
        });
    }

    IntegrityReport {
        account_count: snapshots.len(),
        transaction_count,
        total_balance,
        issues,
    }
}
