use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{MovementError, TransactionType};

/// Storage-assigned account identifier.
pub type AccountId = i64;

/// An account holder and the current balance backed by its ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub balance: Decimal,
}

impl Account {
    /// Balance this account would have after the given movement.
    ///
    /// Does not mutate; the caller persists the result together with the
    /// ledger entry that justifies it.
    pub fn balance_after(
        &self,
        kind: TransactionType,
        amount: Decimal,
    ) -> Result<Decimal, MovementError> {
        if amount <= Decimal::ZERO {
            return Err(MovementError::NonPositiveAmount(amount));
        }

        match kind {
            TransactionType::Deposit => self
                .balance
                .checked_add(amount)
                .ok_or(MovementError::BalanceOverflow {
                    balance: self.balance,
                    amount,
                }),
            TransactionType::Withdrawal => {
                if amount > self.balance {
                    return Err(MovementError::InsufficientFunds {
                        balance: self.balance,
                        requested: amount,
                    });
                }
                Ok(self.balance - amount)
            }
        }
    }
}

/// An account that has not been persisted yet.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub balance: Decimal,
}

impl NewAccount {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            balance: Decimal::ZERO,
        }
    }

    pub fn with_balance(mut self, balance: Decimal) -> Self {
        self.balance = balance;
        self
    }
}
