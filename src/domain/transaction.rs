use chrono::{DateTime, SubsecRound, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::AccountId;

/// Storage-assigned transaction identifier.
pub type TransactionId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money added to the account
    Deposit,
    /// Money taken out of the account
    Withdrawal,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Deposit => "DEPOSIT",
            TransactionType::Withdrawal => "WITHDRAWAL",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DEPOSIT" => Some(TransactionType::Deposit),
            "WITHDRAWAL" => Some(TransactionType::Withdrawal),
            _ => None,
        }
    }

    /// Signed contribution of an amount of this type to a balance.
    pub fn signed(&self, amount: Decimal) -> Decimal {
        match self {
            TransactionType::Deposit => amount,
            TransactionType::Withdrawal => -amount,
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A ledger entry. Transactions are immutable once recorded; the amount is
/// always positive and the direction is carried by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: TransactionId,
    pub account_id: AccountId,
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub timestamp: DateTime<Utc>,
}

/// A transaction waiting to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub kind: TransactionType,
    pub timestamp: DateTime<Utc>,
}

impl NewTransaction {
    /// Create a transaction stamped with the current server time,
    /// truncated to the microsecond precision storage keeps.
    pub fn new(account_id: AccountId, amount: Decimal, kind: TransactionType) -> Self {
        assert!(
            amount > Decimal::ZERO,
            "Transaction amount must be positive"
        );
        Self {
            account_id,
            amount,
            kind,
            timestamp: Utc::now().trunc_subsecs(6),
        }
    }

    /// Attach the identifier assigned by storage.
    pub fn into_recorded(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            account_id: self.account_id,
            amount: self.amount,
            kind: self.kind,
            timestamp: self.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    #[test]
    fn test_transaction_type_roundtrip() {
        for kind in [TransactionType::Deposit, TransactionType::Withdrawal] {
            let parsed = TransactionType::from_str(kind.as_str()).unwrap();
            assert_eq!(kind, parsed);
        }
        assert_eq!(
            TransactionType::from_str("deposit"),
            Some(TransactionType::Deposit)
        );
        assert_eq!(TransactionType::from_str("transfer"), None);
    }

    #[test]
    fn test_signed_amounts() {
        assert_eq!(TransactionType::Deposit.signed(dec!(5.00)), dec!(5.00));
        assert_eq!(TransactionType::Withdrawal.signed(dec!(5.00)), dec!(-5.00));
    }

    #[test]
    fn test_new_transaction_is_stamped_now() {
        let before = Utc::now().trunc_subsecs(6);
        let tx = NewTransaction::new(7, dec!(100.00), TransactionType::Deposit);
        assert!(tx.timestamp >= before);
        assert!(tx.timestamp <= Utc::now());

        let recorded = tx.into_recorded(3);
        assert_eq!(recorded.id, 3);
        assert_eq!(recorded.account_id, 7);
        assert_eq!(recorded.amount, dec!(100.00));
        assert_eq!(recorded.kind, TransactionType::Deposit);
    }

    #[test]
    #[should_panic(expected = "Transaction amount must be positive")]
    fn test_transaction_requires_positive_amount() {
        NewTransaction::new(1, Decimal::ZERO, TransactionType::Withdrawal);
    }

    #[test]
    fn test_transaction_json_shape() {
        let tx = NewTransaction::new(1, dec!(50.00), TransactionType::Withdrawal).into_recorded(9);
        let value = serde_json::to_value(&tx).unwrap();

        assert_eq!(value["id"], 9);
        assert_eq!(value["accountId"], 1);
        assert_eq!(value["type"], "WITHDRAWAL");
        assert!(value["amount"].is_number());
        assert!(value["timestamp"].is_string());
    }
}
