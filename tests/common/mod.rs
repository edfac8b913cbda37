// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use account_ledger::application::LedgerService;
use account_ledger::domain::Account;
use anyhow::Result;
use rust_decimal::Decimal;
use std::str::FromStr;
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(LedgerService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = LedgerService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Helper to parse a decimal literal such as "1000.00"
pub fn money(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

/// Test fixture: the account most scenarios start from
pub struct StandardAccounts;

impl StandardAccounts {
    /// "Test User" holding 1000.00
    pub async fn test_user(service: &LedgerService) -> Result<Account> {
        Ok(service
            .create_account("Test User".into(), Some(money("1000.00")))
            .await?)
    }

    /// An account opened with no balance
    pub async fn empty(service: &LedgerService, name: &str) -> Result<Account> {
        Ok(service.create_account(name.into(), None).await?)
    }
}
