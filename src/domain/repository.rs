use crate::domain::models::Account;
use anyhow::Result;
use async_trait::async_trait;

/// Persistence for accounts. Every method maps to a single statement; none
/// of them span a transaction.
#[async_trait]
pub trait AccountRepository: Send + Sync {
    /// Inserts the account and returns the id assigned by the store.
    /// The incoming `id` is ignored.
    async fn create(&self, account: &Account) -> Result<i64>;
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn list(&self) -> Result<Vec<Account>>;
    /// Overwrites every column of the row identified by `account.id`.
    async fn update(&self, account: &Account) -> Result<()>;
    async fn delete(&self, id: i64) -> Result<()>;
}
