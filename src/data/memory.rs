use crate::domain::error::DomainError;
use crate::domain::models::Account;
use crate::domain::repository::AccountRepository;
use anyhow::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, trace};

#[derive(Default)]
struct Storage {
    next_id: i64,
    accounts: BTreeMap<i64, Account>,
}

/// Process-local account store. Mirrors the SQL store's contract, including
/// sequential ids and the unique email constraint.
#[derive(Clone, Default)]
pub struct InMemoryAccountRepository {
    storage: Arc<RwLock<Storage>>,
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn create(&self, account: &Account) -> Result<i64> {
        let mut storage = self.storage.write().await;
        if storage.accounts.values().any(|a| a.email == account.email) {
            return Err(DomainError::Validation(format!(
                "email {} is already registered",
                account.email
            ))
            .into());
        }
        storage.next_id += 1;
        let id = storage.next_id;
        let mut stored = account.clone();
        stored.id = id;
        storage.accounts.insert(id, stored);
        debug!(account_id = id, "Account inserted into memory storage");
        Ok(id)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let storage = self.storage.read().await;
        Ok(storage.accounts.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let storage = self.storage.read().await;
        trace!(email = email, "Looking up account by email in storage");
        Ok(storage
            .accounts
            .values()
            .find(|a| a.email == email)
            .cloned())
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let storage = self.storage.read().await;
        Ok(storage.accounts.values().cloned().collect())
    }

    async fn update(&self, account: &Account) -> Result<()> {
        let mut storage = self.storage.write().await;
        match storage.accounts.get_mut(&account.id) {
            Some(slot) => {
                *slot = account.clone();
                Ok(())
            }
            None => Err(DomainError::AccountNotFound(account.id).into()),
        }
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut storage = self.storage.write().await;
        storage
            .accounts
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| DomainError::AccountNotFound(id).into())
    }
}
