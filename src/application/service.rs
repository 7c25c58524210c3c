use crate::domain::error::DomainError;
use crate::domain::models::{Account, AuthenticatedUser, NewAccount, TransferRequest};
use crate::domain::repository::AccountRepository;
use crate::infrastructure::security::hash_password;
use anyhow::Result;
use chrono::{SubsecRound, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

const PHONE_RANGE: std::ops::Range<i64> = 1_000_000_000..10_000_000_000;

pub struct BankService<R: AccountRepository> {
    repository: Arc<R>,
    opening_balance: i64,
}

impl<R: AccountRepository> BankService<R> {
    pub fn new(repository: Arc<R>) -> Self {
        Self {
            repository,
            opening_balance: 0,
        }
    }

    /// Balance credited to every account at signup.
    pub fn with_opening_balance(mut self, opening_balance: i64) -> Self {
        self.opening_balance = opening_balance;
        self
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn create_account(&self, req: NewAccount) -> Result<Account> {
        req.validate()?;

        if self.repository.find_by_email(&req.email).await?.is_some() {
            warn!(email = %req.email, "Email already registered");
            return Err(DomainError::Validation(format!(
                "email {} is already registered",
                req.email
            ))
            .into());
        }

        let password_hash = hash_password(&req.password).map_err(|e| {
            error!(error = %e, "Failed to hash password");
            DomainError::Internal(format!("Failed to hash password: {}", e))
        })?;

        let mut account = Account {
            id: 0,
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            password_hash,
            phone: fastrand::i64(PHONE_RANGE),
            balance: self.opening_balance,
            // the SQL store keeps microsecond precision
            created_at: Utc::now().trunc_subsecs(6),
        };
        account.id = self.repository.create(&account).await?;

        info!(account_id = account.id, "Account created");
        Ok(account)
    }

    pub async fn get_account(&self, id: i64) -> Result<Account> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::AccountNotFound(id).into())
    }

    pub async fn list_accounts(&self) -> Result<Vec<Account>> {
        self.repository.list().await
    }

    /// Only the owner may close an account.
    #[instrument(skip(self, caller), fields(caller_id = caller.account_id))]
    pub async fn delete_account(&self, caller: &AuthenticatedUser, id: i64) -> Result<()> {
        if caller.account_id != id {
            warn!(account_id = id, "Refusing to delete an account the caller does not own");
            return Err(DomainError::Unauthorized("Unauthorized".to_string()).into());
        }
        self.repository.delete(id).await?;
        info!(account_id = id, "Account deleted");
        Ok(())
    }

    /// Debits the source and credits the destination with two independent
    /// writes. If the credit fails, one compensating write re-credits the
    /// source; if that also fails the debited amount is lost. Concurrent
    /// transfers on the same account can lose updates.
    #[instrument(
        skip(self, caller),
        fields(caller_id = caller.account_id, from = req.from_account, to = req.to_account, amount = req.amount)
    )]
    pub async fn transfer(
        &self,
        caller: &AuthenticatedUser,
        req: TransferRequest,
    ) -> Result<TransferRequest> {
        if req.amount <= 0 {
            return Err(DomainError::InvalidAmount.into());
        }
        if req.from_account == req.to_account {
            return Err(DomainError::Validation(
                "cannot transfer to the same account".to_string(),
            )
            .into());
        }
        if caller.account_id != req.from_account {
            warn!("Caller does not own the source account");
            return Err(DomainError::Unauthorized("Unauthorized".to_string()).into());
        }

        let mut from = self.get_account(req.from_account).await?;
        if from.balance < req.amount {
            return Err(DomainError::InsufficientFunds.into());
        }
        let mut to = self.get_account(req.to_account).await?;

        let credited = to.balance.checked_add(req.amount).ok_or_else(|| {
            DomainError::Validation(format!("account {} balance would overflow", to.id))
        })?;
        from.balance -= req.amount;
        to.balance = credited;

        self.repository.update(&from).await?;
        debug!(balance = from.balance, "Source debited");

        if let Err(err) = self.repository.update(&to).await {
            error!(error = %err, "Failed to credit destination, compensating source");
            from.balance += req.amount;
            if let Err(comp_err) = self.repository.update(&from).await {
                error!(
                    account_id = from.id,
                    amount = req.amount,
                    error = %comp_err,
                    "Compensating credit failed, funds lost"
                );
            }
            return Err(err);
        }

        info!("Transfer completed");
        Ok(req)
    }
}
