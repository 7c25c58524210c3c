use crate::domain::error::DomainError;
use crate::domain::models::{AuthenticatedUser, LoginRequest};
use crate::domain::repository::AccountRepository;
use crate::infrastructure::security::{decode_token, issue_token, verify_password};
use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, trace, warn};

const INVALID_CREDENTIALS: &str = "Invalid credentials";
const UNAUTHORIZED: &str = "Unauthorized";

pub struct AuthService<R: AccountRepository> {
    repository: Arc<R>,
    jwt_secret: String,
    token_ttl: Duration,
}

impl<R: AccountRepository> AuthService<R> {
    pub fn new(repository: Arc<R>, jwt_secret: String, token_ttl: Duration) -> Self {
        Self {
            repository,
            jwt_secret,
            token_ttl,
        }
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Verifies the password and issues a signed token for the account.
    #[instrument(skip(self, req), fields(email = %req.email))]
    pub async fn login(&self, req: LoginRequest) -> Result<String> {
        trace!("Starting login");

        let account = self
            .repository
            .find_by_email(&req.email)
            .await?
            .ok_or_else(|| {
                warn!(email = %req.email, "Account not found during login");
                DomainError::Unauthorized(INVALID_CREDENTIALS.to_string())
            })?;

        let is_valid = verify_password(&req.password, &account.password_hash).map_err(|e| {
            error!(account_id = account.id, error = %e, "Stored password hash is unreadable");
            DomainError::Internal(format!("Failed to verify password: {}", e))
        })?;

        if !is_valid {
            warn!(account_id = account.id, "Invalid password during login");
            return Err(DomainError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
        }

        let token = issue_token(account.id, &account.email, &self.jwt_secret, self.token_ttl)
            .map_err(|e| {
                error!(error = %e, "Failed to generate token");
                DomainError::Internal(format!("Failed to generate token: {}", e))
            })?;

        info!(account_id = account.id, "Login successful");
        Ok(token)
    }

    /// Validates the token and cross-checks its email against the account
    /// currently stored under its id. A token issued before an email change
    /// stops working.
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser> {
        let claims = decode_token(token, &self.jwt_secret).map_err(|e| {
            debug!(error = %e, "Rejected bearer token");
            DomainError::Unauthorized(UNAUTHORIZED.to_string())
        })?;

        let account = self
            .repository
            .find_by_id(claims.id)
            .await?
            .ok_or_else(|| {
                debug!(account_id = claims.id, "Token refers to a missing account");
                DomainError::Unauthorized(UNAUTHORIZED.to_string())
            })?;

        if account.email != claims.email {
            warn!(account_id = claims.id, "Token email no longer matches account");
            return Err(DomainError::Unauthorized(UNAUTHORIZED.to_string()).into());
        }

        Ok(AuthenticatedUser {
            account_id: claims.id,
            email: claims.email,
        })
    }
}
