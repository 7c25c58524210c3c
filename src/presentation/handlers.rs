use crate::application::auth_service::AuthService;
use crate::application::service::BankService;
use crate::domain::error::DomainError;
use crate::domain::models::{AuthenticatedUser, DeletedAccount, NewAccount, TransferRequest};
use crate::domain::repository::AccountRepository;
use actix_web::http::StatusCode;
use actix_web::{FromRequest, HttpMessage, HttpResponse, ResponseError, web};
use chrono::Utc;
use serde::Serialize;
use std::future::{Ready, ready};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

pub struct AppState<R: AccountRepository> {
    pub service: BankService<R>,
    pub auth_service: Arc<AuthService<R>>,
    pub cookie_secure: bool,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Error, Debug)]
pub enum BankError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("{0}")]
    Unauthorized(String),
    #[error("database error")]
    Database(String),
    #[error("internal error")]
    Internal(String),
}

impl ResponseError for BankError {
    fn status_code(&self) -> StatusCode {
        match self {
            BankError::Validation(_) | BankError::NotFound(_) | BankError::InsufficientFunds => {
                StatusCode::BAD_REQUEST
            }
            BankError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            BankError::Database(_) | BankError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let error_msg = self.to_string();

        match self {
            BankError::Database(detail) => {
                error!(error = %detail, status = %status, "Database error")
            }
            BankError::Internal(detail) => {
                error!(error = %detail, status = %status, "Internal error")
            }
            _ => warn!(error = %error_msg, status = %status, "Request rejected"),
        }

        HttpResponse::build(status).json(ErrorResponse { error: error_msg })
    }
}

impl From<anyhow::Error> for BankError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast_ref::<DomainError>() {
            Some(DomainError::InsufficientFunds) => BankError::InsufficientFunds,
            Some(e @ DomainError::AccountNotFound(_)) => BankError::NotFound(e.to_string()),
            Some(e @ DomainError::InvalidAmount) => BankError::Validation(e.to_string()),
            Some(DomainError::Validation(msg)) => BankError::Validation(msg.clone()),
            Some(DomainError::Unauthorized(msg)) => BankError::Unauthorized(msg.clone()),
            Some(DomainError::Internal(msg)) => BankError::Internal(msg.clone()),
            None => BankError::Database(format!("{:#}", err)),
        }
    }
}

impl From<DomainError> for BankError {
    fn from(err: DomainError) -> Self {
        BankError::from(anyhow::Error::from(err))
    }
}

// Populated by `JwtAuthMiddleware`; handlers that take this argument are the
// protected ones.
impl FromRequest for AuthenticatedUser {
    type Error = BankError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        let user = req.extensions().get::<AuthenticatedUser>().cloned();
        ready(user.ok_or_else(|| BankError::Unauthorized("Unauthorized".to_string())))
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
}

pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn create_account<R: AccountRepository + 'static>(
    state: web::Data<AppState<R>>,
    req: web::Json<NewAccount>,
) -> Result<HttpResponse, BankError> {
    let account = state.service.create_account(req.into_inner()).await?;
    info!(account_id = account.id, "Account signup completed");
    Ok(HttpResponse::Ok().json(account))
}

#[instrument(skip(state, user), fields(caller_id = user.account_id))]
pub async fn list_accounts<R: AccountRepository + 'static>(
    state: web::Data<AppState<R>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, BankError> {
    let accounts = state.service.list_accounts().await?;
    info!(count = accounts.len(), "Accounts listed");
    Ok(HttpResponse::Ok().json(accounts))
}

#[instrument(skip(state, user), fields(caller_id = user.account_id, account_id = %*path))]
pub async fn get_account<R: AccountRepository + 'static>(
    state: web::Data<AppState<R>>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, BankError> {
    let account = state.service.get_account(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(account))
}

#[instrument(skip(state, user), fields(caller_id = user.account_id, account_id = %*path))]
pub async fn delete_account<R: AccountRepository + 'static>(
    state: web::Data<AppState<R>>,
    user: AuthenticatedUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, BankError> {
    let id = path.into_inner();
    state.service.delete_account(&user, id).await?;
    Ok(HttpResponse::Ok().json(DeletedAccount { deleted: id }))
}

#[instrument(skip(state, user, req), fields(caller_id = user.account_id))]
pub async fn transfer<R: AccountRepository + 'static>(
    state: web::Data<AppState<R>>,
    user: AuthenticatedUser,
    req: web::Json<TransferRequest>,
) -> Result<HttpResponse, BankError> {
    let transfer_req = req.into_inner();
    let echoed = state
        .service
        .transfer(&user, transfer_req)
        .await
        .map_err(|e| {
            warn!(
                from_account = transfer_req.from_account,
                to_account = transfer_req.to_account,
                amount = transfer_req.amount,
                error = %e,
                "Transfer failed"
            );
            e
        })?;
    Ok(HttpResponse::Ok().json(echoed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_client_errors() {
        let cases = [
            (DomainError::InsufficientFunds, StatusCode::BAD_REQUEST),
            (DomainError::AccountNotFound(3), StatusCode::BAD_REQUEST),
            (DomainError::InvalidAmount, StatusCode::BAD_REQUEST),
            (DomainError::Validation("x".into()), StatusCode::BAD_REQUEST),
            (DomainError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (DomainError::Internal("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (domain, status) in cases {
            assert_eq!(BankError::from(domain).status_code(), status);
        }
    }

    #[test]
    fn test_not_found_keeps_message() {
        let err = BankError::from(DomainError::AccountNotFound(12));
        assert_eq!(err.to_string(), "account 12 not found");
    }

    #[test]
    fn test_unknown_errors_are_database_errors() {
        let err = BankError::from(anyhow::anyhow!("pool timed out"));
        assert!(matches!(err, BankError::Database(ref d) if d == "pool timed out"));
        assert_eq!(err.to_string(), "database error");
    }
}
