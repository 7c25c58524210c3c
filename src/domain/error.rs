use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("insufficient funds")]
    InsufficientFunds,
    #[error("account {0} not found")]
    AccountNotFound(i64),
    #[error("amount must be a positive integer")]
    InvalidAmount,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Internal(String),
}
