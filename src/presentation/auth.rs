use crate::domain::models::LoginRequest;
use crate::domain::repository::AccountRepository;
use crate::presentation::handlers::{AppState, BankError};
use actix_web::cookie::{Cookie, SameSite, time::Duration as CookieDuration};
use actix_web::{HttpResponse, web};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

pub const TOKEN_COOKIE: &str = "token";

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    pub token: String,
}

/// Verifies credentials and hands the token back both as an HttpOnly cookie
/// and in the body for clients that send it in the `Authorization` header.
#[instrument(skip(state, req), fields(email = %req.email))]
pub async fn login<R: AccountRepository + 'static>(
    state: web::Data<AppState<R>>,
    req: web::Json<LoginRequest>,
) -> Result<HttpResponse, BankError> {
    let token = state.auth_service.login(req.into_inner()).await?;

    let cookie = Cookie::build(TOKEN_COOKIE, token.clone())
        .path("/")
        .http_only(true)
        .secure(state.cookie_secure)
        .same_site(SameSite::Strict)
        .max_age(CookieDuration::seconds(
            state.auth_service.token_ttl().num_seconds(),
        ))
        .finish();

    info!("Session cookie issued");
    Ok(HttpResponse::Ok().cookie(cookie).json(LoginResponse {
        message: "Login successful".to_string(),
        token,
    }))
}
