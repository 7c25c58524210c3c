#![allow(dead_code, unused_macros)]

use ledger_bank_api::data::sql::{Dialect, SqlAccountRepository};
use sqlx::any::{AnyPoolOptions, install_default_drivers};

pub const JWT_SECRET: &str = "test-secret-key-for-integration-tests";
pub const PASSWORD: &str = "verystrongpassword";

pub async fn sqlite_repository() -> SqlAccountRepository {
    install_default_drivers();
    let db_name = format!("it_{}", fastrand::u64(..));
    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect(&format!("sqlite:file:{}?mode=memory&cache=shared", db_name))
        .await
        .expect("Failed to create in-memory SQLite DB");
    let repository = SqlAccountRepository::from_pool(pool, Dialect::Sqlite);
    repository.init_schema().await.expect("Failed to create account table");
    repository
}

/// `setup_app!(RepoType, repo_expr)` builds the full app over the given store
/// and yields `(app, Arc<RepoType>)`.
macro_rules! setup_app {
    ($repo_ty:ty, $repo:expr) => {{
        let repository = std::sync::Arc::new($repo);
        let auth_service = std::sync::Arc::new(
            ledger_bank_api::application::auth_service::AuthService::new(
                repository.clone(),
                common::JWT_SECRET.to_string(),
                chrono::Duration::hours(24),
            ),
        );
        let state = actix_web::web::Data::new(ledger_bank_api::presentation::handlers::AppState {
            service: ledger_bank_api::application::service::BankService::new(repository.clone()),
            auth_service: auth_service.clone(),
            cookie_secure: false,
        });
        let app = actix_web::test::init_service(
            actix_web::App::new()
                .app_data(state)
                .wrap(ledger_bank_api::presentation::middleware::JwtAuthMiddleware::new(
                    auth_service,
                ))
                .configure(ledger_bank_api::presentation::routes::configure::<$repo_ty>),
        )
        .await;
        (app, repository)
    }};
    () => {
        setup_app!(
            ledger_bank_api::data::memory::InMemoryAccountRepository,
            ledger_bank_api::data::memory::InMemoryAccountRepository::new()
        )
    };
}

/// Signs up through `POST /account` and returns the created account.
macro_rules! signup {
    ($app:expr, $email:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/account")
            .set_json(serde_json::json!({
                "firstName": "John",
                "lastName": "Doe",
                "email": $email,
                "password": common::PASSWORD,
            }))
            .to_request();
        let account: ledger_bank_api::domain::models::Account =
            actix_web::test::call_and_read_body_json(&$app, req).await;
        account
    }};
}

/// Logs in through `POST /login` and returns the bearer token.
macro_rules! login {
    ($app:expr, $email:expr) => {{
        let req = actix_web::test::TestRequest::post()
            .uri("/login")
            .set_json(serde_json::json!({ "email": $email, "password": common::PASSWORD }))
            .to_request();
        let resp: serde_json::Value = actix_web::test::call_and_read_body_json(&$app, req).await;
        resp["token"].as_str().expect("login returned no token").to_string()
    }};
}
