use crate::domain::repository::AccountRepository;
use crate::presentation::auth::login;
use crate::presentation::handlers::{
    BankError, create_account, delete_account, get_account, health_check, list_accounts, transfer,
};
use actix_web::web;

/// Registers every route plus extractor configs that turn malformed ids and
/// bodies into `{"error": ...}` 400 responses.
///
/// The caller must register `web::Data<AppState<R>>` and wrap the app with
/// `JwtAuthMiddleware<R>`.
pub fn configure<R: AccountRepository + 'static>(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::PathConfig::default().error_handler(|_err, req| {
        let raw = req.match_info().get("id").unwrap_or_default().to_string();
        BankError::Validation(format!("invalid id: {}", raw)).into()
    }))
    .app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| BankError::Validation(err.to_string()).into()),
    )
    .route("/health", web::get().to(health_check))
    .route("/login", web::post().to(login::<R>))
    .service(
        web::resource("/account")
            .route(web::get().to(list_accounts::<R>))
            .route(web::post().to(create_account::<R>)),
    )
    .service(
        web::resource("/account/{id}")
            .route(web::get().to(get_account::<R>))
            .route(web::delete().to(delete_account::<R>)),
    )
    .route("/transfer", web::post().to(transfer::<R>));
}
