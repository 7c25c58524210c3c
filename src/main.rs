use actix_cors::Cors;
use actix_web::{App, HttpServer, web};
use chrono::Duration;
use ledger_bank_api::application::auth_service::AuthService;
use ledger_bank_api::application::service::BankService;
use ledger_bank_api::data::memory::InMemoryAccountRepository;
use ledger_bank_api::data::sql::SqlAccountRepository;
use ledger_bank_api::domain::repository::AccountRepository;
use ledger_bank_api::infrastructure::config::Config;
use ledger_bank_api::infrastructure::logging::init_logging;
use ledger_bank_api::presentation::handlers::AppState;
use ledger_bank_api::presentation::middleware::{JwtAuthMiddleware, RequestLogging};
use ledger_bank_api::presentation::routes::configure;
use std::io;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> io::Result<()> {
    init_logging();

    let config = Config::from_env().map_err(|e| {
        error!(error = %e, "Invalid configuration");
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    match config.database_url.clone() {
        Some(url) => {
            let repository = SqlAccountRepository::connect(&url, config.db_max_connections)
                .await
                .map_err(|e| {
                    error!(error = %e, "Error connecting to the database");
                    io::Error::other(e.to_string())
                })?;
            repository.init_schema().await.map_err(|e| {
                error!(error = %e, "Error initializing the database");
                io::Error::other(e.to_string())
            })?;
            info!("Successfully initialized the database");
            serve(config, Arc::new(repository)).await
        }
        None => {
            warn!("DATABASE_URL not set, accounts are kept in memory only");
            serve(config, Arc::new(InMemoryAccountRepository::new())).await
        }
    }
}

fn cors(origins: &[String]) -> Cors {
    origins
        .iter()
        .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
        .allow_any_method()
        .allow_any_header()
        .supports_credentials()
}

async fn serve<R: AccountRepository + 'static>(config: Config, repository: Arc<R>) -> io::Result<()> {
    let auth_service = Arc::new(AuthService::new(
        repository.clone(),
        config.jwt_secret.clone(),
        Duration::hours(config.token_ttl_hours),
    ));
    let state = web::Data::new(AppState {
        service: BankService::new(repository).with_opening_balance(config.opening_balance),
        auth_service: auth_service.clone(),
        cookie_secure: config.cookie_secure,
    });
    let origins = config.cors_allowed_origins.clone();

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(JwtAuthMiddleware::new(auth_service.clone()))
            .wrap(cors(&origins))
            .wrap(RequestLogging)
            .configure(configure::<R>)
    })
    .bind(&config.listen_addr)?;

    info!(
        address = %config.listen_addr,
        routes = %"POST /login, GET|POST /account, GET|DELETE /account/{id}, POST /transfer, GET /health",
        "API server running"
    );
    server.run().await
}
