use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use thiserror::Error;

const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8008";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("environment variable {name} has invalid value {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: String,
    /// `None` selects the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub opening_balance: i64,
    pub cookie_secure: bool,
    pub cors_allowed_origins: Vec<String>,
}

impl Config {
    /// Loads `.env` (if present) and reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_vars(&env::vars().collect())
    }

    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let token_ttl_hours = parse_or(vars, "TOKEN_TTL_HOURS", DEFAULT_TOKEN_TTL_HOURS)?;
        if token_ttl_hours <= 0 {
            return Err(ConfigError::Invalid {
                name: "TOKEN_TTL_HOURS",
                value: token_ttl_hours.to_string(),
            });
        }

        let opening_balance = parse_or(vars, "OPENING_BALANCE", 0i64)?;
        if opening_balance < 0 {
            return Err(ConfigError::Invalid {
                name: "OPENING_BALANCE",
                value: opening_balance.to_string(),
            });
        }

        Ok(Config {
            listen_addr: get("LISTEN_ADDR").unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
            database_url: get("DATABASE_URL").or_else(|| get("DB_URL")),
            db_max_connections: parse_or(vars, "DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            jwt_secret,
            token_ttl_hours,
            opening_balance,
            cookie_secure: parse_or(vars, "COOKIE_SECURE", false)?,
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        })
    }
}

fn parse_or<T: FromStr>(
    vars: &HashMap<String, String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(name).map(|v| v.trim()).filter(|v| !v.is_empty()) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
            name,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_apply_when_only_secret_is_set() {
        let config = Config::from_vars(&vars(&[("JWT_SECRET", "s3cret")])).unwrap();

        assert_eq!(config.listen_addr, "0.0.0.0:8008");
        assert_eq!(config.database_url, None);
        assert_eq!(config.db_max_connections, 10);
        assert_eq!(config.token_ttl_hours, 24);
        assert_eq!(config.opening_balance, 0);
        assert!(!config.cookie_secure);
        assert!(config.cors_allowed_origins.is_empty());
    }

    #[test]
    fn test_missing_secret_is_an_error() {
        let err = Config::from_vars(&vars(&[("DATABASE_URL", "postgres://x")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn test_legacy_db_url_is_honoured() {
        let config = Config::from_vars(&vars(&[
            ("JWT_SECRET", "s"),
            ("DB_URL", "postgres://bank@localhost/bank"),
        ]))
        .unwrap();
        assert_eq!(
            config.database_url.as_deref(),
            Some("postgres://bank@localhost/bank")
        );
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = Config::from_vars(&vars(&[("JWT_SECRET", "s"), ("TOKEN_TTL_HOURS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "TOKEN_TTL_HOURS", .. }));

        let err = Config::from_vars(&vars(&[("JWT_SECRET", "s"), ("OPENING_BALANCE", "-5")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "OPENING_BALANCE", .. }));
    }

    #[test]
    fn test_cors_origins_are_split() {
        let config = Config::from_vars(&vars(&[
            ("JWT_SECRET", "s"),
            ("CORS_ALLOWED_ORIGINS", "http://localhost:3000, https://bank.example"),
        ]))
        .unwrap();
        assert_eq!(
            config.cors_allowed_origins,
            vec!["http://localhost:3000", "https://bank.example"]
        );
    }
}
