use crate::domain::error::DomainError;
use crate::domain::models::Account;
use crate::domain::repository::AccountRepository;
use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::AnyPool;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use std::time::Duration;
use tracing::{debug, info, instrument};

const POSTGRES_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS account (
        id BIGSERIAL PRIMARY KEY,
        first_name VARCHAR(50) NOT NULL,
        last_name VARCHAR(50) NOT NULL,
        email VARCHAR(100) NOT NULL UNIQUE,
        encrypted_password VARCHAR(255) NOT NULL,
        phone BIGINT NOT NULL,
        balance BIGINT NOT NULL,
        created_at BIGINT NOT NULL
    )"#;

const SQLITE_SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS account (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        encrypted_password TEXT NOT NULL,
        phone INTEGER NOT NULL,
        balance INTEGER NOT NULL,
        created_at INTEGER NOT NULL
    )"#;

const SELECT_COLUMNS: &str =
    "SELECT id, first_name, last_name, email, encrypted_password, phone, balance, created_at FROM account";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    pub fn from_url(url: &str) -> Result<Self> {
        if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Ok(Dialect::Postgres)
        } else if url.starts_with("sqlite:") {
            Ok(Dialect::Sqlite)
        } else {
            bail!("unsupported database url scheme: {}", url.split(':').next().unwrap_or(""))
        }
    }

    fn schema(self) -> &'static str {
        match self {
            Dialect::Postgres => POSTGRES_SCHEMA,
            Dialect::Sqlite => SQLITE_SCHEMA,
        }
    }
}

// created_at is stored as microseconds since the unix epoch so that one
// schema works through the Any driver on both backends.
#[derive(sqlx::FromRow)]
struct AccountRow {
    id: i64,
    first_name: String,
    last_name: String,
    email: String,
    encrypted_password: String,
    phone: i64,
    balance: i64,
    created_at: i64,
}

impl TryFrom<AccountRow> for Account {
    type Error = anyhow::Error;

    fn try_from(row: AccountRow) -> Result<Self> {
        let created_at = DateTime::<Utc>::from_timestamp_micros(row.created_at)
            .ok_or_else(|| anyhow!("account {} has an out-of-range created_at", row.id))?;
        Ok(Account {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            password_hash: row.encrypted_password,
            phone: row.phone,
            balance: row.balance,
            created_at,
        })
    }
}

fn map_write_error(err: sqlx::Error, email: &str) -> anyhow::Error {
    match err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            DomainError::Validation(format!("email {} is already registered", email)).into()
        }
        e => anyhow::Error::new(e).context("account write failed"),
    }
}

/// Account store backed by a relational database through sqlx's `Any` driver.
#[derive(Clone)]
pub struct SqlAccountRepository {
    pool: AnyPool,
    dialect: Dialect,
}

impl SqlAccountRepository {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let dialect = Dialect::from_url(url)?;
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .idle_timeout(Duration::from_secs(30))
            .connect(url)
            .await
            .context("failed to create database pool")?;
        info!(dialect = ?dialect, max_connections, "Database pool created");
        Ok(Self { pool, dialect })
    }

    pub fn from_pool(pool: AnyPool, dialect: Dialect) -> Self {
        Self { pool, dialect }
    }

    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(self.dialect.schema())
            .execute(&self.pool)
            .await
            .context("failed to create account table")?;
        info!("Account table ready");
        Ok(())
    }

    pub async fn drop_schema(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS account")
            .execute(&self.pool)
            .await
            .context("failed to drop account table")?;
        Ok(())
    }
}

#[async_trait]
impl AccountRepository for SqlAccountRepository {
    #[instrument(skip(self, account), fields(email = %account.email))]
    async fn create(&self, account: &Account) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO account
                (first_name, last_name, email, encrypted_password, phone, balance, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id"#,
        )
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.phone)
        .bind(account.balance)
        .bind(account.created_at.timestamp_micros())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &account.email))?;

        debug!(account_id = row.0, "Account row inserted");
        Ok(row.0)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{} WHERE id = $1", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load account {}", id))?;
        row.map(Account::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!("{} WHERE email = $1", SELECT_COLUMNS))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .context("failed to load account by email")?;
        row.map(Account::try_from).transpose()
    }

    async fn list(&self) -> Result<Vec<Account>> {
        let rows = sqlx::query_as::<_, AccountRow>(&format!("{} ORDER BY id", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("failed to list accounts")?;
        rows.into_iter().map(Account::try_from).collect()
    }

    #[instrument(skip(self, account), fields(account_id = account.id))]
    async fn update(&self, account: &Account) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE account
            SET first_name = $1, last_name = $2, email = $3, encrypted_password = $4,
                phone = $5, balance = $6
            WHERE id = $7"#,
        )
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.phone)
        .bind(account.balance)
        .bind(account.id)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, &account.email))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::AccountNotFound(account.id).into());
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let result = sqlx::query("DELETE FROM account WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete account {}", id))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::AccountNotFound(id).into());
        }
        Ok(())
    }
}
