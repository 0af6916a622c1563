use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Statement};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use repositories::account::{Account, AccountFilter, NewAccount};

/// Errors surfaced by the user store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write.
    #[error("Duplicate value for unique field: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// The only contract the account core has with persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a new account, failing with [`StoreError::Duplicate`] when the
    /// username is already taken.
    async fn insert_unique(&self, account: NewAccount) -> Result<Account, StoreError>;

    async fn find_one(&self, filter: AccountFilter<'_>) -> Result<Option<Account>, StoreError>;
}

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Every pooled connection to `:memory:` would open its own empty database
        let in_memory = db_url.contains(":memory:");

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        if in_memory {
            opt.max_connections(1).min_connections(1);
        } else {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            let path_str = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }

            opt.max_connections(max_connections)
                .min_connections(min_connections)
                .idle_timeout(Duration::from_secs(300))
                .max_lifetime(Duration::from_secs(600));
        }

        let conn = Database::connect(opt).await?;

        if !in_memory {
            conn.execute_unprepared("PRAGMA journal_mode=WAL").await?;
        }

        migrator::Migrator::up(&conn, None).await?;

        info!(
            in_memory,
            "Database connected & migrations applied (pool: {}-{})",
            if in_memory { 1 } else { min_connections },
            if in_memory { 1 } else { max_connections },
        );

        Ok(Self { conn })
    }

    /// Round-trips a trivial query; the server refuses to start when this fails.
    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Closes the pool; called once at shutdown.
    pub async fn close(self) -> Result<()> {
        self.conn.close().await?;
        Ok(())
    }

    fn account_repo(&self) -> repositories::account::AccountRepository {
        repositories::account::AccountRepository::new(self.conn.clone())
    }

    pub async fn count_accounts(&self, filter: AccountFilter<'_>) -> Result<u64, StoreError> {
        self.account_repo().count(filter).await
    }
}

#[async_trait]
impl UserStore for Store {
    async fn insert_unique(&self, account: NewAccount) -> Result<Account, StoreError> {
        self.account_repo().insert_unique(account).await
    }

    async fn find_one(&self, filter: AccountFilter<'_>) -> Result<Option<Account>, StoreError> {
        self.account_repo().find_one(filter).await
    }
}
