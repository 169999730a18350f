//! SQLite persistence for the namespace store

mod namespace_store;
mod sqlite;

use std::ops::Deref;
use std::path::Path;

use sqlx::SqlitePool;
use url::Url;

pub use namespace_store::{SqliteNamespaceStore, SqliteTx};

const IN_MEMORY_URL: &str = "sqlite::memory:";

/// Migrated connection pool
#[derive(Clone, Debug)]
pub struct Database(SqlitePool);

impl Database {
    pub async fn connect(database_url: &Url) -> Result<Self, DatabaseSetupError> {
        if database_url.scheme() != "sqlite" {
            return Err(DatabaseSetupError::UnknownDbType(
                database_url.scheme().to_string(),
            ));
        }

        let pool = sqlite::connect_sqlite(database_url).await?;
        sqlite::migrate_sqlite(&pool).await?;
        Ok(Database(pool))
    }

    /// Database file at `path`, created if missing
    pub async fn open(path: &Path) -> Result<Self, DatabaseSetupError> {
        let url = Url::parse(&format!("sqlite://{}", path.display()))
            .map_err(|_| DatabaseSetupError::InvalidPath(path.display().to_string()))?;
        Self::connect(&url).await
    }

    /// Private database that lives as long as the pool
    pub async fn in_memory() -> Result<Self, DatabaseSetupError> {
        let url = Url::parse(IN_MEMORY_URL)
            .map_err(|_| DatabaseSetupError::InvalidPath(IN_MEMORY_URL.to_string()))?;
        Self::connect(&url).await
    }
}

impl Deref for Database {
    type Target = SqlitePool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseSetupError {
    #[error("failed to apply namespace store migrations: {0}")]
    MigrationFailed(sqlx::migrate::MigrateError),

    #[error("unable to open the namespace database: {0}")]
    Unavailable(sqlx::Error),

    #[error("invalid database path: {0}")]
    InvalidPath(String),

    #[error("unsupported database scheme: {0}")]
    UnknownDbType(String),
}
