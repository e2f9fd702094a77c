use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{SeenQuestionRepository, StatsRepository, Storage};

mod client_state;
mod migrate;

pub use client_state::{SEEN_KEY, STATS_KEY};

/// Plain `sqlite::memory:` gives every connection its own database.
const PRIVATE_MEMORY_URL: &str = "sqlite::memory:";

/// Quiz stats and the seen-question log, stored as JSON records in one
/// `client_state` table.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Open the quiz database at `database_url`.
    ///
    /// Writes are one small record at a time, so a couple of connections are
    /// enough; a private in-memory database is pinned to a single connection
    /// so that migrations and queries see the same tables.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or
    /// the connection pragmas fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let max_connections = if database_url.trim() == PRIVATE_MEMORY_URL {
            1
        } else {
            2
        };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    // Readers of the stats record must not block the seen-log append.
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bring the `client_state` schema up to date. Safe to run on every start.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Open and migrate the quiz database, sharing one pool between the
    /// stats and seen-question handles.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let stats: Arc<dyn StatsRepository> = Arc::new(repo.clone());
        let seen: Arc<dyn SeenQuestionRepository> = Arc::new(repo);
        Ok(Self { stats, seen })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }

    #[tokio::test]
    async fn private_memory_database_keeps_its_tables() {
        let storage = Storage::sqlite(PRIVATE_MEMORY_URL).await.unwrap();
        assert_eq!(storage.stats.load_stats().await.unwrap(), None);
        assert!(storage.seen.list_seen(5).await.unwrap().is_empty());
    }
}
