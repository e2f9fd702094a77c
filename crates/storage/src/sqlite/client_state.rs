use async_trait::async_trait;
use chrono::Utc;
use quiz_core::model::{QuizStats, SeenQuestion};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{Row, SqliteConnection};

use super::SqliteRepository;
use crate::repository::{
    SeenQuestionRepository, StatsRepository, StorageError, append_capped, tail,
};

/// Key of the running-stats record.
pub const STATS_KEY: &str = "quizStats";
/// Key of the seen-question log.
pub const SEEN_KEY: &str = "seenQuestions";

fn conn_err(e: sqlx::Error) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

async fn read_json<T: DeserializeOwned>(
    conn: &mut SqliteConnection,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let row = sqlx::query("SELECT value FROM client_state WHERE key = ?1")
        .bind(key)
        .fetch_optional(&mut *conn)
        .await
        .map_err(conn_err)?;
    let Some(row) = row else {
        return Ok(None);
    };
    let raw: String = row.try_get("value").map_err(ser)?;
    serde_json::from_str(&raw).map(Some).map_err(ser)
}

async fn write_json<T: Serialize>(
    conn: &mut SqliteConnection,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(ser)?;
    sqlx::query(
        r"
            INSERT INTO client_state (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
        ",
    )
    .bind(key)
    .bind(raw)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(conn_err)?;
    Ok(())
}

#[async_trait]
impl StatsRepository for SqliteRepository {
    async fn load_stats(&self) -> Result<Option<QuizStats>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        read_json(&mut conn, STATS_KEY).await
    }

    async fn save_stats(&self, stats: &QuizStats) -> Result<(), StorageError> {
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        write_json(&mut conn, STATS_KEY, stats).await
    }
}

#[async_trait]
impl SeenQuestionRepository for SqliteRepository {
    async fn list_seen(&self, limit: usize) -> Result<Vec<SeenQuestion>, StorageError> {
        let mut conn = self.pool.acquire().await.map_err(conn_err)?;
        let log: Vec<SeenQuestion> = read_json(&mut conn, SEEN_KEY).await?.unwrap_or_default();
        Ok(tail(&log, limit))
    }

    async fn append_seen(&self, entries: &[SeenQuestion]) -> Result<(), StorageError> {
        if entries.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await.map_err(conn_err)?;
        let mut log: Vec<SeenQuestion> = read_json(&mut tx, SEEN_KEY).await?.unwrap_or_default();
        append_capped(&mut log, entries);
        write_json(&mut tx, SEEN_KEY, &log).await?;
        tx.commit().await.map_err(conn_err)?;
        Ok(())
    }
}
