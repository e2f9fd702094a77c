use async_trait::async_trait;
use quiz_core::model::{QuizStats, SeenQuestion};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Maximum number of entries kept in the seen-question log.
pub const SEEN_LOG_CAP: usize = 200;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Running statistics record. Absent until the first quiz is completed.
#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Load the stored stats record, if any.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be read or decoded.
    async fn load_stats(&self) -> Result<Option<QuizStats>, StorageError>;

    /// Replace the stored stats record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the record cannot be written.
    async fn save_stats(&self, stats: &QuizStats) -> Result<(), StorageError>;
}

/// Growing log of questions already shown, capped at [`SEEN_LOG_CAP`].
#[async_trait]
pub trait SeenQuestionRepository: Send + Sync {
    /// The most recent `limit` entries, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read or decoded.
    async fn list_seen(&self, limit: usize) -> Result<Vec<SeenQuestion>, StorageError>;

    /// Append entries, dropping the oldest ones beyond the cap.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be written.
    async fn append_seen(&self, entries: &[SeenQuestion]) -> Result<(), StorageError>;
}

pub(crate) fn tail(entries: &[SeenQuestion], limit: usize) -> Vec<SeenQuestion> {
    entries[entries.len().saturating_sub(limit)..].to_vec()
}

pub(crate) fn append_capped(log: &mut Vec<SeenQuestion>, entries: &[SeenQuestion]) {
    log.extend_from_slice(entries);
    let overflow = log.len().saturating_sub(SEEN_LOG_CAP);
    if overflow > 0 {
        log.drain(..overflow);
    }
}

/// Simple in-memory repository implementation for testing and offline play.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    stats: Arc<Mutex<Option<QuizStats>>>,
    seen: Arc<Mutex<Vec<SeenQuestion>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsRepository for InMemoryRepository {
    async fn load_stats(&self) -> Result<Option<QuizStats>, StorageError> {
        let guard = self
            .stats
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(*guard)
    }

    async fn save_stats(&self, stats: &QuizStats) -> Result<(), StorageError> {
        let mut guard = self
            .stats
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        *guard = Some(*stats);
        Ok(())
    }
}

#[async_trait]
impl SeenQuestionRepository for InMemoryRepository {
    async fn list_seen(&self, limit: usize) -> Result<Vec<SeenQuestion>, StorageError> {
        let guard = self
            .seen
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(tail(&guard, limit))
    }

    async fn append_seen(&self, entries: &[SeenQuestion]) -> Result<(), StorageError> {
        let mut guard = self
            .seen
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        append_capped(&mut guard, entries);
        Ok(())
    }
}

/// Aggregates the persisted-state repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub stats: Arc<dyn StatsRepository>,
    pub seen: Arc<dyn SeenQuestionRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let stats: Arc<dyn StatsRepository> = Arc::new(repo.clone());
        let seen: Arc<dyn SeenQuestionRepository> = Arc::new(repo);
        Self { stats, seen }
    }
}
