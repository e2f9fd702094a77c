use std::sync::Arc;

use quiz_core::Clock;
use quiz_core::model::{QuestionSet, SeenQuestion};
use storage::repository::{SeenQuestionRepository, StorageError};

/// Log of questions already shown, fed back to generation as exclusions.
#[derive(Clone)]
pub struct SeenQuestionService {
    clock: Clock,
    repo: Arc<dyn SeenQuestionRepository>,
}

impl SeenQuestionService {
    #[must_use]
    pub fn new(clock: Clock, repo: Arc<dyn SeenQuestionRepository>) -> Self {
        Self { clock, repo }
    }

    /// Texts of the most recent `limit` seen questions, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be read.
    pub async fn recent_texts(&self, limit: usize) -> Result<Vec<String>, StorageError> {
        let entries = self.repo.list_seen(limit).await?;
        Ok(entries.into_iter().map(|entry| entry.text).collect())
    }

    /// Append every question of `set` to the log.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the log cannot be written.
    pub async fn record(&self, set: &QuestionSet) -> Result<(), StorageError> {
        let now = self.clock.now();
        let entries: Vec<SeenQuestion> = set
            .iter()
            .map(|question| SeenQuestion::new(question.text(), now))
            .collect();
        self.repo.append_seen(&entries).await?;
        tracing::debug!(appended = entries.len(), "seen questions recorded");
        Ok(())
    }
}
