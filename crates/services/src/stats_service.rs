use std::sync::Arc;

use quiz_core::model::{QuizStats, QuizSummary};
use storage::repository::{StatsRepository, StorageError};

/// Running statistics across completed quizzes.
#[derive(Clone)]
pub struct StatsService {
    repo: Arc<dyn StatsRepository>,
}

impl StatsService {
    #[must_use]
    pub fn new(repo: Arc<dyn StatsRepository>) -> Self {
        Self { repo }
    }

    /// Load persisted stats (or zeroes if nothing was stored yet).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on storage failures.
    pub async fn load(&self) -> Result<QuizStats, StorageError> {
        let stats = self.repo.load_stats().await?;
        Ok(stats.unwrap_or_default())
    }

    /// Fold a finished quiz into the running stats and persist the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the prior record cannot be read or the new one written.
    pub async fn record(&self, summary: &QuizSummary) -> Result<QuizStats, StorageError> {
        let prior = self.load().await?;
        let updated = prior.record(summary);
        self.repo.save_stats(&updated).await?;
        tracing::info!(
            quizzes_taken = updated.quizzes_taken,
            average_score = updated.average_score,
            "quiz stats updated"
        );
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::InMemoryRepository;

    #[tokio::test]
    async fn missing_record_loads_as_zero() {
        let service = StatsService::new(Arc::new(InMemoryRepository::new()));
        assert_eq!(service.load().await.unwrap(), QuizStats::default());
    }

    #[tokio::test]
    async fn running_average_is_persisted() {
        let repo = Arc::new(InMemoryRepository::new());
        let service = StatsService::new(repo.clone());

        let first = service.record(&QuizSummary::new(3, 4)).await.unwrap();
        assert_eq!((first.quizzes_taken, first.average_score), (1, 75));

        let second = service.record(&QuizSummary::new(2, 4)).await.unwrap();
        assert_eq!((second.quizzes_taken, second.average_score), (2, 63));

        assert_eq!(repo.load_stats().await.unwrap(), Some(second));
    }
}
