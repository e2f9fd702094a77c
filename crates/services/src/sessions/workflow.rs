use std::sync::Arc;
use std::time::Duration;

use quiz_core::Clock;
use quiz_core::model::{QuestionSet, QuizStats, QuizSummary};
use storage::repository::{SeenQuestionRepository, StatsRepository};

use super::service::{DEFAULT_ADVANCE_DELAY, QuizSessionService};
use crate::error::QuizError;
use crate::generation::{GenerationRequest, QuestionSource};
use crate::seen_service::SeenQuestionService;
use crate::stats_service::StatsService;

/// How many recent seen questions are sent as exclusions.
pub const EXCLUSION_WINDOW: usize = 50;

/// Outcome of finalizing a completed quiz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuizCompletion {
    pub summary: QuizSummary,
    pub stats: QuizStats,
}

/// Orchestrates question generation, session start, and persisted completion.
#[derive(Clone)]
pub struct QuizLoopService {
    source: Arc<dyn QuestionSource>,
    stats: StatsService,
    seen: SeenQuestionService,
    advance_delay: Duration,
    strict_count: bool,
}

impl QuizLoopService {
    #[must_use]
    pub fn new(
        clock: Clock,
        source: Arc<dyn QuestionSource>,
        stats: Arc<dyn StatsRepository>,
        seen: Arc<dyn SeenQuestionRepository>,
    ) -> Self {
        Self {
            source,
            stats: StatsService::new(stats),
            seen: SeenQuestionService::new(clock, seen),
            advance_delay: DEFAULT_ADVANCE_DELAY,
            strict_count: false,
        }
    }

    #[must_use]
    pub fn with_advance_delay(mut self, delay: Duration) -> Self {
        self.advance_delay = delay;
        self
    }

    /// Require generated sets to match the requested count exactly.
    #[must_use]
    pub fn with_strict_count(mut self, strict: bool) -> Self {
        self.strict_count = strict;
        self
    }

    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Build a request for `count` questions that excludes recently seen ones.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` if the seen-question log cannot be read.
    pub async fn generation_request(&self, count: u32) -> Result<GenerationRequest, QuizError> {
        let exclude = self.seen.recent_texts(EXCLUSION_WINDOW).await?;
        let request = GenerationRequest::new(count).with_exclusions(exclude);
        Ok(if self.strict_count {
            request.strict()
        } else {
            request
        })
    }

    /// Ask the question source for a validated set.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Generation` when the source fails,
    /// `QuizError::Validation` when its payload is rejected, and
    /// `QuizError::Storage` when the seen log cannot be read.
    pub async fn generate(&self, count: u32) -> Result<QuestionSet, QuizError> {
        let request = self.generation_request(count).await?;
        tracing::debug!(source = self.source.name(), count = request.count(), "generating quiz");
        let set = self.source.generate(&request).await.inspect_err(|err| {
            tracing::warn!(source = self.source.name(), error = %err, "question generation failed");
        })?;
        Ok(set)
    }

    /// Start a session over an already validated set.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::EmptyQuestionSet` if `questions` is empty.
    pub fn start(&self, questions: QuestionSet) -> Result<QuizSessionService, QuizError> {
        Ok(QuizSessionService::start(questions, self.advance_delay)?)
    }

    /// Generate a set and start a session over it.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`Self::generate`] and [`Self::start`].
    pub async fn new_quiz(&self, count: u32) -> Result<QuizSessionService, QuizError> {
        let questions = self.generate(count).await?;
        self.start(questions)
    }

    /// Persist a completed session: seen questions first, then running stats.
    ///
    /// Each write happens once per run: a retry after a failed stats save
    /// skips the seen log, and a call after success returns the stored result.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::NotFinished` if the session is still running and
    /// `QuizError::Storage` on persistence failures.
    pub async fn finish(
        &self,
        session: &mut QuizSessionService,
    ) -> Result<QuizCompletion, QuizError> {
        let summary = session.summary().ok_or(QuizError::NotFinished)?;
        if let Some(stats) = session.recorded_stats() {
            return Ok(QuizCompletion { summary, stats });
        }

        if !session.seen_recorded() {
            self.seen.record(&session.questions()).await?;
            session.set_seen_recorded();
        }
        let stats = self.stats.record(&summary).await?;
        session.set_recorded(stats);
        Ok(QuizCompletion { summary, stats })
    }

    /// Running stats as currently stored.
    ///
    /// # Errors
    ///
    /// Returns `QuizError::Storage` on storage failures.
    pub async fn stats(&self) -> Result<QuizStats, QuizError> {
        Ok(self.stats.load().await?)
    }
}
