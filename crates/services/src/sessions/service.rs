use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use quiz_core::model::{QuestionSet, QuizStats, QuizSummary};
use quiz_core::session::{
    AnswerOutcome, AnswerRecord, EmptyQuestionSetError, PendingAdvance, QuizSession, Transition,
};
use tokio::task::JoinHandle;

use super::progress::SessionSnapshot;

/// Pause between a scored answer and the move to the next question.
pub const DEFAULT_ADVANCE_DELAY: Duration = Duration::from_millis(1500);

//
// ─── SESSION DRIVER ────────────────────────────────────────────────────────────
//

/// Owns one quiz session and its deferred auto-advance.
///
/// A scored answer spawns a task that sleeps for the advance delay and then
/// applies the transition. Restarting, retrying, or dropping the driver aborts
/// that task; a task that still fires late is rejected by the session as stale.
///
/// Must be used inside a tokio runtime.
pub struct QuizSessionService {
    session: Arc<Mutex<QuizSession>>,
    delay: Duration,
    pending: Option<JoinHandle<Transition>>,
    seen_recorded: bool,
    recorded: Option<QuizStats>,
}

impl QuizSessionService {
    #[must_use]
    pub fn new(session: QuizSession, delay: Duration) -> Self {
        Self {
            session: Arc::new(Mutex::new(session)),
            delay,
            pending: None,
            seen_recorded: false,
            recorded: None,
        }
    }

    /// Start a session over `questions`.
    ///
    /// # Errors
    ///
    /// Returns `EmptyQuestionSetError` if `questions` is empty.
    pub fn start(questions: QuestionSet, delay: Duration) -> Result<Self, EmptyQuestionSetError> {
        Ok(Self::new(QuizSession::start(questions)?, delay))
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the session with a fresh one over new questions.
    ///
    /// # Errors
    ///
    /// Returns `EmptyQuestionSetError` if `questions` is empty; the current
    /// session is left as it was.
    pub fn restart(&mut self, questions: QuestionSet) -> Result<(), EmptyQuestionSetError> {
        let fresh = QuizSession::start(questions)?;
        self.cancel_pending();
        *self.session.lock() = fresh;
        self.seen_recorded = false;
        self.recorded = None;
        Ok(())
    }

    /// Run the same questions again from the start.
    pub fn retry(&mut self) {
        self.cancel_pending();
        let mut session = self.session.lock();
        *session = session.retry();
        self.seen_recorded = false;
        self.recorded = None;
    }

    /// Answer the current question.
    ///
    /// A scored answer schedules the auto-advance; an ignored one changes nothing.
    pub fn submit_answer(&mut self, option: usize) -> AnswerOutcome {
        let submission = self.session.lock().submit_answer(option);
        if let Some(pending) = submission.advance {
            self.schedule(pending);
        } else {
            tracing::debug!(option, "answer ignored");
        }
        submission.outcome
    }

    fn schedule(&mut self, pending: PendingAdvance) {
        self.cancel_pending();
        let session = Arc::clone(&self.session);
        let delay = self.delay;
        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let transition = session.lock().apply_advance(pending);
            if transition == Transition::Stale {
                tracing::debug!(
                    session = %pending.session(),
                    from_index = pending.from_index(),
                    "stale auto-advance rejected"
                );
            }
            transition
        }));
    }

    /// Abort the scheduled auto-advance, if any. Returns whether one was pending.
    pub fn cancel_pending(&mut self) -> bool {
        match self.pending.take() {
            Some(handle) => {
                let was_pending = !handle.is_finished();
                handle.abort();
                was_pending
            }
            None => false,
        }
    }

    #[must_use]
    pub fn has_pending_advance(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the scheduled auto-advance to run.
    ///
    /// Returns `None` when nothing was scheduled or the task was aborted.
    pub async fn wait_for_advance(&mut self) -> Option<Transition> {
        let handle = self.pending.take()?;
        handle.await.ok()
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.session.lock();
        SessionSnapshot {
            session: session.id(),
            index: session.current_index(),
            total: session.total(),
            score: session.score(),
            answered_current: session.answered_current(),
            is_complete: session.is_finished(),
            question: session.current_question().cloned(),
        }
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.session.lock().is_finished()
    }

    /// Final score; `None` until the last auto-advance has completed the quiz.
    #[must_use]
    pub fn summary(&self) -> Option<QuizSummary> {
        let session = self.session.lock();
        session.is_finished().then(|| session.summarize())
    }

    #[must_use]
    pub fn questions(&self) -> QuestionSet {
        self.session.lock().questions().clone()
    }

    #[must_use]
    pub fn answers(&self) -> Vec<AnswerRecord> {
        self.session.lock().answers().to_vec()
    }

    /// Copy of the underlying session state.
    #[must_use]
    pub fn session(&self) -> QuizSession {
        self.session.lock().clone()
    }

    /// Stats stored when this session was finalized.
    #[must_use]
    pub fn recorded_stats(&self) -> Option<QuizStats> {
        self.recorded
    }

    pub(crate) fn set_recorded(&mut self, stats: QuizStats) {
        self.recorded = Some(stats);
    }

    /// Whether this run's questions are already in the seen log.
    pub(crate) fn seen_recorded(&self) -> bool {
        self.seen_recorded
    }

    pub(crate) fn set_seen_recorded(&mut self) {
        self.seen_recorded = true;
    }
}

impl Drop for QuizSessionService {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}

impl fmt::Debug for QuizSessionService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSessionService")
            .field("session", &*self.session.lock())
            .field("delay", &self.delay)
            .field("pending", &self.has_pending_advance())
            .field("seen_recorded", &self.seen_recorded)
            .field("recorded", &self.recorded)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
