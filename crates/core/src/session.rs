//! Quiz session state machine.
//!
//! `Idle -> InProgress(index, answered) -> ... -> Complete`. A session is
//! driven by two inputs only: [`QuizSession::submit_answer`], which locks the
//! current question and yields a [`PendingAdvance`], and
//! [`QuizSession::apply_advance`], which performs the deferred move to the next
//! question (or to completion). Timing lives with the caller.

use std::fmt;

use thiserror::Error;

use crate::model::{Question, QuestionSet, QuizSummary, SessionId};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("cannot start a quiz with zero questions")]
pub struct EmptyQuestionSetError;

//
// ─── OUTCOMES ──────────────────────────────────────────────────────────────────
//

/// Result of submitting an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct { correct: usize },
    Incorrect { chosen: usize, correct: usize },
    /// The submission was not scored: the question was already answered, the
    /// quiz is complete, or the option does not exist.
    Ignored,
}

/// How an option should be rendered once the question is answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionMark {
    Correct,
    WrongChoice,
    Neutral,
}

impl AnswerOutcome {
    #[must_use]
    pub fn is_correct(&self) -> bool {
        matches!(self, Self::Correct { .. })
    }

    #[must_use]
    pub fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored)
    }

    /// Index of the right option, if this outcome was scored.
    #[must_use]
    pub fn correct_option(&self) -> Option<usize> {
        match self {
            Self::Correct { correct } | Self::Incorrect { correct, .. } => Some(*correct),
            Self::Ignored => None,
        }
    }

    /// Feedback mark for `option`; the chosen and correct options are marked together.
    #[must_use]
    pub fn mark(&self, option: usize) -> OptionMark {
        match *self {
            Self::Correct { correct } | Self::Incorrect { correct, .. } if option == correct => {
                OptionMark::Correct
            }
            Self::Incorrect { chosen, .. } if option == chosen => OptionMark::WrongChoice,
            _ => OptionMark::Neutral,
        }
    }
}

/// Token for the deferred transition scheduled by a scored answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAdvance {
    session: SessionId,
    from_index: usize,
}

impl PendingAdvance {
    #[must_use]
    pub fn session(&self) -> SessionId {
        self.session
    }

    #[must_use]
    pub fn from_index(&self) -> usize {
        self.from_index
    }
}

/// What `apply_advance` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Advanced { index: usize },
    Completed,
    /// The token belongs to another session or question; nothing changed.
    Stale,
}

/// Scored answer and the transition it scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Submission {
    pub outcome: AnswerOutcome,
    pub advance: Option<PendingAdvance>,
}

impl Submission {
    fn ignored() -> Self {
        Self {
            outcome: AnswerOutcome::Ignored,
            advance: None,
        }
    }
}

/// One recorded answer, kept for the end-of-quiz review.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord {
    pub question: usize,
    pub chosen: usize,
    pub correct: bool,
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

#[derive(Clone, PartialEq, Eq)]
pub struct QuizSession {
    id: SessionId,
    questions: QuestionSet,
    current: usize,
    score: u32,
    answered_current: bool,
    complete: bool,
    answers: Vec<AnswerRecord>,
}

impl QuizSession {
    /// Start a session at the first question with a zero score.
    ///
    /// # Errors
    ///
    /// Returns `EmptyQuestionSetError` if `questions` is empty.
    pub fn start(questions: QuestionSet) -> Result<Self, EmptyQuestionSetError> {
        if questions.is_empty() {
            return Err(EmptyQuestionSetError);
        }
        Ok(Self {
            id: SessionId::new_random(),
            answers: Vec::with_capacity(questions.len()),
            questions,
            current: 0,
            score: 0,
            answered_current: false,
            complete: false,
        })
    }

    /// Start again over the same questions under a new identity.
    #[must_use]
    pub fn retry(&self) -> Self {
        Self {
            id: SessionId::new_random(),
            questions: self.questions.clone(),
            current: 0,
            score: 0,
            answered_current: false,
            complete: false,
            answers: Vec::with_capacity(self.questions.len()),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn questions(&self) -> &QuestionSet {
        &self.questions
    }

    #[must_use]
    pub fn current_index(&self) -> usize {
        self.current
    }

    #[must_use]
    pub fn current_question(&self) -> Option<&Question> {
        if self.complete {
            None
        } else {
            self.questions.get(self.current)
        }
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn answered_current(&self) -> bool {
        self.answered_current
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.complete
    }

    #[must_use]
    pub fn answers(&self) -> &[AnswerRecord] {
        &self.answers
    }

    /// Score the current question, at most once.
    ///
    /// Locked, completed, or out-of-range submissions return `Ignored` and
    /// leave the session untouched.
    pub fn submit_answer(&mut self, option: usize) -> Submission {
        if self.complete || self.answered_current {
            return Submission::ignored();
        }
        let Some(question) = self.questions.get(self.current) else {
            return Submission::ignored();
        };
        if option >= question.options().len() {
            return Submission::ignored();
        }

        let correct = question.correct_answer();
        let is_correct = question.is_correct(option);
        self.answered_current = true;
        if is_correct {
            self.score += 1;
        }
        self.answers.push(AnswerRecord {
            question: self.current,
            chosen: option,
            correct: is_correct,
        });

        let outcome = if is_correct {
            AnswerOutcome::Correct { correct }
        } else {
            AnswerOutcome::Incorrect {
                chosen: option,
                correct,
            }
        };

        Submission {
            outcome,
            advance: Some(PendingAdvance {
                session: self.id,
                from_index: self.current,
            }),
        }
    }

    /// Run a deferred transition produced by `submit_answer`.
    pub fn apply_advance(&mut self, pending: PendingAdvance) -> Transition {
        if pending.session != self.id
            || pending.from_index != self.current
            || !self.answered_current
            || self.complete
        {
            return Transition::Stale;
        }

        if self.current + 1 < self.questions.len() {
            self.current += 1;
            self.answered_current = false;
            Transition::Advanced {
                index: self.current,
            }
        } else {
            self.complete = true;
            Transition::Completed
        }
    }

    #[must_use]
    pub fn summarize(&self) -> QuizSummary {
        let total = u32::try_from(self.questions.len()).unwrap_or(u32::MAX);
        QuizSummary::new(self.score, total)
    }
}

impl fmt::Debug for QuizSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuizSession")
            .field("id", &self.id)
            .field("questions_len", &self.questions.len())
            .field("current", &self.current)
            .field("score", &self.score)
            .field("answered_current", &self.answered_current)
            .field("complete", &self.complete)
            .finish_non_exhaustive()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
