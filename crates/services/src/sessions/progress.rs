use quiz_core::model::{Question, SessionId};

/// Point-in-time view of a running quiz, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub session: SessionId,
    pub index: usize,
    pub total: usize,
    pub score: u32,
    pub answered_current: bool,
    pub is_complete: bool,
    /// The question on screen; `None` once the quiz is complete.
    pub question: Option<Question>,
}

impl SessionSnapshot {
    /// One-based position for display, e.g. "3 / 10".
    #[must_use]
    pub fn position(&self) -> usize {
        (self.index + 1).min(self.total)
    }

    /// Questions answered so far.
    #[must_use]
    pub fn answered(&self) -> usize {
        if self.is_complete {
            self.total
        } else {
            self.index + usize::from(self.answered_current)
        }
    }
}
