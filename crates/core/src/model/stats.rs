use serde::{Deserialize, Serialize};

/// Final score of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizSummary {
    pub score: u32,
    pub total: u32,
    pub percentage: u8,
}

impl QuizSummary {
    /// `percentage` is `round(100 * score / total)`, half rounding up.
    #[must_use]
    pub fn new(score: u32, total: u32) -> Self {
        let score = score.min(total);
        let percentage = if total == 0 {
            0
        } else {
            round_ratio(100 * u64::from(score), u64::from(total))
        };
        Self {
            score,
            total,
            percentage: clamp_percentage(percentage),
        }
    }

    #[must_use]
    pub fn is_perfect(&self) -> bool {
        self.total > 0 && self.score == self.total
    }
}

/// Cross-session running statistics.
///
/// Serialized as `{ "quizzesTaken": n, "averageScore": p }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuizStats {
    pub quizzes_taken: u32,
    pub average_score: u8,
}

impl QuizStats {
    /// Fold one completed session into the running average.
    ///
    /// The average is rounded on every update rather than re-derived from the
    /// full history, so rounding error accumulates over many sessions.
    #[must_use]
    pub fn record(self, summary: &QuizSummary) -> Self {
        let taken = self.quizzes_taken.saturating_add(1);
        let weighted = u64::from(self.average_score) * u64::from(self.quizzes_taken)
            + u64::from(summary.percentage);
        Self {
            quizzes_taken: taken,
            average_score: clamp_percentage(round_ratio(weighted, u64::from(taken))),
        }
    }
}

/// Integer `round(numerator / denominator)` with halves rounding up.
///
/// `denominator` must be non-zero.
#[must_use]
pub fn round_ratio(numerator: u64, denominator: u64) -> u64 {
    (2 * numerator + denominator) / (2 * denominator)
}

fn clamp_percentage(value: u64) -> u8 {
    u8::try_from(value.min(100)).unwrap_or(100)
}
