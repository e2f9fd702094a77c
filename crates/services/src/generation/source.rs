use async_trait::async_trait;
use quiz_core::model::{QuestionSet, ValidationPolicy};

use crate::error::QuestionSourceError;

/// Upper bound on questions per request.
pub const MAX_QUESTIONS: u32 = 10;

/// What to ask a question source for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    count: u32,
    exclude: Vec<String>,
    policy: ValidationPolicy,
}

impl GenerationRequest {
    /// Request `count` questions, clamped to `1..=MAX_QUESTIONS`. Any non-empty result is accepted.
    #[must_use]
    pub fn new(count: u32) -> Self {
        let clamped = count.clamp(1, MAX_QUESTIONS);
        if clamped != count {
            tracing::warn!(requested = count, used = clamped, "question count clamped");
        }
        Self {
            count: clamped,
            exclude: Vec::new(),
            policy: ValidationPolicy::AtLeastOne,
        }
    }

    /// Require exactly `count` questions in the result.
    #[must_use]
    pub fn strict(mut self) -> Self {
        self.policy = ValidationPolicy::Exact(self.count as usize);
        self
    }

    /// Question texts the source should avoid repeating.
    #[must_use]
    pub fn with_exclusions(mut self, exclude: Vec<String>) -> Self {
        self.exclude = exclude;
        self
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn exclude(&self) -> &[String] {
        &self.exclude
    }

    #[must_use]
    pub fn policy(&self) -> ValidationPolicy {
        self.policy
    }
}

/// Anything that can produce a validated question set.
#[async_trait]
pub trait QuestionSource: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &'static str;

    /// Produce questions for `request`.
    ///
    /// # Errors
    ///
    /// Returns `QuestionSourceError::Generation` when no payload could be
    /// obtained and `QuestionSourceError::Schema` when the payload was rejected.
    async fn generate(&self, request: &GenerationRequest)
    -> Result<QuestionSet, QuestionSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_is_clamped() {
        assert_eq!(GenerationRequest::new(0).count(), 1);
        assert_eq!(GenerationRequest::new(3).count(), 3);
        assert_eq!(GenerationRequest::new(50).count(), MAX_QUESTIONS);
    }

    #[test]
    fn strict_requires_exact_count() {
        let request = GenerationRequest::new(4);
        assert_eq!(request.policy(), ValidationPolicy::AtLeastOne);
        assert_eq!(request.strict().policy(), ValidationPolicy::Exact(4));
    }
}
