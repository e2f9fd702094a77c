use std::collections::HashSet;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use quiz_core::model::{
    Question, QuestionSet, SchemaValidationError, ValidationPolicy, normalize_text, validate_text,
};

use super::source::{GenerationRequest, QuestionSource};
use crate::error::QuestionSourceError;

const BUILTIN_BANK: &str = include_str!("../../assets/question_bank.json");

/// Offline source that samples from a fixed set of questions.
///
/// Questions named in the request's exclusion list are served only when the
/// rest of the bank cannot fill the request.
#[derive(Debug)]
pub struct BankQuestionSource {
    questions: Vec<Question>,
    rng: Mutex<StdRng>,
}

impl BankQuestionSource {
    /// The bundled drone-regulation bank.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError` if the bundled bank does not pass validation.
    pub fn builtin() -> Result<Self, SchemaValidationError> {
        Self::from_json(BUILTIN_BANK)
    }

    /// A bank read from a `{"questions": [...]}` document.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError` if the document is not a valid question set.
    pub fn from_json(text: &str) -> Result<Self, SchemaValidationError> {
        let set = validate_text(text, ValidationPolicy::AtLeastOne)?;
        Ok(Self::from_questions(set))
    }

    #[must_use]
    pub fn from_questions(set: QuestionSet) -> Self {
        Self {
            questions: set.as_slice().to_vec(),
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Use a deterministic shuffle.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            ..self
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    fn sample(&self, request: &GenerationRequest) -> Vec<Question> {
        let excluded: HashSet<String> = request
            .exclude()
            .iter()
            .map(String::as_str)
            .map(normalize_text)
            .collect();
        let (mut fresh, mut seen): (Vec<&Question>, Vec<&Question>) = self
            .questions
            .iter()
            .partition(|q| !excluded.contains(&normalize_text(q.text())));

        let wanted = request.count() as usize;
        let mut rng = self.rng.lock();
        fresh.shuffle(&mut *rng);
        let mut picked: Vec<Question> = fresh.into_iter().take(wanted).cloned().collect();
        if picked.len() < wanted {
            seen.shuffle(&mut *rng);
            let missing = wanted - picked.len();
            picked.extend(seen.into_iter().take(missing).cloned());
        }
        picked.shuffle(&mut *rng);
        picked
    }
}

#[async_trait]
impl QuestionSource for BankQuestionSource {
    fn name(&self) -> &'static str {
        "bank"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<QuestionSet, QuestionSourceError> {
        let picked = self.sample(request);
        request
            .policy()
            .check_len(picked.len())
            .map_err(SchemaValidationError::root)?;
        tracing::debug!(
            questions = picked.len(),
            excluded = request.exclude().len(),
            "sampled questions from bank"
        );
        Ok(QuestionSet::from_questions(picked))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::SchemaRule;

    fn bank() -> BankQuestionSource {
        BankQuestionSource::builtin().unwrap().with_seed(7)
    }

    fn texts(set: &QuestionSet) -> Vec<String> {
        set.iter().map(|q| q.text().to_string()).collect()
    }

    #[test]
    fn builtin_bank_is_valid() {
        let bank = BankQuestionSource::builtin().unwrap();
        assert!(bank.len() >= 20);
        let unique: HashSet<String> = bank
            .questions
            .iter()
            .map(|q| normalize_text(q.text()))
            .collect();
        assert_eq!(unique.len(), bank.len());
    }

    #[tokio::test]
    async fn returns_requested_count_without_duplicates() {
        let set = bank().generate(&GenerationRequest::new(10).strict()).await.unwrap();
        assert_eq!(set.len(), 10);
        let unique: HashSet<String> = texts(&set).into_iter().collect();
        assert_eq!(unique.len(), 10);
    }

    #[tokio::test]
    async fn same_seed_gives_same_sample() {
        let request = GenerationRequest::new(5);
        let a = bank().generate(&request).await.unwrap();
        let b = bank().generate(&request).await.unwrap();
        assert_eq!(texts(&a), texts(&b));
    }

    #[tokio::test]
    async fn prefers_questions_not_seen_before() {
        let source = bank();
        let all: Vec<String> = source.questions.iter().map(|q| q.text().to_string()).collect();
        let (keep, exclude) = all.split_at(3);
        // Exclusions match case- and whitespace-insensitively.
        let exclude = exclude.iter().map(|t| format!("  {}", t.to_uppercase())).collect();

        let set = source
            .generate(&GenerationRequest::new(3).with_exclusions(exclude))
            .await
            .unwrap();
        let mut got = texts(&set);
        got.sort();
        let mut expected = keep.to_vec();
        expected.sort();
        assert_eq!(got, expected);
    }

    #[tokio::test]
    async fn falls_back_to_seen_questions_when_short() {
        let source = bank();
        let all: Vec<String> = source.questions.iter().map(|q| q.text().to_string()).collect();
        let set = source
            .generate(&GenerationRequest::new(5).with_exclusions(all))
            .await
            .unwrap();
        assert_eq!(set.len(), 5);
    }

    #[tokio::test]
    async fn strict_request_larger_than_bank_is_rejected() {
        let small = BankQuestionSource::from_json(
            r#"{"questions":[{"text":"A?","options":["x","y"],"correctAnswer":0},{"text":"B?","options":["x","y"],"correctAnswer":1}]}"#,
        )
        .unwrap();

        let lenient = small.generate(&GenerationRequest::new(3)).await.unwrap();
        assert_eq!(lenient.len(), 2);

        let err = small
            .generate(&GenerationRequest::new(3).strict())
            .await
            .unwrap_err();
        match err {
            QuestionSourceError::Schema(err) => assert_eq!(
                err.rule,
                SchemaRule::CountMismatch {
                    expected: 3,
                    actual: 2
                }
            ),
            other => panic!("unexpected error {other:?}"),
        }
    }
}
