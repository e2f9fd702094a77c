use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// A single rule of the question schema that a payload can violate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaRule {
    #[error("payload is not a JSON object")]
    MalformedJson,

    #[error("`questions` is missing")]
    MissingQuestions,

    #[error("`questions` is not a sequence")]
    QuestionsNotSequence,

    #[error("question set is empty")]
    EmptyQuestionSet,

    #[error("expected {expected} questions, got {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("question is not an object")]
    QuestionNotObject,

    #[error("`text` is missing or empty")]
    EmptyText,

    #[error("`options` is missing or not a sequence")]
    MissingOptions,

    #[error("option {0} is not a string")]
    OptionNotString(usize),

    #[error("at least 2 options are required, got {0}")]
    TooFewOptions(usize),

    #[error("`correctAnswer` is missing or not an integer")]
    CorrectAnswerNotInteger,

    #[error("`correctAnswer` {index} is outside 0..{len}")]
    CorrectAnswerOutOfRange { index: i64, len: usize },

    #[error("`explanation` is not a string")]
    ExplanationNotString,
}

/// Rejection of a generated payload: the first violated rule and, when the
/// violation sits inside a question, that question's position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaValidationError {
    pub rule: SchemaRule,
    pub index: Option<usize>,
}

impl SchemaValidationError {
    #[must_use]
    pub fn root(rule: SchemaRule) -> Self {
        Self { rule, index: None }
    }

    #[must_use]
    pub fn at(index: usize, rule: SchemaRule) -> Self {
        Self {
            rule,
            index: Some(index),
        }
    }
}

impl fmt::Display for SchemaValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "invalid question {index}: {}", self.rule),
            None => write!(f, "invalid question set: {}", self.rule),
        }
    }
}

impl std::error::Error for SchemaValidationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.rule)
    }
}

//
// ─── POLICY ────────────────────────────────────────────────────────────────────
//

/// How strictly the number of returned questions is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Any non-empty set is accepted.
    #[default]
    AtLeastOne,
    /// The set must contain exactly this many questions.
    Exact(usize),
}

impl ValidationPolicy {
    /// Check a question count against this policy.
    ///
    /// # Errors
    ///
    /// Returns `EmptyQuestionSet` for zero questions under any policy, or
    /// `CountMismatch` when an exact count is required and not met.
    pub fn check_len(self, actual: usize) -> Result<(), SchemaRule> {
        match self {
            _ if actual == 0 => Err(SchemaRule::EmptyQuestionSet),
            Self::Exact(expected) if expected != actual => {
                Err(SchemaRule::CountMismatch { expected, actual })
            }
            _ => Ok(()),
        }
    }
}

//
// ─── QUESTION ──────────────────────────────────────────────────────────────────
//

/// A validated multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    text: String,
    options: Vec<String>,
    correct_answer: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    explanation: Option<String>,
}

impl Question {
    /// Build a question, enforcing the schema invariants.
    ///
    /// # Errors
    ///
    /// Returns the violated `SchemaRule` when the text is blank, fewer than two
    /// options are given, or `correct_answer` does not index into `options`.
    pub fn new(
        text: impl Into<String>,
        options: Vec<String>,
        correct_answer: usize,
        explanation: Option<String>,
    ) -> Result<Self, SchemaRule> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SchemaRule::EmptyText);
        }
        if options.len() < 2 {
            return Err(SchemaRule::TooFewOptions(options.len()));
        }
        if correct_answer >= options.len() {
            return Err(SchemaRule::CorrectAnswerOutOfRange {
                index: i64::try_from(correct_answer).unwrap_or(i64::MAX),
                len: options.len(),
            });
        }

        Ok(Self {
            text,
            options,
            correct_answer,
            explanation,
        })
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn options(&self) -> &[String] {
        &self.options
    }

    #[must_use]
    pub fn correct_answer(&self) -> usize {
        self.correct_answer
    }

    #[must_use]
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    #[must_use]
    pub fn is_correct(&self, option: usize) -> bool {
        option == self.correct_answer
    }

    #[must_use]
    pub fn correct_option(&self) -> &str {
        &self.options[self.correct_answer]
    }
}

//
// ─── QUESTION SET ──────────────────────────────────────────────────────────────
//

/// Ordered, read-only sequence of questions backing one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSet {
    questions: Vec<Question>,
}

impl QuestionSet {
    /// Wrap already-validated questions. Emptiness is checked when a session starts.
    #[must_use]
    pub fn from_questions(questions: Vec<Question>) -> Self {
        Self { questions }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Question> {
        self.questions.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Question> {
        self.questions.iter()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Question] {
        &self.questions
    }
}

impl<'a> IntoIterator for &'a QuestionSet {
    type Item = &'a Question;
    type IntoIter = std::slice::Iter<'a, Question>;

    fn into_iter(self) -> Self::IntoIter {
        self.questions.iter()
    }
}

//
// ─── VALIDATION ────────────────────────────────────────────────────────────────
//

/// Check a decoded payload of shape `{ "questions": [...] }`.
///
/// # Errors
///
/// Returns `SchemaValidationError` with the first violated rule.
pub fn validate_payload(
    payload: &Value,
    policy: ValidationPolicy,
) -> Result<QuestionSet, SchemaValidationError> {
    let root = payload
        .as_object()
        .ok_or(SchemaValidationError::root(SchemaRule::MalformedJson))?;
    let items = match root.get("questions") {
        None | Some(Value::Null) => {
            return Err(SchemaValidationError::root(SchemaRule::MissingQuestions));
        }
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(SchemaValidationError::root(
                SchemaRule::QuestionsNotSequence,
            ));
        }
    };

    policy
        .check_len(items.len())
        .map_err(SchemaValidationError::root)?;

    let questions = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            validate_question(item).map_err(|rule| SchemaValidationError::at(index, rule))
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(QuestionSet::from_questions(questions))
}

/// Decode raw model output and validate it.
///
/// Surrounding prose and markdown fences are ignored; the outermost JSON
/// object is what gets checked.
///
/// # Errors
///
/// Returns `SchemaRule::MalformedJson` when no JSON object can be decoded,
/// otherwise the first rule violated by the decoded payload.
pub fn validate_text(
    text: &str,
    policy: ValidationPolicy,
) -> Result<QuestionSet, SchemaValidationError> {
    let malformed = || SchemaValidationError::root(SchemaRule::MalformedJson);
    let json = extract_json_object(text).ok_or_else(malformed)?;
    let payload: Value = serde_json::from_str(json).map_err(|_| malformed())?;
    validate_payload(&payload, policy)
}

/// Slice out the first complete JSON object in `text`.
///
/// Decoding stops where that object closes, so trailing prose is ignored even
/// when it contains braces of its own.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    text.match_indices('{').find_map(|(start, _)| {
        let rest = &text[start..];
        let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
        match values.next() {
            Some(Ok(Value::Object(_))) => Some(&rest[..values.byte_offset()]),
            _ => None,
        }
    })
}

fn validate_question(item: &Value) -> Result<Question, SchemaRule> {
    let fields = item.as_object().ok_or(SchemaRule::QuestionNotObject)?;

    let text = fields
        .get("text")
        .and_then(Value::as_str)
        .filter(|text| !text.trim().is_empty())
        .ok_or(SchemaRule::EmptyText)?;

    let raw_options = fields
        .get("options")
        .and_then(Value::as_array)
        .ok_or(SchemaRule::MissingOptions)?;
    let options = raw_options
        .iter()
        .enumerate()
        .map(|(pos, option)| {
            option
                .as_str()
                .map(str::to_owned)
                .ok_or(SchemaRule::OptionNotString(pos))
        })
        .collect::<Result<Vec<_>, _>>()?;
    if options.len() < 2 {
        return Err(SchemaRule::TooFewOptions(options.len()));
    }

    let correct = correct_answer(fields)?;
    let correct = usize::try_from(correct)
        .ok()
        .filter(|idx| *idx < options.len())
        .ok_or(SchemaRule::CorrectAnswerOutOfRange {
            index: correct,
            len: options.len(),
        })?;

    let explanation = match fields.get("explanation") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(_) => return Err(SchemaRule::ExplanationNotString),
    };

    Question::new(text, options, correct, explanation)
}

fn correct_answer(fields: &Map<String, Value>) -> Result<i64, SchemaRule> {
    let number = fields
        .get("correctAnswer")
        .and_then(Value::as_number)
        .ok_or(SchemaRule::CorrectAnswerNotInteger)?;
    if let Some(value) = number.as_i64() {
        return Ok(value);
    }
    // Models sometimes emit `2.0`; whole floats are accepted, fractions are not.
    #[allow(clippy::cast_possible_truncation)]
    let whole = number
        .as_f64()
        .filter(|value| value.is_finite() && value.fract() == 0.0)
        .map(|value| value as i64);
    whole.ok_or(SchemaRule::CorrectAnswerNotInteger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn question(correct: i64) -> Value {
        json!({
            "text": "What does RPAS stand for?",
            "options": [
                "Remotely Piloted Aircraft System",
                "Rapid Propulsion Aerial Ship",
                "Radio Powered Autonomous Sensor",
                "Regulated Private Air Space"
            ],
            "correctAnswer": correct
        })
    }

    #[test]
    fn accepts_well_formed_payload() {
        let payload = json!({ "questions": [question(0), question(3)] });
        let set = validate_payload(&payload, ValidationPolicy::AtLeastOne).unwrap();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get(1).unwrap().correct_answer(), 3);
        assert_eq!(set.get(0).unwrap().explanation(), None);
    }

    #[test]
    fn rejects_correct_answer_equal_to_option_count() {
        let payload = json!({ "questions": [question(0), question(4)] });
        let err = validate_payload(&payload, ValidationPolicy::AtLeastOne).unwrap_err();

        assert_eq!(err.index, Some(1));
        assert_eq!(
            err.rule,
            SchemaRule::CorrectAnswerOutOfRange { index: 4, len: 4 }
        );
    }

    #[test]
    fn rejects_negative_correct_answer() {
        let payload = json!({ "questions": [question(-1)] });
        let err = validate_payload(&payload, ValidationPolicy::AtLeastOne).unwrap_err();
        assert!(matches!(
            err.rule,
            SchemaRule::CorrectAnswerOutOfRange { index: -1, .. }
        ));
    }

    #[test]
    fn missing_and_non_sequence_questions_are_distinct() {
        let missing = validate_payload(&json!({}), ValidationPolicy::AtLeastOne).unwrap_err();
        assert_eq!(missing, SchemaValidationError::root(SchemaRule::MissingQuestions));

        let scalar =
            validate_payload(&json!({ "questions": 3 }), ValidationPolicy::AtLeastOne).unwrap_err();
        assert_eq!(
            scalar,
            SchemaValidationError::root(SchemaRule::QuestionsNotSequence)
        );
    }

    #[test]
    fn empty_set_is_rejected_under_both_policies() {
        let payload = json!({ "questions": [] });
        for policy in [ValidationPolicy::AtLeastOne, ValidationPolicy::Exact(0)] {
            let err = validate_payload(&payload, policy).unwrap_err();
            assert_eq!(err.rule, SchemaRule::EmptyQuestionSet);
        }
    }

    #[test]
    fn exact_policy_checks_count_before_contents() {
        let payload = json!({ "questions": [question(9), question(0)] });
        let err = validate_payload(&payload, ValidationPolicy::Exact(3)).unwrap_err();
        assert_eq!(
            err.rule,
            SchemaRule::CountMismatch {
                expected: 3,
                actual: 2
            }
        );
        assert_eq!(err.index, None);
    }

    #[test]
    fn first_violation_wins() {
        let payload = json!({
            "questions": [
                question(1),
                { "text": "  ", "options": ["a"], "correctAnswer": 7 },
                { "options": ["a", "b"], "correctAnswer": 0 }
            ]
        });
        let err = validate_payload(&payload, ValidationPolicy::AtLeastOne).unwrap_err();
        assert_eq!(err, SchemaValidationError::at(1, SchemaRule::EmptyText));
    }

    #[test]
    fn option_shape_is_checked() {
        let too_few = json!({ "questions": [{ "text": "Q", "options": ["only"], "correctAnswer": 0 }] });
        assert_eq!(
            validate_payload(&too_few, ValidationPolicy::AtLeastOne)
                .unwrap_err()
                .rule,
            SchemaRule::TooFewOptions(1)
        );

        let not_strings = json!({ "questions": [{ "text": "Q", "options": ["a", 2], "correctAnswer": 0 }] });
        assert_eq!(
            validate_payload(&not_strings, ValidationPolicy::AtLeastOne)
                .unwrap_err()
                .rule,
            SchemaRule::OptionNotString(1)
        );
    }

    #[test]
    fn whole_float_index_is_accepted_fraction_is_not() {
        let whole = json!({ "questions": [{ "text": "Q", "options": ["a", "b"], "correctAnswer": 1.0 }] });
        let set = validate_payload(&whole, ValidationPolicy::AtLeastOne).unwrap();
        assert_eq!(set.get(0).unwrap().correct_answer(), 1);

        let fraction = json!({ "questions": [{ "text": "Q", "options": ["a", "b"], "correctAnswer": 0.5 }] });
        assert_eq!(
            validate_payload(&fraction, ValidationPolicy::AtLeastOne)
                .unwrap_err()
                .rule,
            SchemaRule::CorrectAnswerNotInteger
        );
    }

    #[test]
    fn explanation_is_optional_but_typed() {
        let with_null = json!({ "questions": [{ "text": "Q", "options": ["a", "b"], "correctAnswer": 0, "explanation": null }] });
        assert!(validate_payload(&with_null, ValidationPolicy::AtLeastOne).is_ok());

        let with_number = json!({ "questions": [{ "text": "Q", "options": ["a", "b"], "correctAnswer": 0, "explanation": 5 }] });
        assert_eq!(
            validate_payload(&with_number, ValidationPolicy::AtLeastOne)
                .unwrap_err()
                .rule,
            SchemaRule::ExplanationNotString
        );
    }

    #[test]
    fn text_wrapped_in_fences_is_decoded() {
        let raw = "Here you go:\n```json\n{\"questions\":[{\"text\":\"Q\",\"options\":[\"a\",\"b\"],\"correctAnswer\":1,\"explanation\":\"because\"}]}\n```";
        let set = validate_text(raw, ValidationPolicy::Exact(1)).unwrap();
        assert_eq!(set.get(0).unwrap().explanation(), Some("because"));
    }

    #[test]
    fn braces_around_the_payload_are_ignored() {
        let raw = "Sure {as requested}:\n{\"questions\":[{\"text\":\"Q\",\"options\":[\"a\",\"b\"],\"correctAnswer\":0}]}\nNote: indices are {0-3}.";
        let set = validate_text(raw, ValidationPolicy::AtLeastOne).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(
            extract_json_object("x {\"a\":{\"b\":\"}\"}} y {z}"),
            Some("{\"a\":{\"b\":\"}\"}}")
        );
    }

    #[test]
    fn garbage_text_is_malformed() {
        let err = validate_text("sorry, I cannot help", ValidationPolicy::AtLeastOne).unwrap_err();
        assert_eq!(err.rule, SchemaRule::MalformedJson);

        let err = validate_text("{\"questions\": [", ValidationPolicy::AtLeastOne).unwrap_err();
        assert_eq!(err.rule, SchemaRule::MalformedJson);
    }

    #[test]
    fn question_constructor_enforces_invariants() {
        let options = vec!["a".to_string(), "b".to_string()];
        assert!(Question::new("Q", options.clone(), 1, None).is_ok());
        assert_eq!(
            Question::new("Q", options.clone(), 2, None).unwrap_err(),
            SchemaRule::CorrectAnswerOutOfRange { index: 2, len: 2 }
        );
        assert_eq!(
            Question::new(" ", options, 0, None).unwrap_err(),
            SchemaRule::EmptyText
        );
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let q = Question::new("Q", vec!["a".into(), "b".into()], 1, None).unwrap();
        let set = QuestionSet::from_questions(vec![q]);
        let value = serde_json::to_value(&set).unwrap();
        assert_eq!(
            value,
            json!({ "questions": [{ "text": "Q", "options": ["a", "b"], "correctAnswer": 1 }] })
        );
        // Output of the serializer is valid input for the validator.
        assert_eq!(
            validate_payload(&value, ValidationPolicy::Exact(1)).unwrap(),
            set
        );
    }

    #[test]
    fn display_names_the_question() {
        let err = SchemaValidationError::at(2, SchemaRule::EmptyText);
        assert_eq!(
            err.to_string(),
            "invalid question 2: `text` is missing or empty"
        );
    }
}
