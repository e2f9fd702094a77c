//! Progressive reading of a question payload that is still being generated.
//!
//! While text is streaming in, the document is usually cut mid-way: strings
//! are unterminated, containers unclosed, keys waiting for their value.
//! [`parse_partial`] closes what it can and drops what it cannot, and
//! [`PartialQuestionSet`] exposes whatever fields are present. Nothing here
//! raises validation errors; only [`PartialAccumulator::finish`] applies the
//! full rules to the terminal text.

use serde_json::Value;

use crate::model::{QuestionSet, SchemaValidationError, ValidationPolicy, validate_text};

/// Best-effort decode of a JSON object prefix.
///
/// Returns `None` until an opening `{` has been seen.
#[must_use]
pub fn parse_partial(input: &str) -> Option<Value> {
    let start = input.find('{')?;
    let body = &input[start..];

    let mut closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    // Last prefix length that is valid JSON once `safe_closers` are appended.
    let mut safe_len = 0;
    let mut safe_closers = String::new();

    for (pos, ch) in body.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' | '[' => {
                closers.push(if ch == '{' { '}' } else { ']' });
                safe_len = pos + 1;
                safe_closers = closing(&closers);
            }
            '}' | ']' => {
                closers.pop();
                safe_len = pos + 1;
                safe_closers = closing(&closers);
            }
            ',' => {
                safe_len = pos;
                safe_closers = closing(&closers);
            }
            _ => {}
        }
        if closers.is_empty() && safe_len > 0 {
            // Top-level object closed; ignore any trailing text.
            return serde_json::from_str(&body[..=pos]).ok();
        }
    }

    let mut completed = body.to_owned();
    if in_string {
        if escaped {
            completed.pop();
        }
        completed.push('"');
    }
    completed.push_str(&closing(&closers));
    if let Ok(value) = serde_json::from_str(&completed) {
        return Some(value);
    }

    let mut fallback = body[..safe_len].to_owned();
    fallback.push_str(&safe_closers);
    serde_json::from_str(&fallback).ok()
}

fn closing(stack: &[char]) -> String {
    stack.iter().rev().collect()
}

//
// ─── PARTIAL VIEW ──────────────────────────────────────────────────────────────
//

/// A question as far as it has been generated. Absent or not-yet-typed fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialQuestion {
    pub text: Option<String>,
    pub options: Vec<String>,
    pub correct_answer: Option<usize>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PartialQuestionSet {
    pub questions: Vec<PartialQuestion>,
}

impl PartialQuestionSet {
    /// Read whatever matches the question shape out of a partial document.
    #[must_use]
    pub fn from_value(value: &Value) -> Self {
        let questions = value
            .get("questions")
            .and_then(Value::as_array)
            .map(|items| items.iter().map(PartialQuestion::from_value).collect())
            .unwrap_or_default();
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
}

impl PartialQuestion {
    fn from_value(value: &Value) -> Self {
        let text = value
            .get("text")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let options = value
            .get("options")
            .and_then(Value::as_array)
            .map(|opts| {
                opts.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_owned)
                    .collect()
            })
            .unwrap_or_default();
        let correct_answer = value
            .get("correctAnswer")
            .and_then(Value::as_u64)
            .and_then(|idx| usize::try_from(idx).ok());
        let explanation = value
            .get("explanation")
            .and_then(Value::as_str)
            .map(str::to_owned);
        Self {
            text,
            options,
            correct_answer,
            explanation,
        }
    }
}

//
// ─── ACCUMULATOR ───────────────────────────────────────────────────────────────
//

/// Collects streamed text and reports the partial view as it grows.
#[derive(Debug, Default)]
pub struct PartialAccumulator {
    buffer: String,
    last: Option<PartialQuestionSet>,
}

impl PartialAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk. Returns the partial view when it differs from the last one reported.
    pub fn push(&mut self, chunk: &str) -> Option<PartialQuestionSet> {
        if chunk.is_empty() {
            return None;
        }
        self.buffer.push_str(chunk);
        let view = PartialQuestionSet::from_value(&parse_partial(&self.buffer)?);
        if self.last.as_ref() == Some(&view) {
            return None;
        }
        self.last = Some(view.clone());
        Some(view)
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn latest(&self) -> Option<&PartialQuestionSet> {
        self.last.as_ref()
    }

    /// Validate the terminal text with the full rule set.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError` when the completed payload is malformed
    /// or violates a rule.
    pub fn finish(self, policy: ValidationPolicy) -> Result<QuestionSet, SchemaValidationError> {
        validate_text(&self.buffer, policy)
    }
}
