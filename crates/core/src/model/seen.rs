use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Entry of the log of questions already shown to the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenQuestion {
    pub text: String,
    pub seen_at: DateTime<Utc>,
}

impl SeenQuestion {
    #[must_use]
    pub fn new(text: impl Into<String>, seen_at: DateTime<Utc>) -> Self {
        Self {
            text: text.into(),
            seen_at,
        }
    }
}

/// Lowercase `text` and collapse runs of whitespace.
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
