mod ids;
mod question;
mod seen;
mod stats;

pub use ids::SessionId;
pub use question::{
    Question, QuestionSet, SchemaRule, SchemaValidationError, ValidationPolicy, extract_json_object,
    validate_payload, validate_text,
};
pub use seen::{SeenQuestion, normalize_text};
pub use stats::{QuizStats, QuizSummary, round_ratio};
