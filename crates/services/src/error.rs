//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::model::SchemaValidationError;
use quiz_core::session::EmptyQuestionSetError;
use storage::repository::StorageError;

/// Invalid generation settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationConfigError {
    #[error("invalid generation base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("invalid generation temperature: {0}")]
    InvalidTemperature(String),
}

/// The question source could not produce an answer at all.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GenerationError {
    #[error("question generation is not configured")]
    Disabled,
    #[error("generation request failed with status {0}")]
    HttpStatus(reqwest::StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("generation returned an empty response")]
    EmptyResponse,
    #[error("generation provider reported an error: {0}")]
    Provider(String),
    #[error("generation stream sent an unreadable event: {0}")]
    InvalidEvent(String),
}

/// Failure of a `QuestionSource`: either no payload, or a payload that broke the schema.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuestionSourceError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Schema(#[from] SchemaValidationError),
}

/// Errors emitted by the quiz workflow.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizError {
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Validation(#[from] SchemaValidationError),
    #[error(transparent)]
    EmptyQuestionSet(#[from] EmptyQuestionSetError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("quiz is not finished yet")]
    NotFinished,
}

impl From<QuestionSourceError> for QuizError {
    fn from(err: QuestionSourceError) -> Self {
        match err {
            QuestionSourceError::Generation(err) => Self::Generation(err),
            QuestionSourceError::Schema(err) => Self::Validation(err),
        }
    }
}
