#![forbid(unsafe_code)]

pub mod error;
pub mod generation;
pub mod seen_service;
pub mod sessions;
pub mod stats_service;

pub use quiz_core::Clock;

pub use error::{GenerationConfigError, GenerationError, QuestionSourceError, QuizError};
pub use generation::{
    BankQuestionSource, GenerationConfig, GenerationRequest, LlmQuestionSource, QuestionSource,
    QuestionStream, StreamEvent,
};
pub use seen_service::SeenQuestionService;
pub use sessions::{QuizCompletion, QuizLoopService, QuizSessionService, SessionSnapshot};
pub use stats_service::StatsService;
