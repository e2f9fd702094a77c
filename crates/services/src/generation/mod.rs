mod bank;
mod config;
mod llm;
mod prompt;
mod source;
mod sse;
mod stream;

pub use bank::BankQuestionSource;
pub use config::GenerationConfig;
pub use llm::LlmQuestionSource;
pub use prompt::build_prompt;
pub use source::{GenerationRequest, MAX_QUESTIONS, QuestionSource};
pub use sse::SseDecoder;
pub use stream::{QuestionStream, StreamEvent};
