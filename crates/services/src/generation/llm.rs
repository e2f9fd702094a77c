use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use quiz_core::model::{QuestionSet, validate_text};

use super::config::GenerationConfig;
use super::prompt::{SYSTEM_PROMPT, build_prompt};
use super::source::{GenerationRequest, QuestionSource};
use super::stream::QuestionStream;
use crate::error::{GenerationConfigError, GenerationError, QuestionSourceError};

/// Question source backed by an OpenAI-compatible chat-completions endpoint.
#[derive(Clone)]
pub struct LlmQuestionSource {
    client: Client,
    config: Option<GenerationConfig>,
}

impl LlmQuestionSource {
    /// # Errors
    ///
    /// Returns `GenerationConfigError` if the environment holds invalid settings.
    pub fn from_env() -> Result<Self, GenerationConfigError> {
        Ok(Self::new(GenerationConfig::from_env()?))
    }

    #[must_use]
    pub fn new(config: Option<GenerationConfig>) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    #[must_use]
    pub fn config(&self) -> Option<&GenerationConfig> {
        self.config.as_ref()
    }

    /// Request a completion and return the raw message content.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the source is disabled, the request fails,
    /// or the reply carries no content.
    pub async fn complete(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        let response = self.send(request, false).await?;
        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(GenerationError::EmptyResponse)?;
        Ok(content)
    }

    /// Request a streamed completion.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError` when the source is disabled or the request
    /// itself fails. Errors inside the stream surface through [`QuestionStream`].
    pub async fn stream(
        &self,
        request: &GenerationRequest,
    ) -> Result<QuestionStream, GenerationError> {
        let response = self.send(request, true).await?;
        Ok(QuestionStream::from_byte_stream(
            response.bytes_stream(),
            request.policy(),
        ))
    }

    async fn send(
        &self,
        request: &GenerationRequest,
        stream: bool,
    ) -> Result<reqwest::Response, GenerationError> {
        let config = self.config.as_ref().ok_or(GenerationError::Disabled)?;

        let payload = ChatRequest {
            model: &config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: build_prompt(request, &config.language),
                },
            ],
            temperature: config.temperature,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            stream,
        };

        tracing::info!(
            model = %config.model,
            count = request.count(),
            excluded = request.exclude().len(),
            stream,
            "requesting generated questions"
        );
        let response = self
            .client
            .post(config.completions_url())
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(%status, "question generation rejected");
            return Err(GenerationError::HttpStatus(status));
        }
        Ok(response)
    }
}

#[async_trait]
impl QuestionSource for LlmQuestionSource {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<QuestionSet, QuestionSourceError> {
        let content = self.complete(request).await?;
        let set = validate_text(&content, request.policy()).inspect_err(|err| {
            tracing::warn!(error = %err, "generated questions failed validation");
        })?;
        tracing::info!(questions = set.len(), "generated questions accepted");
        Ok(set)
    }
}

impl std::fmt::Debug for LlmQuestionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmQuestionSource")
            .field("enabled", &self.enabled())
            .field("model", &self.config.as_ref().map(|c| c.model.as_str()))
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}
