use std::env;

use url::Url;

use crate::error::GenerationConfigError;

const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEFAULT_MODEL: &str = "llama-3.1-70b-versatile";
const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_LANGUAGE: &str = "Spanish";

/// Connection settings for an OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationConfig {
    pub base_url: Url,
    pub api_key: String,
    pub model: String,
    pub temperature: f32,
    pub language: String,
}

impl GenerationConfig {
    /// Settings with the default model, temperature, and language.
    ///
    /// # Errors
    ///
    /// Returns `GenerationConfigError::InvalidBaseUrl` if `base_url` does not parse.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, GenerationConfigError> {
        let base_url = Url::parse(base_url)
            .map_err(|_| GenerationConfigError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self {
            base_url,
            api_key: api_key.into(),
            model: DEFAULT_MODEL.into(),
            temperature: DEFAULT_TEMPERATURE,
            language: DEFAULT_LANGUAGE.into(),
        })
    }

    /// Read settings from the process environment.
    ///
    /// Returns `Ok(None)` when no API key is set, which disables remote generation.
    ///
    /// # Errors
    ///
    /// Returns `GenerationConfigError` if a set variable holds an invalid value.
    pub fn from_env() -> Result<Option<Self>, GenerationConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup`, using the same keys as [`Self::from_env`]:
    /// `QUIZ_AI_API_KEY` (or `GROQ_API_KEY`), `QUIZ_AI_BASE_URL`, `QUIZ_AI_MODEL`,
    /// `QUIZ_AI_TEMPERATURE`, `QUIZ_LANGUAGE`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationConfigError` if a set variable holds an invalid value.
    pub fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Option<Self>, GenerationConfigError> {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let Some(api_key) = non_empty("QUIZ_AI_API_KEY").or_else(|| non_empty("GROQ_API_KEY"))
        else {
            return Ok(None);
        };
        let base_url = non_empty("QUIZ_AI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let mut config = Self::new(base_url.trim(), api_key.trim())?;

        if let Some(model) = non_empty("QUIZ_AI_MODEL") {
            config.model = model.trim().to_string();
        }
        if let Some(raw) = non_empty("QUIZ_AI_TEMPERATURE") {
            config.temperature = raw
                .trim()
                .parse::<f32>()
                .ok()
                .filter(|t| (0.0..=2.0).contains(t))
                .ok_or(GenerationConfigError::InvalidTemperature(raw))?;
        }
        if let Some(language) = non_empty("QUIZ_LANGUAGE") {
            config.language = language.trim().to_string();
        }

        Ok(Some(config))
    }

    /// `{base_url}/chat/completions`, tolerating a trailing slash on the base.
    #[must_use]
    pub fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.base_url.as_str().trim_end_matches('/')
        )
    }
}
