use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use quiz_core::model::{QuestionSet, ValidationPolicy};
use quiz_core::partial::{PartialAccumulator, PartialQuestionSet};
use serde::Deserialize;
use serde_json::Value;

use super::sse::SseDecoder;
use crate::error::{GenerationError, QuestionSourceError};

type ByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Progress of a streamed generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The in-flight document changed. Not validated.
    Partial(PartialQuestionSet),
    /// The terminal document, validated with the full rules.
    Complete(QuestionSet),
}

/// Pull-based reader over a streamed chat completion.
pub struct QuestionStream {
    body: ByteStream,
    decoder: SseDecoder,
    accumulator: PartialAccumulator,
    policy: ValidationPolicy,
    queue: VecDeque<StreamEvent>,
    finished: bool,
}

impl QuestionStream {
    /// Wrap a raw server-sent-events body.
    pub fn from_byte_stream<S>(body: S, policy: ValidationPolicy) -> Self
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        Self {
            body: Box::pin(body),
            decoder: SseDecoder::new(),
            accumulator: PartialAccumulator::new(),
            policy,
            queue: VecDeque::new(),
            finished: false,
        }
    }

    /// Next event, or `None` once the stream has ended.
    ///
    /// The terminal `[DONE]` marker, or the end of the body, triggers
    /// validation of everything received; after an error no further events
    /// are produced.
    pub async fn next_event(&mut self) -> Option<Result<StreamEvent, QuestionSourceError>> {
        loop {
            if let Some(event) = self.queue.pop_front() {
                return Some(Ok(event));
            }
            if self.finished {
                return None;
            }

            let events = match self.body.next().await {
                Some(Ok(chunk)) => self.decoder.push(&chunk),
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(GenerationError::from(err).into()));
                }
                None => {
                    let mut tail = self.decoder.finish();
                    // A body that ends without `[DONE]` is still terminal.
                    tail.push(DONE.to_string());
                    tail
                }
            };

            for data in events {
                if let Err(err) = self.handle(&data) {
                    self.finished = true;
                    self.queue.clear();
                    return Some(Err(err));
                }
            }
        }
    }

    /// Drain the stream, reporting partial views, and return the validated set.
    ///
    /// # Errors
    ///
    /// Returns the first error the stream produced.
    pub async fn collect(
        mut self,
        mut on_partial: impl FnMut(&PartialQuestionSet),
    ) -> Result<QuestionSet, QuestionSourceError> {
        while let Some(event) = self.next_event().await {
            match event? {
                StreamEvent::Partial(view) => on_partial(&view),
                StreamEvent::Complete(set) => return Ok(set),
            }
        }
        Err(GenerationError::EmptyResponse.into())
    }

    fn handle(&mut self, data: &str) -> Result<(), QuestionSourceError> {
        if self.finished {
            return Ok(());
        }
        if data.trim() == DONE {
            let set = self.complete()?;
            self.queue.push_back(StreamEvent::Complete(set));
            return Ok(());
        }

        let chunk: StreamChunk = serde_json::from_str(data)
            .map_err(|err| GenerationError::InvalidEvent(err.to_string()))?;
        if let Some(error) = chunk.error {
            return Err(GenerationError::Provider(provider_message(&error)).into());
        }
        for choice in chunk.choices {
            let Some(content) = choice.delta.content else {
                continue;
            };
            if let Some(view) = self.accumulator.push(&content) {
                self.queue.push_back(StreamEvent::Partial(view));
            }
        }
        Ok(())
    }

    fn complete(&mut self) -> Result<QuestionSet, QuestionSourceError> {
        self.finished = true;
        let accumulator = std::mem::take(&mut self.accumulator);
        if accumulator.text().trim().is_empty() {
            return Err(GenerationError::EmptyResponse.into());
        }
        let set = accumulator.finish(self.policy)?;
        tracing::debug!(questions = set.len(), "streamed generation complete");
        Ok(set)
    }
}

impl std::fmt::Debug for QuestionStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuestionStream")
            .field("policy", &self.policy)
            .field("queued", &self.queue.len())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

const DONE: &str = "[DONE]";

fn provider_message(error: &Value) -> String {
    error
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), str::to_owned)
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}
