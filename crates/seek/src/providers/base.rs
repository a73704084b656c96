use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::ProviderResult;
use crate::models::message::Message;

/// Text produced by one backend call, with any reasoning trace split out
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Generation {
    pub answer: String,
    pub reasoning: String,
}

impl Generation {
    pub fn new<A: Into<String>, R: Into<String>>(answer: A, reasoning: R) -> Self {
        Self {
            answer: answer.into(),
            reasoning: reasoning.into(),
        }
    }
}

/// Base trait for text-generation backends (Ollama, OpenAI, Google, etc)
///
/// Implementations never retry; a failed call is reported once and the caller
/// decides what to do next.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Backend identifier used in logs and errors
    fn name(&self) -> &str;

    fn model(&self) -> &str;

    /// Generate the next reply for the full conversation history
    async fn generate(&self, history: &[Message]) -> ProviderResult<Generation>;
}
