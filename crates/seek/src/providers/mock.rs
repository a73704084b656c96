use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use super::base::{Generation, Provider};
use super::utils::BackendReply;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::Message;

/// A scripted provider that returns pre-configured replies for testing
///
/// Replies are served in order. Once the script runs out, the `repeat` result
/// (if any) is returned forever, otherwise an empty answer.
pub struct MockProvider {
    responses: Mutex<VecDeque<ProviderResult<String>>>,
    repeat: Option<ProviderResult<String>>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    histories: Mutex<Vec<Vec<Message>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of replies
    pub fn new<S: Into<String>>(responses: Vec<S>) -> Self {
        Self::with_results(responses.into_iter().map(|r| Ok(r.into())).collect())
    }

    /// Replies and failures, in order
    pub fn with_results(responses: Vec<ProviderResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            repeat: None,
            delay: None,
            calls: AtomicUsize::new(0),
            histories: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `reply`
    pub fn repeating<S: Into<String>>(reply: S) -> Self {
        Self {
            repeat: Some(Ok(reply.into())),
            ..Self::with_results(Vec::new())
        }
    }

    /// Always fail with a backend error
    pub fn failing<S: Into<String>>(message: S) -> Self {
        Self {
            repeat: Some(Err(ProviderError::call("mock", message))),
            ..Self::with_results(Vec::new())
        }
    }

    /// Sleep before answering, to hold a call in flight
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every history the provider was called with
    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn generate(&self, history: &[Message]) -> ProviderResult<Generation> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.histories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(history.to_vec());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let next = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let text = match next {
            Some(result) => result?,
            None => self.repeat.clone().unwrap_or_else(|| Ok(String::new()))?,
        };
        Ok(BackendReply::text(text).into_generation())
    }
}
