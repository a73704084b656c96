use reqwest::{RequestBuilder, StatusCode};
use serde_json::{json, Value};

use super::base::Generation;
use super::factory::ProviderType;
use crate::errors::{ProviderError, ProviderResult};
use crate::models::message::Message;

const THINK_OPEN: &str = "<think>";
const THINK_CLOSE: &str = "</think>";

/// Raw text a backend returned, before the reasoning trace is split off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendReply {
    pub text: String,
    /// Reasoning reported in a dedicated field, when the backend has one
    pub reasoning: Option<String>,
}

impl BackendReply {
    pub fn text<S: Into<String>>(text: S) -> Self {
        Self {
            text: text.into(),
            reasoning: None,
        }
    }

    pub fn into_generation(self) -> Generation {
        let (answer, inline) = split_reasoning(&self.text);
        match self.reasoning {
            Some(reasoning) if !reasoning.trim().is_empty() => {
                Generation::new(answer, reasoning.trim())
            }
            _ => Generation::new(answer, inline),
        }
    }
}

/// Split `<think>...</think>` output of reasoning models into (answer, reasoning).
/// The answer is whatever follows the last closing tag.
pub fn split_reasoning(text: &str) -> (String, String) {
    let Some(end) = text.rfind(THINK_CLOSE) else {
        return (text.trim().to_string(), String::new());
    };
    let answer = text[end + THINK_CLOSE.len()..].trim().to_string();
    let start = text
        .find(THINK_OPEN)
        .map(|i| i + THINK_OPEN.len())
        .filter(|&i| i <= end)
        .unwrap_or(0);
    (answer, text[start..end].trim().to_string())
}

/// Convert internal messages to the OpenAI chat message format
pub fn messages_to_openai_spec(messages: &[Message]) -> Vec<Value> {
    messages
        .iter()
        .map(|message| {
            json!({
                "role": message.role.as_ref(),
                "content": message.content,
            })
        })
        .collect()
}

/// Send a request and map every non-success shape onto `ProviderError::Call`
pub async fn post(request: RequestBuilder, backend: ProviderType) -> ProviderResult<Value> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::call(backend, e.to_string()))?;

    match response.status() {
        status if status.is_success() => {
            let body = response
                .text()
                .await
                .map_err(|e| ProviderError::call(backend, e.to_string()))?;
            if body.trim().is_empty() {
                return Err(ProviderError::call(backend, "empty response"));
            }
            serde_json::from_str(&body)
                .map_err(|e| ProviderError::call(backend, format!("malformed response: {}", e)))
        }
        status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
            Err(ProviderError::call(backend, format!("Server error: {}", status)))
        }
        status => {
            let body = response.text().await.unwrap_or_default();
            Err(ProviderError::call(
                backend,
                format!("Request failed: {}: {}", status, body),
            ))
        }
    }
}

/// Reject a reply with no usable text
pub fn non_empty(text: Option<&str>, backend: ProviderType) -> ProviderResult<String> {
    match text {
        Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
        Some(_) => Err(ProviderError::call(backend, "empty response")),
        None => Err(ProviderError::call(
            backend,
            "malformed response: no text content",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::Role;

    #[test]
    fn test_split_reasoning_without_tags() {
        let (answer, reasoning) = split_reasoning("  plain answer \n");
        assert_eq!(answer, "plain answer");
        assert_eq!(reasoning, "");
    }

    #[test]
    fn test_split_reasoning_with_tags() {
        let (answer, reasoning) =
            split_reasoning("<think>\nadd the numbers\n</think>\n\nThe result is 10.");
        assert_eq!(answer, "The result is 10.");
        assert_eq!(reasoning, "add the numbers");
    }

    #[test]
    fn test_split_reasoning_uses_last_closing_tag() {
        let (answer, reasoning) = split_reasoning("<think>a</think>b<think>c</think>final");
        assert_eq!(answer, "final");
        assert_eq!(reasoning, "a</think>b<think>c");
    }

    #[test]
    fn test_dedicated_reasoning_field_wins() {
        let reply = BackendReply {
            text: "<think>inline</think>answer".to_string(),
            reasoning: Some("native".to_string()),
        };
        assert_eq!(reply.into_generation(), Generation::new("answer", "native"));
    }

    #[test]
    fn test_messages_to_openai_spec() {
        let messages = vec![
            Message::new(Role::System, "sys"),
            Message::user().with_text("hi"),
        ];
        let spec = messages_to_openai_spec(&messages);
        assert_eq!(spec[0], json!({"role": "system", "content": "sys"}));
        assert_eq!(spec[1], json!({"role": "user", "content": "hi"}));
    }

    #[test]
    fn test_non_empty() {
        assert!(non_empty(Some("x"), ProviderType::Test).is_ok());
        assert!(matches!(
            non_empty(Some("  "), ProviderType::OpenAi),
            Err(ProviderError::Call { backend, message }) if backend == "openai" && message == "empty response"
        ));
        assert!(non_empty(None, ProviderType::OpenAi).is_err());
    }
}
