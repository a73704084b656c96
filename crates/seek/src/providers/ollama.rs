use serde_json::json;

use super::llm::BackendRequest;
use super::utils::{messages_to_openai_spec, non_empty, post, BackendReply};
use crate::errors::ProviderResult;
use crate::models::message::Message;

pub const OLLAMA_HOST: &str = "http://localhost:11434";
pub const OLLAMA_MODEL: &str = "qwen2.5";

/// Non-streaming call to Ollama's native chat endpoint
pub async fn chat(request: &BackendRequest<'_>, history: &[Message]) -> ProviderResult<BackendReply> {
    let url = format!("{}/api/chat", request.base_url);
    let payload = json!({
        "model": request.model,
        "messages": messages_to_openai_spec(history),
        "stream": false,
    });

    let response = post(request.client.post(&url).json(&payload), request.backend).await?;

    let message = &response["message"];
    let text = non_empty(message["content"].as_str(), request.backend)?;
    Ok(BackendReply {
        text,
        reasoning: message["thinking"].as_str().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ProviderError;
    use crate::providers::base::Provider;
    use crate::providers::configs::ProviderConfig;
    use crate::providers::llm::LlmProvider;
    use anyhow::Result;
    use serde_json::Value;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn _setup_mock_server(response: ResponseTemplate) -> Result<(MockServer, LlmProvider)> {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({"model": OLLAMA_MODEL, "stream": false})))
            .respond_with(response)
            .mount(&mock_server)
            .await;

        let config = ProviderConfig::new("ollama", OLLAMA_MODEL)
            .local(true)
            .with_server_address(mock_server.uri())
            .with_timeout(Duration::from_secs(2));
        let provider = LlmProvider::new(config)?;
        Ok((mock_server, provider))
    }

    fn ok_body(content: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "model": OLLAMA_MODEL,
            "message": {"role": "assistant", "content": content},
            "done": true
        }))
    }

    #[tokio::test]
    async fn test_chat_basic() -> Result<()> {
        let (_server, provider) = _setup_mock_server(ok_body(json!("Hello there"))).await?;
        let generation = provider
            .generate(&[Message::user().with_text("Hello?")])
            .await?;
        assert_eq!(generation.answer, "Hello there");
        Ok(())
    }

    #[tokio::test]
    async fn test_think_tags_become_reasoning() -> Result<()> {
        let (_server, provider) =
            _setup_mock_server(ok_body(json!("<think>count</think>\nDone."))).await?;
        let generation = provider
            .generate(&[Message::user().with_text("count")])
            .await?;
        assert_eq!(generation.answer, "Done.");
        assert_eq!(generation.reasoning, "count");
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_content_is_malformed() -> Result<()> {
        let (_server, provider) = _setup_mock_server(ok_body(Value::Null)).await?;
        let err = provider
            .generate(&[Message::user().with_text("Hello?")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Call { ref backend, .. } if backend == "ollama"));
        assert!(err.to_string().contains("malformed response"));
        Ok(())
    }

    #[tokio::test]
    async fn test_hung_backend_hits_deadline() -> Result<()> {
        let (_server, provider) =
            _setup_mock_server(ok_body(json!("late")).set_delay(Duration::from_secs(10))).await?;
        let started = std::time::Instant::now();
        let err = provider
            .generate(&[Message::user().with_text("Hello?")])
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Call { .. }));
        assert!(started.elapsed() < Duration::from_secs(8));
        Ok(())
    }
}
