use serde_json::{json, Value};

use super::llm::BackendRequest;
use super::utils::{messages_to_openai_spec, non_empty, post, BackendReply};
use crate::errors::ProviderResult;
use crate::models::message::Message;

pub const OPENAI_HOST: &str = "https://api.openai.com";

/// Chat completion against any OpenAI-compatible endpoint (OpenAI itself,
/// DeepSeek, Together, OpenRouter, LM Studio, text-generation-inference)
pub async fn chat(request: &BackendRequest<'_>, history: &[Message]) -> ProviderResult<BackendReply> {
    let url = format!("{}/v1/chat/completions", request.base_url);
    let payload = json!({
        "model": request.model,
        "messages": messages_to_openai_spec(history),
    });

    let mut builder = request.client.post(&url).json(&payload);
    if let Some(key) = request.api_key {
        builder = builder.bearer_auth(key);
    }

    let response = post(builder, request.backend).await?;
    response_to_reply(&response, request)
}

fn response_to_reply(response: &Value, request: &BackendRequest<'_>) -> ProviderResult<BackendReply> {
    let message = &response["choices"][0]["message"];
    let text = non_empty(message["content"].as_str(), request.backend)?;
    let reasoning = message["reasoning_content"]
        .as_str()
        .or_else(|| message["reasoning"].as_str())
        .map(str::to_string);
    Ok(BackendReply { text, reasoning })
}
