use serde_json::{json, Value};

use super::llm::BackendRequest;
use super::utils::{non_empty, post, BackendReply};
use crate::errors::ProviderResult;
use crate::models::message::{Message, Role};

pub const GOOGLE_HOST: &str = "https://generativelanguage.googleapis.com";

/// Gemini `generateContent`. System messages are folded into `systemInstruction`
/// and assistant turns use Gemini's `model` role.
pub async fn generate_content(
    request: &BackendRequest<'_>,
    history: &[Message],
) -> ProviderResult<BackendReply> {
    let url = format!(
        "{}/v1beta/models/{}:generateContent",
        request.base_url, request.model
    );

    let mut builder = request.client.post(&url).json(&messages_to_google_spec(history));
    if let Some(key) = request.api_key {
        builder = builder.header("x-goog-api-key", key);
    }

    let response = post(builder, request.backend).await?;
    response_to_reply(&response, request)
}

fn messages_to_google_spec(history: &[Message]) -> Value {
    let system: Vec<Value> = history
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| json!({"text": m.content}))
        .collect();

    let contents: Vec<Value> = history
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| {
            let role = match m.role {
                Role::Assistant => "model",
                _ => "user",
            };
            json!({"role": role, "parts": [{"text": m.content}]})
        })
        .collect();

    let mut payload = json!({ "contents": contents });
    if !system.is_empty() {
        payload["systemInstruction"] = json!({ "parts": system });
    }
    payload
}

fn response_to_reply(response: &Value, request: &BackendRequest<'_>) -> ProviderResult<BackendReply> {
    let parts = response["candidates"][0]["content"]["parts"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let mut text = Vec::new();
    let mut thoughts = Vec::new();
    for part in &parts {
        let Some(chunk) = part["text"].as_str() else {
            continue;
        };
        if part["thought"].as_bool().unwrap_or(false) {
            thoughts.push(chunk);
        } else {
            text.push(chunk);
        }
    }

    let joined = (!parts.is_empty()).then(|| text.concat());
    Ok(BackendReply {
        text: non_empty(joined.as_deref(), request.backend)?,
        reasoning: (!thoughts.is_empty()).then(|| thoughts.concat()),
    })
}
