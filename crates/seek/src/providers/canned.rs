use super::utils::BackendReply;
use crate::models::message::{Message, Role};

pub const TEST_REPLY: &str = "This is a test response from the test provider.";

/// Offline backend for wiring checks: answers every conversation with the same
/// text, noting how many user turns it has seen as reasoning.
pub fn reply(history: &[Message]) -> BackendReply {
    let turns = history.iter().filter(|m| m.role == Role::User).count();
    BackendReply {
        text: TEST_REPLY.to_string(),
        reasoning: Some(format!("test provider saw {} user message(s)", turns)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::base::Provider;
    use crate::providers::configs::ProviderConfig;
    use crate::providers::llm::LlmProvider;

    #[tokio::test]
    async fn test_canned_reply_through_provider() -> anyhow::Result<()> {
        let provider = LlmProvider::new(ProviderConfig::new("test", "none"))?;
        let history = [Message::user().with_text("one"), Message::user().with_text("two")];
        let generation = provider.generate(&history).await?;
        assert_eq!(generation.answer, TEST_REPLY);
        assert_eq!(generation.reasoning, "test provider saw 2 user message(s)");
        Ok(())
    }
}
