use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A single turn of the conversation as the backend sees it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new<S: Into<String>>(role: Role, content: S) -> Self {
        Message {
            role,
            content: content.into(),
        }
    }

    /// Create a new user message with empty content
    pub fn user() -> Self {
        Message::new(Role::User, "")
    }

    /// Create a new assistant message with empty content
    pub fn assistant() -> Self {
        Message::new(Role::Assistant, "")
    }

    /// Create a new system message with empty content
    pub fn system() -> Self {
        Message::new(Role::System, "")
    }

    /// Append text to the message, separating it from existing text with a newline
    pub fn with_text<S: AsRef<str>>(mut self, text: S) -> Self {
        if !self.content.is_empty() {
            self.content.push('\n');
        }
        self.content.push_str(text.as_ref());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_with_text_appends_lines() {
        let message = Message::user().with_text("first").with_text("second");
        assert_eq!(message.role, Role::User);
        assert_eq!(message.content, "first\nsecond");
    }

    #[test]
    fn test_role_serializes_lowercase() -> anyhow::Result<()> {
        let message = Message::assistant().with_text("hi");
        let value = serde_json::to_value(&message)?;
        assert_eq!(value, json!({"role": "assistant", "content": "hi"}));
        assert_eq!(Role::System.to_string(), "system");
        Ok(())
    }
}
