use super::message::{Message, Role};

/// Ordered conversation context owned by one agent.
///
/// The first entry is always the system prompt; everything after it is appended
/// in the order it happened and is sent verbatim to the backend.
#[derive(Debug, Clone, Default)]
pub struct Memory {
    messages: Vec<Message>,
}

impl Memory {
    pub fn new<S: Into<String>>(system_prompt: S) -> Self {
        Memory {
            messages: vec![Message::new(Role::System, system_prompt)],
        }
    }

    /// Replace the system prompt, keeping the rest of the conversation.
    pub fn set_system_prompt<S: Into<String>>(&mut self, system_prompt: S) {
        match self.messages.first_mut() {
            Some(first) if first.role == Role::System => first.content = system_prompt.into(),
            _ => self
                .messages
                .insert(0, Message::new(Role::System, system_prompt)),
        }
    }

    /// Append a message and return its index.
    pub fn push<S: Into<String>>(&mut self, role: Role, content: S) -> usize {
        self.messages.push(Message::new(role, content));
        self.messages.len() - 1
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn system_prompt(&self) -> &str {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Drop the conversation but keep the system prompt.
    pub fn clear(&mut self) {
        self.messages.truncate(1);
    }
}
