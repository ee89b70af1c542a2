//! Chat payloads.
//!
//! Incoming messages are the unformatted text of the server's chat component;
//! outgoing messages are exactly what the player typed (commands included).

/// Payload of [`Channel::ChatInput`](crate::events::Channel::ChatInput).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatInputEvent {
    pub text: String,
}

impl ChatInputEvent {
    pub fn new(text: impl Into<String>) -> Self {
        ChatInputEvent { text: text.into() }
    }
}

/// Payload of [`Channel::ChatOutput`](crate::events::Channel::ChatOutput).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatOutputEvent {
    pub message: String,
}

impl ChatOutputEvent {
    pub fn new(message: impl Into<String>) -> Self {
        ChatOutputEvent {
            message: message.into(),
        }
    }

    /// True if the message is a client command rather than chat.
    pub fn is_command(&self) -> bool {
        self.message.starts_with('.') || self.message.starts_with('/')
    }
}
