//! UI-agnostic conversation types
//!
//! These are shared by the router, the exporters, and whatever front-end
//! drives the session. Nothing here depends on a UI framework.

use crate::image::Image;

/// A chat message in the conversation
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub image: Option<Image>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            image: None,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: Option<Image>) -> Self {
        self.image = image;
        self
    }

    /// `"User: hi"` / `"Assistant: hello"`, the line format used by prompts and exports.
    pub fn labelled(&self) -> String {
        format!("{}: {}", self.role.label(), self.content)
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    /// Capitalized role name
    pub fn label(&self) -> &'static str {
        match self {
            ChatRole::User => "User",
            ChatRole::Assistant => "Assistant",
        }
    }
}

/// Most recent user message, if any
pub fn last_user_message(messages: &[ChatMessage]) -> Option<&ChatMessage> {
    messages.iter().rev().find(|m| m.role == ChatRole::User)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_capitalizes_role() {
        assert_eq!(ChatMessage::user("hi").labelled(), "User: hi");
        assert_eq!(ChatMessage::assistant("hello").labelled(), "Assistant: hello");
    }

    #[test]
    fn test_last_user_message_skips_assistant() {
        let messages = vec![
            ChatMessage::user("first"),
            ChatMessage::assistant("reply"),
            ChatMessage::user("second"),
            ChatMessage::assistant("another reply"),
        ];
        assert_eq!(last_user_message(&messages).map(|m| m.content.as_str()), Some("second"));
        assert!(last_user_message(&[ChatMessage::assistant("only")]).is_none());
    }
}
