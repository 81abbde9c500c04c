use serde::{Deserialize, Serialize};

use crate::error::{DiaristError, Result};

/// Server-issued conversation identifier. Opaque to the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DiaristError::InvalidResponse(
                "conversation id is empty".into(),
            ));
        }
        if trimmed.contains('/') {
            return Err(DiaristError::InvalidResponse(format!(
                "conversation id '{trimmed}' is not a single path segment"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Ai,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Ai => write!(f, "ai"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            text: text.into(),
        }
    }
}

/// Messages of one conversation, in arrival order. Append-only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    /// Text the user said, in order. Useful for previews.
    pub fn user_texts(&self) -> Vec<&str> {
        self.messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.text.as_str())
            .collect()
    }
}

/// Reply to a `start conversation` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationStarted {
    pub conversation_id: ConversationId,
    pub first_message: Option<String>,
}

/// Reply to one uploaded turn. Either side may be missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TurnReply {
    pub user_message: Option<String>,
    pub ai_response: Option<String>,
}

impl TurnReply {
    /// Messages to append, user first.
    pub fn into_messages(self) -> Vec<Message> {
        let mut out = Vec::with_capacity(2);
        if let Some(text) = self.user_message {
            out.push(Message::user(text));
        }
        if let Some(text) = self.ai_response {
            out.push(Message::ai(text));
        }
        out
    }
}
