//! Message and Conversation domain types.
//!
//! These are the core value objects that flow through a chat turn:
//! the UI hands over a message plus prior history → the agent seeds a
//! [`Conversation`] → the provider and tools append to it → the final
//! reply goes back to the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::tool::ToolResult;

/// Unique identifier for a conversation (one chat turn).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message sender in a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The visitor talking to the persona
    #[default]
    User,
    /// The persona
    Assistant,
    /// Persona instructions and biographical context
    System,
    /// Tool execution result
    Tool,
    /// Any role a UI sends that the conversation does not model
    #[serde(other)]
    Other,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    pub id: String,

    /// Who sent this message
    pub role: Role,

    /// The text content
    pub content: String,

    /// Tool calls requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<MessageToolCall>,

    /// If this is a tool result, which tool call it responds to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create a tool result message.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::with_role(Role::Tool, content.into())
        }
    }

    /// Whether this is an assistant message that requests tool calls.
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// A tool call embedded in an assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageToolCall {
    /// Unique ID for this tool call
    pub id: String,

    /// Name of the tool to invoke
    pub name: String,

    /// Arguments as JSON string
    pub arguments: String,
}

/// Content of a history entry as supplied by a chat UI.
///
/// Chat widgets sometimes send structured parts (`{"text": "..."}` and
/// friends) instead of plain strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryContent {
    Text(String),
    Structured(serde_json::Value),
}

impl Default for HistoryContent {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl HistoryContent {
    /// Flatten the content into plain text.
    pub fn as_text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Structured(serde_json::Value::Null) => String::new(),
            Self::Structured(serde_json::Value::String(text)) => text.clone(),
            Self::Structured(value @ serde_json::Value::Object(map)) => {
                match map.get("text").and_then(|t| t.as_str()) {
                    Some(text) if !text.is_empty() => text.to_string(),
                    _ => value.to_string(),
                }
            }
            Self::Structured(value) => value.to_string(),
        }
    }
}

impl From<&str> for HistoryContent {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// One prior turn as exchanged with the UI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub content: HistoryContent,
}

impl HistoryEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: HistoryContent::Text(content.into()),
        }
    }

    /// Return a copy whose content is plain text.
    ///
    /// Idempotent: normalizing a normalized entry changes nothing.
    pub fn normalize(&self) -> Self {
        Self {
            role: self.role,
            content: HistoryContent::Text(self.content.as_text()),
        }
    }
}

/// The ordered message sequence of a single chat turn.
///
/// Owned by exactly one agent invocation and discarded afterwards; callers
/// keep [`Conversation::transcript`] if they want to seed the next turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    /// Unique conversation ID
    pub id: ConversationId,

    /// Ordered messages
    pub messages: Vec<Message>,

    /// When this conversation was created
    pub created_at: DateTime<Utc>,

    /// When the last message was added
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the opening sequence: system prompt, normalized history, new message.
    ///
    /// History entries with `system`, `tool` or unrecognised roles are
    /// dropped: the persona owns the only system message, and a tool message
    /// without its originating call would break the call-id linkage.
    pub fn seed(system_prompt: &str, history: &[HistoryEntry], user_message: &str) -> Self {
        let mut conv = Self::new();
        conv.push(Message::system(system_prompt));

        for entry in history {
            let entry = entry.normalize();
            let text = entry.content.as_text();
            match entry.role {
                Role::User => conv.push(Message::user(text)),
                Role::Assistant => conv.push(Message::assistant(text)),
                Role::System | Role::Tool | Role::Other => {
                    debug!(role = ?entry.role, "Dropping history entry with unsupported role");
                }
            }
        }

        conv.push(Message::user(user_message));
        conv
    }

    /// Add a message to the conversation.
    pub fn push(&mut self, message: Message) {
        self.updated_at = Utc::now();
        self.messages.push(message);
    }

    /// Append one resolved tool round.
    ///
    /// `assistant` must carry the calls; `results` must answer them one to
    /// one, in the order the calls were issued.
    pub fn push_tool_round(&mut self, assistant: Message, results: &[ToolResult]) -> Result<()> {
        if !assistant.has_tool_calls() {
            return Err(Error::Conversation(
                "tool round must start with an assistant message carrying tool calls".into(),
            ));
        }

        if assistant.tool_calls.len() != results.len() {
            return Err(Error::Conversation(format!(
                "{} tool calls but {} results",
                assistant.tool_calls.len(),
                results.len()
            )));
        }

        for (call, result) in assistant.tool_calls.iter().zip(results) {
            if call.id != result.call_id {
                return Err(Error::Conversation(format!(
                    "result for '{}' does not answer outstanding call '{}'",
                    result.call_id, call.id
                )));
            }
        }

        self.push(assistant);
        for result in results {
            self.push(Message::tool_result(&result.call_id, result.to_content()));
        }
        Ok(())
    }

    /// The user/assistant text turns, suitable as history for the next turn.
    pub fn transcript(&self) -> Vec<HistoryEntry> {
        self.messages
            .iter()
            .filter(|m| match m.role {
                Role::User => true,
                Role::Assistant => m.tool_calls.is_empty(),
                Role::System | Role::Tool | Role::Other => false,
            })
            .map(|m| HistoryEntry::new(m.role, m.content.clone()))
            .collect()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
