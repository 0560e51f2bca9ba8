//! # Standin Core
//!
//! Domain types, traits, and error definitions for the Standin persona
//! agent. This crate has **no framework dependencies**: it defines the
//! domain model that the other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every collaborator of the agent loop (model endpoint, tools,
//! notification channel) is a trait here. Implementations live in their
//! own crates, so tests can plug in scripted stand-ins.

pub mod error;
pub mod event;
pub mod message;
pub mod notify;
pub mod persona;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use event::{DomainEvent, EventBus};
pub use message::{Conversation, ConversationId, HistoryContent, HistoryEntry, Message, Role};
pub use notify::{NotificationSink, NotifyOutcome, NotifyStatus};
pub use persona::{Persona, PersonaPaths};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use tool::{Tool, ToolCall, ToolName, ToolRegistry, ToolResult, ToolSpec, ToolStatus};
