//! # survey-server
//!
//! Chat endpoint for a survey analytics assistant. Each question is answered by a
//! text-generation model that sees the survey records, two workload metrics and the
//! conversation so far, and may call a `count` tool. Answers stream as server-sent
//! events.

pub mod chat;
pub mod config;
pub mod history;
pub mod prompt;
pub mod rest;
pub mod tools;

pub use chat::{ChatEvent, ChatMessage, ChatRole, ChatService, ChatStream};
pub use config::{SecurityConfig, ServerConfig};
pub use history::ConversationHistory;
pub use prompt::{PromptComposer, PromptLimits, WorkloadMetrics};
pub use rest::{create_app, create_app_with_service};
pub use tools::CountTool;
