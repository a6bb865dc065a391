//! # survey-core
//!
//! Shared types and traits for the survey chat service.
//!
//! - [`SurveyError`] / [`Result`] - Unified error handling
//! - [`Llm`] - The text-generation service boundary
//! - [`Tool`] - Callable tools declared to the model
//! - [`Content`] / [`Part`] - Conversation content exchanged with the model

pub mod error;
pub mod model;
pub mod tool;
pub mod types;

pub use error::{Result, SurveyError};
pub use model::{
    FinishReason, GenerateContentConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream,
    UsageMetadata,
};
pub use tool::Tool;
pub use types::{Content, FunctionResponseData, Part, ROLE_FUNCTION, ROLE_MODEL, ROLE_USER};
