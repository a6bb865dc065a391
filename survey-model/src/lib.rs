//! # survey-model
//!
//! Text-generation adapters behind the [`survey_core::Llm`] trait.
//!
//! - [`GeminiModel`] - Gemini REST client with SSE streaming and function calling
//! - [`MockLlm`] - Scripted offline model for tests and `--mock` runs
//! - [`RetryConfig`] - Backoff policy for opening a model call
//!
//! ```rust,no_run
//! use survey_model::GeminiModel;
//!
//! let model = GeminiModel::new("api-key", "gemini-1.5-flash").unwrap();
//! ```

pub mod gemini;
pub mod mock;
pub mod retry;

pub use gemini::{GeminiError, GeminiModel};
pub use mock::{MockLlm, MockTurn};
pub use retry::{RetryConfig, execute_with_retry};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
