use crate::prompt::PromptLimits;
use std::{sync::Arc, time::Duration};
use survey_core::{GenerateContentConfig, Llm};
use survey_data::DatasetSource;

/// Bound on one model call and on each wait for the next streamed chunk.
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Model round trips allowed per answer before giving up on tool calls.
pub const DEFAULT_MAX_TOOL_ROUNDS: usize = 5;

/// Security configuration for the HTTP surface.
#[derive(Clone, Debug)]
pub struct SecurityConfig {
    /// Allowed origins for CORS (empty = allow all)
    pub allowed_origins: Vec<String>,
    /// Maximum request body size in bytes (default: 1MB)
    pub max_body_size: usize,
    /// Time allowed to produce response headers (default: 30 seconds)
    pub request_timeout: Duration,
    /// Whether 500 responses carry the underlying error message
    pub expose_error_details: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            max_body_size: 1024 * 1024,
            request_timeout: Duration::from_secs(30),
            expose_error_details: false,
        }
    }
}

impl SecurityConfig {
    /// Permissive CORS and detailed errors, for local UI work.
    pub fn development() -> Self {
        Self { request_timeout: Duration::from_secs(60), expose_error_details: true, ..Self::default() }
    }

    pub fn production(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins, ..Self::default() }
    }
}

/// Everything needed to build the application router.
#[derive(Clone)]
pub struct ServerConfig {
    pub llm: Arc<dyn Llm>,
    pub source: Arc<dyn DatasetSource>,
    pub generation_timeout: Duration,
    pub max_tool_rounds: usize,
    pub prompt_limits: PromptLimits,
    /// Sampling settings sent with every model call; provider defaults when `None`.
    pub generation_config: Option<GenerateContentConfig>,
    /// Stream answers chunk by chunk; when false the model answers in one piece.
    pub streaming: bool,
    pub security: SecurityConfig,
}

impl ServerConfig {
    pub fn new(llm: Arc<dyn Llm>, source: Arc<dyn DatasetSource>) -> Self {
        Self {
            llm,
            source,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            prompt_limits: PromptLimits::default(),
            generation_config: None,
            streaming: true,
            security: SecurityConfig::default(),
        }
    }

    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds;
        self
    }

    pub fn with_prompt_limits(mut self, limits: PromptLimits) -> Self {
        self.prompt_limits = limits;
        self
    }

    pub fn with_generation_config(mut self, config: GenerateContentConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_security(mut self, security: SecurityConfig) -> Self {
        self.security = security;
        self
    }

    /// Configure allowed CORS origins
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.security.allowed_origins = origins;
        self
    }

    pub fn with_max_body_size(mut self, size: usize) -> Self {
        self.security.max_body_size = size;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.security.request_timeout = timeout;
        self
    }

    /// Enable detailed error messages (for development only)
    pub fn with_error_details(mut self, expose: bool) -> Self {
        self.security.expose_error_details = expose;
        self
    }
}
