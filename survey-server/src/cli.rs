use clap::Parser;
use std::{path::PathBuf, time::Duration};
use survey_core::GenerateContentConfig;
use survey_model::DEFAULT_MODEL;
use survey_server::{PromptLimits, SecurityConfig};
use survey_telemetry::TelemetryConfig;

/// Environment variables consulted for the Gemini API key, in order.
pub const API_KEY_VARS: [&str; 3] =
    ["GOOGLE_GENERATIVE_AI_API_KEY", "GOOGLE_API_KEY", "GEMINI_API_KEY"];

#[derive(Parser, Debug)]
#[command(name = "survey-server")]
#[command(about = "Chat with a language model about student survey responses", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Address to bind
    #[arg(long, env = "SURVEY_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SURVEY_PORT", default_value_t = 3000)]
    pub port: u16,

    /// Survey responses CSV file
    #[arg(long, env = "SURVEY_DATASET", default_value = "data/responses.csv")]
    pub dataset: PathBuf,

    /// Gemini model name
    #[arg(long, env = "SURVEY_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Seconds to wait for the model to start answering and between streamed chunks
    #[arg(long, default_value_t = 60)]
    pub generation_timeout_secs: u64,

    /// Model round trips allowed per answer
    #[arg(long, default_value_t = 5)]
    pub max_tool_rounds: usize,

    /// Sampling temperature
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Nucleus sampling probability mass
    #[arg(long)]
    pub top_p: Option<f32>,

    /// Number of highest-probability tokens considered at each step
    #[arg(long)]
    pub top_k: Option<i32>,

    /// Upper bound on tokens generated per model call
    #[arg(long)]
    pub max_output_tokens: Option<i32>,

    /// Wait for each complete model response instead of streaming it
    #[arg(long)]
    pub buffered: bool,

    /// Only send the most recent N history entries to the model
    #[arg(long)]
    pub max_history_turns: Option<usize>,

    /// Only embed the first N records in the prompt
    #[arg(long)]
    pub max_records: Option<usize>,

    /// Allowed CORS origin (repeatable; none allows any origin)
    #[arg(long = "allowed-origin")]
    pub allowed_origins: Vec<String>,

    /// Log filter used when RUST_LOG is unset (e.g. "info" or "survey_server=debug")
    #[arg(long, env = "SURVEY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "SURVEY_LOG_JSON")]
    pub log_json: bool,

    /// OTLP collector endpoint for span export
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Answer with a scripted echo model instead of Gemini (no API key needed)
    #[arg(long)]
    pub mock: bool,
}

impl Cli {
    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig::new("survey-server")
            .with_default_filter(&self.log_level)
            .with_json(self.log_json)
            .with_otlp_endpoint(self.otlp_endpoint.clone())
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    /// Sampling settings, or `None` to leave every one at the provider default.
    pub fn generation_config(&self) -> Option<GenerateContentConfig> {
        let config = GenerateContentConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            top_k: self.top_k,
            max_output_tokens: self.max_output_tokens,
        };
        let unset = config.temperature.is_none()
            && config.top_p.is_none()
            && config.top_k.is_none()
            && config.max_output_tokens.is_none();
        (!unset).then_some(config)
    }

    pub fn prompt_limits(&self) -> PromptLimits {
        PromptLimits { max_history_turns: self.max_history_turns, max_records: self.max_records }
    }

    pub fn security(&self) -> SecurityConfig {
        if self.mock {
            SecurityConfig { allowed_origins: self.allowed_origins.clone(), ..SecurityConfig::development() }
        } else {
            SecurityConfig::production(self.allowed_origins.clone())
        }
    }
}

/// First non-empty API key found through `lookup`.
pub fn api_key_from(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    API_KEY_VARS.iter().filter_map(|var| lookup(var)).find(|key| !key.trim().is_empty())
}
