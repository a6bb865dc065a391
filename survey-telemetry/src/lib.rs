//! # survey-telemetry
//!
//! Structured logging with `tracing`, optional OTLP span export, and span helpers
//! for the chat request path.
//!
//! ```rust
//! use survey_telemetry::{TelemetryConfig, info, init_telemetry};
//!
//! fn main() -> Result<(), survey_telemetry::TelemetryError> {
//!     init_telemetry(&TelemetryConfig::new("survey-server"))?;
//!     info!("ready");
//!     Ok(())
//! }
//! ```

pub mod init;
pub mod spans;

// Re-export tracing macros for convenience
pub use tracing::{Instrument, Span, debug, error, info, instrument, trace, warn};

pub use init::{TelemetryConfig, TelemetryError, init_telemetry, shutdown_telemetry};
pub use spans::*;
