//! Telemetry initialization and configuration

use std::sync::Once;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

pub type TelemetryError = Box<dyn std::error::Error + Send + Sync>;

/// Logging and tracing options for the process.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// Filter used when `RUST_LOG` is not set.
    pub default_filter: String,
    /// Emit one JSON object per log line instead of human-readable output.
    pub json: bool,
    /// OTLP collector endpoint (e.g. `http://localhost:4317`); spans are exported when set.
    pub otlp_endpoint: Option<String>,
}

impl TelemetryConfig {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            default_filter: "info".to_string(),
            json: false,
            otlp_endpoint: None,
        }
    }

    pub fn with_default_filter(mut self, filter: impl Into<String>) -> Self {
        self.default_filter = filter.into();
        self
    }

    pub fn with_json(mut self, json: bool) -> Self {
        self.json = json;
        self
    }

    pub fn with_otlp_endpoint(mut self, endpoint: Option<String>) -> Self {
        self.otlp_endpoint = endpoint;
        self
    }
}

/// Install the global subscriber. Only the first call has an effect.
///
/// # Example
/// ```
/// use survey_telemetry::{TelemetryConfig, init_telemetry};
/// init_telemetry(&TelemetryConfig::new("survey-server")).expect("telemetry");
/// ```
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let mut outcome = Ok(());
    INIT.call_once(|| {
        outcome = install(config);
    });
    outcome
}

fn install(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.default_filter))?;

    let plain_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer().with_target(true).with_thread_ids(true).with_line_number(true)
    });
    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer().json().with_target(true).with_current_span(true)
    });

    let (tracer, otlp_error) = tracer_or_fallback(config);
    let exported_to =
        config.otlp_endpoint.as_deref().filter(|_| tracer.is_some()).unwrap_or("disabled");
    let otel_layer = tracer.map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(filter)
        .with(plain_layer)
        .with(json_layer)
        .with(otel_layer)
        .try_init()?;

    if let Some(err) = otlp_error {
        tracing::warn!(
            error = %err,
            otlp.endpoint = config.otlp_endpoint.as_deref().unwrap_or_default(),
            "OTLP export disabled, logging locally only"
        );
    }
    tracing::info!(
        service.name = %config.service_name,
        otlp.endpoint = exported_to,
        "Telemetry initialized"
    );
    Ok(())
}

/// The OTLP tracer when an endpoint is configured. A pipeline that fails to install
/// is handed back as an error so local logging still comes up.
fn tracer_or_fallback(
    config: &TelemetryConfig,
) -> (Option<opentelemetry_sdk::trace::Tracer>, Option<TelemetryError>) {
    match config.otlp_endpoint.as_deref() {
        Some(endpoint) => match otlp_tracer(&config.service_name, endpoint) {
            Ok(tracer) => (Some(tracer), None),
            Err(err) => (None, Some(err)),
        },
        None => (None, None),
    }
}

fn otlp_tracer(
    service_name: &str,
    endpoint: &str,
) -> Result<opentelemetry_sdk::trace::Tracer, TelemetryError> {
    use opentelemetry_otlp::WithExportConfig;

    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(opentelemetry_otlp::new_exporter().tonic().with_endpoint(endpoint))
        .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
            opentelemetry_sdk::Resource::new(vec![opentelemetry::KeyValue::new(
                "service.name",
                service_name.to_string(),
            )]),
        ))
        .install_batch(opentelemetry_sdk::runtime::Tokio)?;
    Ok(tracer)
}

/// Flush pending spans. Call before exit when OTLP export is enabled.
pub fn shutdown_telemetry() {
    opentelemetry::global::shutdown_tracer_provider();
}
