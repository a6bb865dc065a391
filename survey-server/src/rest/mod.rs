pub mod controllers;
pub mod error;

pub use controllers::{ChatController, DatasetController};
pub use error::ApiError;

use crate::{ServerConfig, chat::ChatService};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, StatusCode, header},
    routing::{get, post},
};
use std::sync::Arc;
use survey_telemetry::warn;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    if config.security.allowed_origins.is_empty() {
        warn!("CORS allows any origin; pass --allowed-origin to restrict it");
        cors.allow_origin(AllowOrigin::any())
    } else {
        let origins: Vec<HeaderValue> =
            config.security.allowed_origins.iter().filter_map(|o| o.parse().ok()).collect();
        cors.allow_origin(origins)
    }
}

/// Build the router around a fresh [`ChatService`] created from `config`.
pub fn create_app(config: ServerConfig) -> Router {
    let service = Arc::new(ChatService::from_config(&config));
    create_app_with_service(service, &config)
}

/// Build the router around an existing service, e.g. one whose history or cache a
/// caller wants to inspect.
pub fn create_app_with_service(service: Arc<ChatService>, config: &ServerConfig) -> Router {
    let expose = config.security.expose_error_details;
    let chat_controller = ChatController::new(service.clone(), expose);
    let dataset_controller = DatasetController::new(service.cache().clone(), expose);

    let api_router = Router::new()
        .route("/health", get(health_check))
        .route(
            "/chat",
            post(controllers::chat::answer).put(controllers::chat::refresh),
        )
        .route("/history", get(controllers::chat::history))
        .with_state(chat_controller)
        .route("/metrics", get(controllers::dataset::metrics))
        .route("/distribution", get(controllers::dataset::distribution_of))
        .with_state(dataset_controller);

    Router::new().nest("/api", api_router).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                config.security.request_timeout,
            ))
            .layer(DefaultBodyLimit::max(config.security.max_body_size))
            .layer(build_cors_layer(config))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ))
            .layer(SetResponseHeaderLayer::if_not_present(
                header::X_FRAME_OPTIONS,
                HeaderValue::from_static("DENY"),
            )),
    )
}

async fn health_check() -> &'static str {
    "OK"
}
