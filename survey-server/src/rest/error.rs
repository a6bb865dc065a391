use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use survey_core::SurveyError;
use survey_telemetry::error;

/// Plain-text error response derived from a [`SurveyError`].
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    /// Map `err` to a status code. Messages of server-side failures are only passed
    /// through when `expose_details` is set.
    pub fn from_error(err: SurveyError, expose_details: bool) -> Self {
        let status = match &err {
            SurveyError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            SurveyError::NotLoaded => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status.is_server_error() && status != StatusCode::SERVICE_UNAVAILABLE {
            error!(error = %err, load_failure = err.is_load_failure(), "request failed");
            if expose_details { err.to_string() } else { "Internal server error".to_string() }
        } else {
            err.to_string()
        };

        Self { status, message }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}
