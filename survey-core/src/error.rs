use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum SurveyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Responses not loaded")]
    NotLoaded,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Model error: {0}")]
    Model(String),

    /// The provider answered with a non-success HTTP status.
    #[error("Model error: {message}")]
    ModelStatus { status: u16, message: String },

    #[error("Model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, SurveyError>;

impl SurveyError {
    /// Load failures are the I/O and parse variants; they are fatal for the request
    /// that triggered the load.
    pub fn is_load_failure(&self) -> bool {
        matches!(self, SurveyError::Io(_) | SurveyError::Parse(_))
    }

    /// Timeouts, throttling and provider 5xx statuses may succeed on a later try.
    /// Provider statuses are classified by code alone; message text is only
    /// consulted for transport failures that carry no status.
    pub fn is_retryable(&self) -> bool {
        match self {
            SurveyError::Timeout(_) => true,
            SurveyError::ModelStatus { status, .. } => is_retryable_status_code(*status),
            SurveyError::Model(message) => is_retryable_transport_message(message),
            _ => false,
        }
    }
}

fn is_retryable_status_code(status: u16) -> bool {
    matches!(status, 408 | 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_transport_message(message: &str) -> bool {
    let normalized = message.to_ascii_uppercase();
    normalized.contains("TIMED OUT")
        || normalized.contains("CONNECTION RESET")
        || normalized.contains("CONNECTION REFUSED")
        || normalized.contains("CONNECTION CLOSED")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SurveyError::NotLoaded;
        assert_eq!(err.to_string(), "Responses not loaded");

        let err = SurveyError::InvalidArgument("unknown mode 'median'".to_string());
        assert_eq!(err.to_string(), "Invalid argument: unknown mode 'median'");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: SurveyError = io_err.into();
        assert!(matches!(err, SurveyError::Io(_)));
        assert!(err.is_load_failure());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SurveyError::Timeout(Duration::from_secs(1)).is_retryable());
        let status = |status: u16, message: &str| SurveyError::ModelStatus {
            status,
            message: message.to_string(),
        };
        assert!(status(429, "RESOURCE_EXHAUSTED: quota").is_retryable());
        assert!(status(503, "UNAVAILABLE").is_retryable());
        assert!(!status(400, "code 400; invalid argument").is_retryable());
        assert!(SurveyError::Model("error sending request: connection reset".into()).is_retryable());
        assert!(!SurveyError::Model("failed to deserialize JSON response".into()).is_retryable());
        assert!(!SurveyError::NotLoaded.is_retryable());
        assert!(!SurveyError::Parse("bad row".into()).is_retryable());
    }

    #[test]
    fn test_client_status_with_server_like_digits_is_not_retried() {
        let err = SurveyError::ModelStatus {
            status: 400,
            message: "The input token count (1500321) exceeds the maximum; INVALID_ARGUMENT".into(),
        };
        assert!(!err.is_retryable());
        assert_eq!(
            err.to_string(),
            "Model error: The input token count (1500321) exceeds the maximum; INVALID_ARGUMENT"
        );
    }
}
