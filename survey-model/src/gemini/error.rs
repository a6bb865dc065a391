use eventsource_stream::EventStreamError;
use reqwest::header::InvalidHeaderValue;
use snafu::Snafu;
use survey_core::SurveyError;
use url::Url;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum GeminiError {
    #[snafu(display("failed to parse API key"))]
    InvalidApiKey { source: InvalidHeaderValue },

    #[snafu(display("failed to build HTTP client"))]
    BuildClient { source: reqwest::Error },

    #[snafu(display("failed to parse base URL '{url}'"))]
    BaseUrl { source: url::ParseError, url: String },

    #[snafu(display("failed to construct URL (probably incorrect model name): {suffix}"))]
    ConstructUrl { source: url::ParseError, suffix: String },

    #[snafu(display("failed to perform request to '{url}'"))]
    PerformRequest { source: reqwest::Error, url: Url },

    #[snafu(display(
        "bad response from server; code {code}; description: {}",
        description.as_deref().unwrap_or("none")
    ))]
    BadResponse { code: u16, description: Option<String> },

    #[snafu(display("failed to obtain stream SSE part"))]
    BadPart { source: EventStreamError<reqwest::Error> },

    #[snafu(display("failed to decode response body"))]
    DecodeResponse { source: reqwest::Error },

    #[snafu(display("failed to deserialize JSON response"))]
    Deserialize { source: serde_json::Error },

    #[snafu(display("prompt blocked by the service: {reason}"))]
    Blocked { reason: String },
}

impl From<GeminiError> for SurveyError {
    fn from(err: GeminiError) -> Self {
        if let GeminiError::BadResponse { code, .. } = &err {
            return SurveyError::ModelStatus { status: *code, message: err.to_string() };
        }
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        SurveyError::Model(message)
    }
}
