//! Gemini adapter over the Generative Language REST API.
//!
//! Streaming requests use `models/{model}:streamGenerateContent?alt=sse` and decode
//! each server-sent event as one response chunk.

mod error;
mod wire;

pub use error::GeminiError;

use crate::retry::{RetryConfig, execute_with_retry};
use async_trait::async_trait;
use error::{
    BadPartSnafu, BadResponseSnafu, BaseUrlSnafu, BlockedSnafu, BuildClientSnafu,
    ConstructUrlSnafu, DecodeResponseSnafu, DeserializeSnafu, InvalidApiKeySnafu,
    PerformRequestSnafu,
};
use eventsource_stream::Eventsource;
use futures::{StreamExt, TryStreamExt};
use reqwest::{
    Client, Response,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use snafu::ResultExt;
use std::sync::LazyLock;
use survey_core::{Llm, LlmRequest, LlmResponse, LlmResponseStream, Result, SurveyError};
use survey_telemetry::debug;
use url::Url;
use wire::{GenerateContentRequest, GenerateContentResponse};

static DEFAULT_BASE_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse("https://generativelanguage.googleapis.com/v1beta/")
        .expect("unreachable error: failed to parse default base URL")
});

pub struct GeminiModel {
    http_client: Client,
    base_url: Url,
    model: String,
    retry_config: RetryConfig,
}

impl GeminiModel {
    /// Client for `model` (with or without the `models/` prefix) authenticated by `api_key`.
    pub fn new(api_key: impl AsRef<str>, model: impl Into<String>) -> Result<Self> {
        let headers = HeaderMap::from_iter([(
            HeaderName::from_static("x-goog-api-key"),
            HeaderValue::from_str(api_key.as_ref()).context(InvalidApiKeySnafu)?,
        )]);
        let http_client =
            Client::builder().default_headers(headers).build().context(BuildClientSnafu)?;

        let model = model.into();
        let model = model.strip_prefix("models/").map(str::to_string).unwrap_or(model);

        Ok(Self {
            http_client,
            base_url: DEFAULT_BASE_URL.clone(),
            model,
            retry_config: RetryConfig::default(),
        })
    }

    /// Point the client at another API root, e.g. a local mock server.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        let normalized =
            if base_url.ends_with('/') { base_url.to_string() } else { format!("{base_url}/") };
        self.base_url = Url::parse(&normalized).context(BaseUrlSnafu { url: base_url })?;
        Ok(self)
    }

    #[must_use]
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn build_url(&self, endpoint: &str) -> std::result::Result<Url, GeminiError> {
        let suffix = format!("models/{}:{endpoint}", self.model);
        self.base_url.join(&suffix).context(ConstructUrlSnafu { suffix })
    }

    async fn check_response(response: Response) -> std::result::Result<Response, GeminiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let description = response.text().await.ok();
        BadResponseSnafu { code: status.as_u16(), description }.fail()
    }

    async fn post(
        &self,
        url: Url,
        body: &GenerateContentRequest,
    ) -> std::result::Result<Response, GeminiError> {
        let response = self
            .http_client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .context(PerformRequestSnafu { url })?;
        debug!(status = response.status().as_u16(), "model response received");
        Self::check_response(response).await
    }

    async fn generate_once(&self, body: &GenerateContentRequest) -> Result<LlmResponse> {
        let url = self.build_url("generateContent")?;
        let response = self.post(url, body).await?;
        let chunk: GenerateContentResponse =
            response.json().await.context(DecodeResponseSnafu)?;
        Ok(into_llm_response(chunk, false)?)
    }

    async fn open_stream(&self, body: &GenerateContentRequest) -> Result<LlmResponseStream> {
        let mut url = self.build_url("streamGenerateContent")?;
        url.query_pairs_mut().append_pair("alt", "sse");
        let response = self.post(url, body).await?;

        let stream = response
            .bytes_stream()
            .eventsource()
            .map(|event| {
                let event = event.context(BadPartSnafu)?;
                let chunk: GenerateContentResponse =
                    serde_json::from_str(&event.data).context(DeserializeSnafu)?;
                into_llm_response(chunk, true)
            })
            .map_err(SurveyError::from);

        Ok(Box::pin(stream))
    }
}

fn into_llm_response(
    chunk: GenerateContentResponse,
    streaming: bool,
) -> std::result::Result<LlmResponse, GeminiError> {
    if let Some(reason) = chunk.block_reason() {
        return BlockedSnafu { reason }.fail();
    }
    Ok(chunk.into_llm_response(streaming))
}

#[async_trait]
impl Llm for GeminiModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate_content(&self, req: LlmRequest, stream: bool) -> Result<LlmResponseStream> {
        let body = GenerateContentRequest::from(&req);
        debug!(
            model = %self.model,
            contents = body.contents.len(),
            tools = req.tools.len(),
            stream,
            "sending generation request"
        );

        if stream {
            return execute_with_retry(&self.retry_config, || self.open_stream(&body)).await;
        }

        let response = execute_with_retry(&self.retry_config, || self.generate_once(&body)).await?;
        Ok(Box::pin(futures::stream::once(async move { Ok(response) })))
    }
}
