use std::{future::Future, time::Duration};
use survey_core::{Result, SurveyError};

/// Backoff policy for opening a model call. Only the request that opens the
/// response is retried; a stream that fails half way is reported as is.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    pub enabled: bool,
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(4),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub fn with_initial_delay(mut self, initial_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self
    }

    #[must_use]
    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let multiplier = f64::from(self.backoff_multiplier.max(1.0));
        Duration::from_secs_f64(current.as_secs_f64() * multiplier).min(self.max_delay)
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. Classification uses [`SurveyError::is_retryable`].
pub async fn execute_with_retry<T, Op, Fut>(config: &RetryConfig, mut operation: Op) -> Result<T>
where
    Op: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    if !config.enabled {
        return operation().await;
    }

    let mut attempt: u32 = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < config.max_retries && SurveyError::is_retryable(&error) => {
                attempt += 1;
                survey_telemetry::warn!(
                    attempt,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %error,
                    "model request failed with retryable error; retrying"
                );
                tokio::time::sleep(delay).await;
                delay = config.next_delay(delay);
            }
            Err(error) => return Err(error),
        }
    }
}
