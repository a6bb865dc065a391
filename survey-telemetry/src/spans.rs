//! Span helpers for the chat request path
//!
//! Pre-configured spans for instrumenting chat turns, model calls, tool execution
//! and dataset loads.

use tracing::Span;

/// Create a span covering one Answer request
///
/// # Example
/// ```
/// use survey_telemetry::chat_span;
/// let span = chat_span("req-123", 2);
/// let _enter = span.enter();
/// ```
pub fn chat_span(request_id: &str, message_count: usize) -> Span {
    tracing::info_span!(
        "chat.answer",
        request.id = request_id,
        chat.messages = message_count,
        otel.kind = "server"
    )
}

/// Create a span for model API calls
pub fn model_call_span(model_name: &str, round: usize) -> Span {
    tracing::info_span!("model.call", model.name = model_name, model.round = round, otel.kind = "client")
}

/// Create a span for tool execution
pub fn tool_execute_span(tool_name: &str) -> Span {
    tracing::info_span!("tool.execute", tool.name = tool_name, otel.kind = "internal")
}

/// Create a span for a dataset (re)load
pub fn dataset_load_span(source: &str) -> Span {
    tracing::debug_span!("dataset.load", dataset.source = source)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_can_be_entered() {
        let span = chat_span("req-1", 3);
        let _enter = span.enter();
        let _model = model_call_span("gemini-1.5-flash", 1).entered();
        let _tool = tool_execute_span("count").entered();
        let _load = dataset_load_span("data/responses.csv").entered();
    }
}
