//! Chat orchestration: the Answer and Refresh operations.

use crate::{
    config::ServerConfig,
    history::ConversationHistory,
    prompt::{PromptComposer, PromptLimits, WorkloadMetrics},
    tools::CountTool,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::{pin::Pin, sync::Arc, time::Duration};
use survey_core::{
    Content, GenerateContentConfig, Llm, LlmRequest, Part, ROLE_FUNCTION, ROLE_MODEL, ROLE_USER,
    Result, SurveyError, Tool,
};
use survey_data::DatasetCache;
use survey_telemetry::{Instrument, Span, info, model_call_span, tool_execute_span, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One message of the conversation as the UI sends it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }

    fn to_content(&self) -> Content {
        let role = match self.role {
            ChatRole::User => ROLE_USER,
            ChatRole::Assistant => ROLE_MODEL,
        };
        Content::new(role).with_text(&self.content)
    }
}

/// Events of one streamed answer. A stream ends with exactly one `Done` or `Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Text { delta: String },
    ToolCall { name: String, args: Value },
    ToolResult { name: String, result: Value },
    Done { text: String },
    Error { message: String },
}

impl ChatEvent {
    fn error(err: &SurveyError) -> Self {
        ChatEvent::Error { message: err.to_string() }
    }
}

pub type ChatStream = Pin<Box<dyn Stream<Item = ChatEvent> + Send>>;

/// Owns the conversation state and drives the model for each question.
pub struct ChatService {
    llm: Arc<dyn Llm>,
    cache: Arc<DatasetCache>,
    history: Arc<ConversationHistory>,
    composer: PromptComposer,
    tools: Vec<Arc<dyn Tool>>,
    generation_timeout: Duration,
    max_tool_rounds: usize,
    generation_config: Option<GenerateContentConfig>,
    streaming: bool,
}

impl ChatService {
    pub fn new(llm: Arc<dyn Llm>, cache: Arc<DatasetCache>) -> Self {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(CountTool::new(cache.clone()))];
        Self {
            llm,
            cache,
            history: Arc::new(ConversationHistory::new()),
            composer: PromptComposer::default(),
            tools,
            generation_timeout: crate::config::DEFAULT_GENERATION_TIMEOUT,
            max_tool_rounds: crate::config::DEFAULT_MAX_TOOL_ROUNDS,
            generation_config: None,
            streaming: true,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        let cache = Arc::new(DatasetCache::new(config.source.clone()));
        let mut service = Self::new(config.llm.clone(), cache)
            .with_generation_timeout(config.generation_timeout)
            .with_max_tool_rounds(config.max_tool_rounds)
            .with_prompt_limits(config.prompt_limits)
            .with_streaming(config.streaming);
        service.generation_config = config.generation_config.clone();
        service
    }

    #[must_use]
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_tool_rounds(mut self, rounds: usize) -> Self {
        self.max_tool_rounds = rounds.max(1);
        self
    }

    #[must_use]
    pub fn with_prompt_limits(mut self, limits: PromptLimits) -> Self {
        self.composer = PromptComposer::new(limits);
        self
    }

    #[must_use]
    pub fn with_generation_config(mut self, config: GenerateContentConfig) -> Self {
        self.generation_config = Some(config);
        self
    }

    #[must_use]
    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn history(&self) -> &Arc<ConversationHistory> {
        &self.history
    }

    pub fn cache(&self) -> &Arc<DatasetCache> {
        &self.cache
    }

    /// Answer the latest user message of `messages`.
    ///
    /// Fails before any side effect when the conversation has no user message, and
    /// with the load error when the dataset cannot be read. Otherwise the user turn
    /// is recorded and the returned stream carries the answer; the model's text is
    /// recorded only when the stream completes.
    pub async fn answer(&self, messages: Vec<ChatMessage>) -> Result<ChatStream> {
        if messages.is_empty() {
            return Err(SurveyError::InvalidArgument("messages must not be empty".to_string()));
        }
        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::User)
            .map(|m| m.content.clone())
            .ok_or_else(|| {
                SurveyError::InvalidArgument("messages contain no user message".to_string())
            })?;

        let dataset = self.cache.get_or_load().await?;
        self.history.push_user(&question);

        let metrics = WorkloadMetrics::compute(dataset.records());
        let system = self.composer.compose(&dataset, &metrics, &self.history.entries())?;
        info!(
            records = dataset.len(),
            overwhelmed_percentage = metrics.percentage,
            prompt_bytes = system.len(),
            "prompt composed"
        );

        let turn = Turn {
            llm: self.llm.clone(),
            tools: self.tools.clone(),
            history: self.history.clone(),
            system,
            contents: messages.iter().map(ChatMessage::to_content).collect(),
            generation_timeout: self.generation_timeout,
            max_tool_rounds: self.max_tool_rounds,
            generation_config: self.generation_config.clone(),
            streaming: self.streaming,
            span: Span::current(),
        };
        Ok(turn.run())
    }

    /// Reload the dataset from its source, returning the new record count.
    pub async fn refresh(&self) -> Result<usize> {
        let dataset = self.cache.refresh().await?;
        info!(records = dataset.len(), "dataset refreshed");
        Ok(dataset.len())
    }
}

/// State of one answer while it streams.
struct Turn {
    llm: Arc<dyn Llm>,
    tools: Vec<Arc<dyn Tool>>,
    history: Arc<ConversationHistory>,
    system: String,
    contents: Vec<Content>,
    generation_timeout: Duration,
    max_tool_rounds: usize,
    generation_config: Option<GenerateContentConfig>,
    streaming: bool,
    /// Request span the answer was started in; entered on every poll of the stream.
    span: Span,
}

impl Turn {
    fn request(&self) -> LlmRequest {
        let mut req = LlmRequest::new(self.llm.name(), self.contents.clone())
            .with_system_instruction(self.system.clone());
        if let Some(config) = &self.generation_config {
            req = req.with_config(config.clone());
        }
        for tool in &self.tools {
            req = req.with_tool(tool.name(), tool.declaration());
        }
        req
    }

    async fn call_tool(&self, name: &str, args: Value) -> Value {
        let Some(tool) = self.tools.iter().find(|t| t.name() == name) else {
            return json!({ "error": format!("Tool {name} not found") });
        };
        match tool.execute(args).instrument(tool_execute_span(name)).await {
            Ok(result) => result,
            Err(e) => {
                warn!(tool = name, error = %e, "tool execution failed");
                json!({ "error": e.to_string() })
            }
        }
    }

    fn run(mut self) -> ChatStream {
        let span = self.span.clone();
        let events: ChatStream = Box::pin(async_stream::stream! {
            let timeout = self.generation_timeout;
            let mut text = String::new();

            for round in 1..=self.max_tool_rounds {
                let req = self.request();
                let call = self.llm.generate_content(req, self.streaming);
                let opened = tokio::time::timeout(timeout, call)
                    .instrument(model_call_span(self.llm.name(), round))
                    .await;
                let mut responses = match opened {
                    Ok(Ok(responses)) => responses,
                    Ok(Err(e)) => {
                        warn!(round, error = %e, "model call failed");
                        yield ChatEvent::error(&e);
                        return;
                    }
                    Err(_) => {
                        warn!(round, "model call timed out");
                        yield ChatEvent::error(&SurveyError::Timeout(timeout));
                        return;
                    }
                };

                let mut model_content = Content::new(ROLE_MODEL);
                let mut calls: Vec<(String, Value)> = Vec::new();
                loop {
                    let response = match tokio::time::timeout(timeout, responses.next()).await {
                        Ok(Some(Ok(response))) => response,
                        Ok(None) => break,
                        Ok(Some(Err(e))) => {
                            warn!(round, error = %e, "model stream failed");
                            yield ChatEvent::error(&e);
                            return;
                        }
                        Err(_) => {
                            warn!(round, "model stream stalled");
                            yield ChatEvent::error(&SurveyError::Timeout(timeout));
                            return;
                        }
                    };
                    let Some(content) = response.content else { continue };
                    for part in content.parts {
                        match part {
                            Part::Text { text: delta } if !delta.is_empty() => {
                                text.push_str(&delta);
                                model_content.parts.push(Part::text_part(delta.clone()));
                                yield ChatEvent::Text { delta };
                            }
                            Part::FunctionCall { name, args } => {
                                calls.push((name.clone(), args.clone()));
                                model_content.parts.push(Part::FunctionCall { name, args });
                            }
                            _ => {}
                        }
                    }
                }

                if calls.is_empty() {
                    self.history.push_ai(&text);
                    info!(round, answer_bytes = text.len(), "answer complete");
                    yield ChatEvent::Done { text };
                    return;
                }

                self.contents.push(model_content);
                let mut results = Content::new(ROLE_FUNCTION);
                for (name, args) in calls {
                    yield ChatEvent::ToolCall { name: name.clone(), args: args.clone() };
                    let result = self.call_tool(&name, args).await;
                    yield ChatEvent::ToolResult { name: name.clone(), result: result.clone() };
                    results = results.with_function_response(name, result);
                }
                self.contents.push(results);
            }

            let err = SurveyError::Model(format!(
                "no answer after {} tool rounds",
                self.max_tool_rounds
            ));
            warn!(error = %err, "tool round limit reached");
            yield ChatEvent::error(&err);
        });
        in_span(span, events)
    }
}

/// Enter `span` around every poll of `stream`, so logs and child spans created while
/// the answer streams belong to the request.
fn in_span(span: Span, mut stream: ChatStream) -> ChatStream {
    Box::pin(futures::stream::poll_fn(move |cx| {
        let _entered = span.enter();
        stream.as_mut().poll_next(cx)
    }))
}
