use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use survey_core::{
    Content, Llm, LlmRequest, LlmResponse, LlmResponseStream, ROLE_MODEL, ROLE_USER, Result,
    SurveyError,
};

/// One scripted reply of a [`MockLlm`].
#[derive(Debug, Clone)]
pub enum MockTurn {
    /// Stream these responses, in order.
    Responses(Vec<LlmResponse>),
    /// Stream these responses, then fail with a model error.
    FailAfter(Vec<LlmResponse>, String),
    /// Refuse the call before any output.
    Fail(String),
    /// Open a stream that never yields.
    Stall,
}

/// Offline [`Llm`] that replays scripted turns and records every request.
///
/// Once the script is exhausted it answers by echoing the latest user text, which
/// keeps the server usable without credentials.
pub struct MockLlm {
    name: String,
    turns: Mutex<VecDeque<MockTurn>>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), turns: Mutex::new(VecDeque::new()), requests: Mutex::new(Vec::new()) }
    }

    #[must_use]
    pub fn with_turn(self, turn: MockTurn) -> Self {
        lock(&self.turns).push_back(turn);
        self
    }

    /// Script a turn that streams `chunks` as partial text responses.
    #[must_use]
    pub fn with_text_turn<I, S>(self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.with_turn(MockTurn::Responses(text_chunks(chunks)))
    }

    /// Script a turn that asks for `tool` with empty arguments.
    #[must_use]
    pub fn with_tool_call(self, tool: &str) -> Self {
        self.with_turn(MockTurn::Responses(vec![LlmResponse::new(
            Content::new(ROLE_MODEL).with_function_call(tool, serde_json::json!({})),
        )]))
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        lock(&self.requests).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn text_chunks<I, S>(chunks: I) -> Vec<LlmResponse>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut responses: Vec<LlmResponse> = chunks
        .into_iter()
        .map(|chunk| LlmResponse::partial(Content::new(ROLE_MODEL).with_text(chunk)))
        .collect();
    if let Some(last) = responses.last_mut() {
        last.partial = false;
        last.turn_complete = true;
    }
    responses
}

fn echo(req: &LlmRequest) -> Vec<LlmResponse> {
    let question = req
        .contents
        .iter()
        .rev()
        .find(|content| content.role == ROLE_USER)
        .map(Content::text)
        .unwrap_or_default();
    let reply = format!("(mock) You asked: {question}");
    let words: Vec<String> = reply.split_inclusive(' ').map(str::to_string).collect();
    text_chunks(words)
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate_content(&self, req: LlmRequest, _stream: bool) -> Result<LlmResponseStream> {
        let turn = lock(&self.turns).pop_front();
        let turn = turn.unwrap_or_else(|| MockTurn::Responses(echo(&req)));
        lock(&self.requests).push(req);

        let stream: LlmResponseStream = match turn {
            MockTurn::Fail(message) => return Err(SurveyError::Model(message)),
            MockTurn::Stall => Box::pin(futures::stream::pending()),
            MockTurn::Responses(responses) => {
                Box::pin(async_stream::stream! {
                    for response in responses {
                        yield Ok(response);
                    }
                })
            }
            MockTurn::FailAfter(responses, message) => {
                Box::pin(async_stream::stream! {
                    for response in responses {
                        yield Ok(response);
                    }
                    yield Err(SurveyError::Model(message));
                })
            }
        };
        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    async fn collect_text(stream: LlmResponseStream) -> Result<String> {
        let responses: Vec<Result<LlmResponse>> = stream.collect().await;
        let mut text = String::new();
        for response in responses {
            text.push_str(&response?.text());
        }
        Ok(text)
    }

    #[tokio::test]
    async fn test_scripted_turns_in_order() {
        let mock = MockLlm::new("mock")
            .with_tool_call("count")
            .with_text_turn(["There are ", "3 responses."]);

        let first = mock.generate_content(LlmRequest::new("mock", vec![]), true).await.unwrap();
        let first: Vec<_> = first.collect().await;
        let content = first[0].as_ref().unwrap().content.clone().unwrap();
        assert_eq!(content.function_calls().count(), 1);

        let second = mock.generate_content(LlmRequest::new("mock", vec![]), true).await.unwrap();
        assert_eq!(collect_text(second).await.unwrap(), "There are 3 responses.");
        assert_eq!(mock.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_echo_fallback() {
        let mock = MockLlm::new("mock");
        let req = LlmRequest::new("mock", vec![Content::new(ROLE_USER).with_text("Hello?")]);
        let stream = mock.generate_content(req, true).await.unwrap();
        assert_eq!(collect_text(stream).await.unwrap(), "(mock) You asked: Hello?");
    }

    #[tokio::test]
    async fn test_failures() {
        let mock = MockLlm::new("mock")
            .with_turn(MockTurn::Fail("quota".into()))
            .with_turn(MockTurn::FailAfter(text_chunks(["partial"]), "dropped".into()));

        let err = mock.generate_content(LlmRequest::new("mock", vec![]), true).await.err().unwrap();
        assert!(matches!(err, SurveyError::Model(m) if m == "quota"));

        let stream = mock.generate_content(LlmRequest::new("mock", vec![]), true).await.unwrap();
        let err = collect_text(stream).await.unwrap_err();
        assert!(matches!(err, SurveyError::Model(m) if m == "dropped"));
        assert_eq!(mock.requests().len(), 2);
    }

    #[test]
    fn test_text_chunks_mark_last_complete() {
        let responses = text_chunks(["a", "b"]);
        assert!(responses[0].partial);
        assert!(!responses[1].partial);
        assert!(responses[1].turn_complete);
    }
}
