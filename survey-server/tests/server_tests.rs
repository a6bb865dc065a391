use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use survey_core::Result;
use survey_data::{CsvFileSource, CsvTextSource, Dataset, DatasetSource};
use survey_model::{MockLlm, MockTurn};
use survey_server::{ChatEvent, ServerConfig, create_app};
use tower::ServiceExt;

const WORKLOAD: &str = "How often do you feel overwhelmed by your academic workload?";

/// Wraps a source and counts how often it is read.
struct CountingSource<S> {
    inner: S,
    loads: Arc<AtomicUsize>,
}

impl<S: DatasetSource> DatasetSource for CountingSource<S> {
    fn load(&self) -> Result<Dataset> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        self.inner.load()
    }

    fn describe(&self) -> String {
        self.inner.describe()
    }
}

fn survey_csv() -> String {
    format!("{WORKLOAD},Year\nOften,1\nNever,2\nAlways,3\n")
}

fn app_with(mock: MockLlm, source: impl DatasetSource + 'static) -> (Router, Arc<AtomicUsize>) {
    app_with_shared(Arc::new(mock), source)
}

fn app_with_shared(
    mock: Arc<MockLlm>,
    source: impl DatasetSource + 'static,
) -> (Router, Arc<AtomicUsize>) {
    let loads = Arc::new(AtomicUsize::new(0));
    let source = CountingSource { inner: source, loads: loads.clone() };
    let config = ServerConfig::new(mock, Arc::new(source))
        .with_generation_timeout(Duration::from_millis(200));
    (create_app(config), loads)
}

fn app(mock: MockLlm) -> (Router, Arc<AtomicUsize>) {
    app_with(mock, CsvTextSource::new(survey_csv()))
}

fn chat_request(messages: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "messages": messages }).to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn refresh_request() -> Request<Body> {
    Request::builder().method("PUT").uri("/api/chat").body(Body::empty()).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn sse_events(response: axum::response::Response) -> Vec<ChatEvent> {
    body_text(response)
        .await
        .lines()
        .filter_map(|line| line.strip_prefix("data: "))
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

async fn history(app: &Router) -> Vec<String> {
    let response = app.clone().oneshot(get("/api/history")).await.unwrap();
    serde_json::from_str(&body_text(response).await).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _) = app(MockLlm::new("mock"));
    let response = app.oneshot(get("/api/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(body_text(response).await, "OK");
}

#[tokio::test]
async fn test_chat_streams_answer_and_records_history() {
    let (app, _) = app(MockLlm::new("mock").with_text_turn(["Two thirds ", "are overwhelmed."]));

    let response = app
        .clone()
        .oneshot(chat_request(json!([{ "role": "user", "content": "How many are overwhelmed?" }])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/event-stream");

    let events = sse_events(response).await;
    assert_eq!(
        events,
        vec![
            ChatEvent::Text { delta: "Two thirds ".into() },
            ChatEvent::Text { delta: "are overwhelmed.".into() },
            ChatEvent::Done { text: "Two thirds are overwhelmed.".into() },
        ]
    );
    assert_eq!(
        history(&app).await,
        vec!["User: How many are overwhelmed?", "AI: Two thirds are overwhelmed."]
    );
}

#[tokio::test]
async fn test_dataset_is_loaded_once() {
    let (app, loads) = app(MockLlm::new("mock"));

    for question in ["first", "second", "third"] {
        let response = app
            .clone()
            .oneshot(chat_request(json!([{ "role": "user", "content": question }])))
            .await
            .unwrap();
        let events = sse_events(response).await;
        assert!(matches!(events.last(), Some(ChatEvent::Done { .. })));
    }

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(history(&app).await.len(), 6);
}

#[tokio::test]
async fn test_refresh_before_first_answer() {
    let (app, loads) = app(MockLlm::new("mock"));

    let response = app.clone().oneshot(refresh_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "Cache refreshed successfully.");

    let response = app
        .clone()
        .oneshot(chat_request(json!([{ "role": "user", "content": "q" }])))
        .await
        .unwrap();
    let _ = sse_events(response).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_refresh_picks_up_file_changes() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{WORKLOAD}\nOften\n").unwrap();
    file.flush().unwrap();

    let (app, _) = app_with(MockLlm::new("mock"), CsvFileSource::new(file.path()));
    let count = |app: Router| async move {
        let uri = "/api/metrics?field=How%20often%20do%20you%20feel%20overwhelmed%20by%20your%20academic%20workload%3F&mode=count";
        let response = app.oneshot(get(uri)).await.unwrap();
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        body["total"].as_u64().unwrap()
    };

    assert_eq!(count(app.clone()).await, 1);
    std::fs::write(file.path(), format!("{WORKLOAD}\nOften\nNever\nAlways\n")).unwrap();
    assert_eq!(count(app.clone()).await, 1);

    let response = app.clone().oneshot(refresh_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(count(app).await, 3);
}

#[tokio::test]
async fn test_answer_after_refresh_uses_new_dataset() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{WORKLOAD}\nOften\n").unwrap();
    file.flush().unwrap();

    let mock = Arc::new(MockLlm::new("mock"));
    let (app, loads) = app_with_shared(mock.clone(), CsvFileSource::new(file.path()));
    let ask = |app: Router, question: &'static str| async move {
        let response = app
            .oneshot(chat_request(json!([{ "role": "user", "content": question }])))
            .await
            .unwrap();
        sse_events(response).await
    };

    ask(app.clone(), "before").await;
    std::fs::write(file.path(), format!("{WORKLOAD}\nOften\nAlways\nAlways\nNever\n")).unwrap();
    let response = app.clone().oneshot(refresh_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    ask(app, "after").await;

    let requests = mock.requests();
    let system = |i: usize| requests[i].system_instruction.clone().unwrap();
    assert!(system(0).contains("with a total count of 1 students"));
    assert!(system(1).contains("with a total count of 3 students"));
    assert!(system(1).contains(r#""Never""#));
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refresh_failure_is_server_error() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app_with(MockLlm::new("mock"), CsvFileSource::new(dir.path().join("missing.csv")));

    let response = app.oneshot(refresh_request()).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Internal server error");
}

#[tokio::test]
async fn test_chat_with_missing_dataset_fails_without_history() {
    let dir = tempfile::tempdir().unwrap();
    let (app, _) = app_with(MockLlm::new("mock"), CsvFileSource::new(dir.path().join("missing.csv")));

    let response = app
        .clone()
        .oneshot(chat_request(json!([{ "role": "user", "content": "q" }])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(history(&app).await.is_empty());
}

#[tokio::test]
async fn test_invalid_conversation_is_rejected() {
    let (app, loads) = app(MockLlm::new("mock"));

    let response = app.clone().oneshot(chat_request(json!([]))).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_text(response).await, "Invalid argument: messages must not be empty");

    let response = app
        .clone()
        .oneshot(chat_request(json!([{ "role": "assistant", "content": "hello" }])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert!(history(&app).await.is_empty());
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_generation_failure_still_records_user_turn() {
    let (app, _) = app(MockLlm::new("mock").with_turn(MockTurn::FailAfter(
        vec![],
        "bad response from server; code 503".into(),
    )));

    let response = app
        .clone()
        .oneshot(chat_request(json!([{ "role": "user", "content": "q" }])))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let events = sse_events(response).await;
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], ChatEvent::Error { message } if message.contains("code 503")));
    assert_eq!(history(&app).await, vec!["User: q"]);
}

#[tokio::test]
async fn test_generation_timeout_is_reported_in_band() {
    let (app, _) = app(MockLlm::new("mock").with_turn(MockTurn::Stall));

    let response = app
        .clone()
        .oneshot(chat_request(json!([{ "role": "user", "content": "q" }])))
        .await
        .unwrap();
    let events = sse_events(response).await;

    assert!(matches!(&events[..], [ChatEvent::Error { message }] if message.contains("timed out")));
    assert_eq!(history(&app).await.len(), 1);
}

#[tokio::test]
async fn test_count_tool_round_trip() {
    let mock = MockLlm::new("mock").with_tool_call("count").with_text_turn(["3 responses."]);
    let (app, _) = app(mock);

    let response = app
        .clone()
        .oneshot(chat_request(json!([{ "role": "user", "content": "How many responses?" }])))
        .await
        .unwrap();
    let events = sse_events(response).await;

    assert_eq!(events[0], ChatEvent::ToolCall { name: "count".into(), args: json!({}) });
    assert_eq!(
        events[1],
        ChatEvent::ToolResult { name: "count".into(), result: json!({ "count": 3 }) }
    );
    assert_eq!(events.last(), Some(&ChatEvent::Done { text: "3 responses.".into() }));
    assert_eq!(history(&app).await[1], "AI: 3 responses.");
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let (app, _) = app_with(
        MockLlm::new("mock"),
        CsvTextSource::new("workload\nOften\nNever\nAlways\n"),
    );

    let response = app
        .clone()
        .oneshot(get("/api/metrics?field=workload&value=Often&value=Always&mode=count"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(body, json!({ "field": "workload", "mode": "count", "value": 2.0, "total": 3 }));

    let response = app
        .clone()
        .oneshot(get("/api/metrics?field=workload&value=Often&value=Always"))
        .await
        .unwrap();
    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert!((body["value"].as_f64().unwrap() - 200.0 / 3.0).abs() < 1e-9);

    let response = app.oneshot(get("/api/metrics?field=workload&mode=median")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_distribution_endpoint() {
    let (app, _) = app_with(
        MockLlm::new("mock"),
        CsvTextSource::new("stress,year\nHigh,1\nLow,2\nHigh,3\n,4\n"),
    );

    let response = app.oneshot(get("/api/distribution?field=stress")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        body,
        json!([
            { "name": "High", "count": 2, "value": 50.0 },
            { "name": "Low", "count": 1, "value": 25.0 },
            { "name": "(no answer)", "count": 1, "value": 25.0 }
        ])
    );
}
