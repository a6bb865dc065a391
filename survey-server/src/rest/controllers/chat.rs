use crate::chat::{ChatEvent, ChatMessage, ChatService};
use crate::rest::error::ApiError;
use axum::{
    Json,
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::{convert::Infallible, sync::Arc};
use survey_telemetry::{Instrument, chat_span};
use uuid::Uuid;

#[derive(Clone)]
pub struct ChatController {
    service: Arc<ChatService>,
    expose_error_details: bool,
}

impl ChatController {
    pub fn new(service: Arc<ChatService>, expose_error_details: bool) -> Self {
        Self { service, expose_error_details }
    }

    fn fail(&self, err: survey_core::SurveyError) -> ApiError {
        ApiError::from_error(err, self.expose_error_details)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

fn to_sse(event: ChatEvent) -> Event {
    match Event::default().json_data(&event) {
        Ok(sse) => sse,
        Err(e) => Event::default()
            .json_data(ChatEvent::Error { message: e.to_string() })
            .unwrap_or_default(),
    }
}

/// POST /api/chat
pub async fn answer(
    State(controller): State<ChatController>,
    Json(req): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let request_id = Uuid::new_v4().to_string();
    let span = chat_span(&request_id, req.messages.len());
    let events = controller
        .service
        .answer(req.messages)
        .instrument(span)
        .await
        .map_err(|e| controller.fail(e))?;
    let stream = events.map(|event| Ok(to_sse(event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

/// PUT /api/chat
pub async fn refresh(State(controller): State<ChatController>) -> Result<&'static str, ApiError> {
    controller.service.refresh().await.map_err(|e| controller.fail(e))?;
    Ok("Cache refreshed successfully.")
}

/// GET /api/history
pub async fn history(State(controller): State<ChatController>) -> Json<Vec<String>> {
    Json(controller.service.history().entries())
}
