//! Streaming chat endpoints.
//!
//! - `POST /stream_process`:  multipart form with optional uploads; plain-text stream
//! - `POST /v1/chat/stream`:  JSON referencing stored uploads; SSE of typed events

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Multipart, State},
    http::header,
    response::sse::{Event as SseEvent, Sse},
    response::{IntoResponse, Json, Response},
};
use serde::Deserialize;
use synapse_config::DEFAULT_PERSONA;
use synapse_core::interaction::{InteractionStore, NewInteraction};
use synapse_core::message::ChatMessage;
use synapse_engine::{ChatStream, ChatStreamEvent, ChatStreamRequest, LOCATION_UNKNOWN};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tracing::{debug, error, info};

use crate::{ApiError, SharedState};

/// `POST /stream_process`
pub async fn stream_process_handler(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let mut form = ChatForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed form: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "document" => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Upload failed: {e}")))?;
                if bytes.is_empty() {
                    continue;
                }
                let stored = if name == "image" {
                    state.uploads.save_image(file_name.as_deref(), &bytes).await
                } else {
                    state.uploads.save_document(file_name.as_deref(), &bytes).await
                }
                .map_err(|e| ApiError::internal(format!("Failed to store upload: {e}")))?;

                if name == "image" {
                    form.image = Some(stored);
                } else {
                    form.document = Some(stored);
                }
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Malformed field {name}: {e}")))?;
                form.set(&name, value);
            }
        }
    }

    let request = form.into_request()?;
    info!(
        text_len = request.user_text.len(),
        image = request.image_path.is_some(),
        document = request.document_path.is_some(),
        "stream_process request"
    );

    let stream = start(&state, request).await?;
    let body = Body::from_stream(stream.into_text_stream().map(Ok::<_, Infallible>));

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response())
}

/// JSON body for `POST /v1/chat/stream`.
#[derive(Debug, Deserialize)]
pub struct ChatStreamBody {
    pub text: String,
    #[serde(default = "default_lang")]
    pub lang: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    #[serde(default)]
    pub fast: bool,
    #[serde(default = "default_persona")]
    pub persona: String,
    #[serde(default = "default_location")]
    pub location: String,
    /// Name of a previously uploaded image.
    #[serde(default)]
    pub image: Option<String>,
    /// Name of a previously uploaded document.
    #[serde(default)]
    pub document: Option<String>,
}

fn default_lang() -> String {
    "en".into()
}
fn default_persona() -> String {
    DEFAULT_PERSONA.into()
}
fn default_location() -> String {
    LOCATION_UNKNOWN.into()
}

/// `POST /v1/chat/stream`
pub async fn chat_stream_handler(
    State(state): State<SharedState>,
    Json(body): Json<ChatStreamBody>,
) -> Result<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>, ApiError> {
    let resolve = |name: Option<String>| -> Result<Option<PathBuf>, ApiError> {
        name.map(|n| {
            state
                .uploads
                .resolve(&n)
                .ok_or_else(|| ApiError::bad_request(format!("Invalid file name: {n}")))
        })
        .transpose()
    };

    let mut request = ChatStreamRequest::new(body.text)
        .with_language(body.lang)
        .with_history(body.history)
        .with_persona(body.persona)
        .with_location(body.location)
        .fast(body.fast);
    request.image_path = resolve(body.image)?;
    request.document_path = resolve(body.document)?;

    info!(persona = %request.persona, fast = request.fast_mode, "v1/chat/stream SSE request");

    let stream = start(&state, request).await?;
    let events = stream.into_events().map(|event| {
        let event_type = event.event_type();
        let data = serde_json::to_string(&event).unwrap_or_default();
        Ok(SseEvent::default().event(event_type).data(data))
    });

    Ok(Sse::new(events))
}

/// Run the pipeline, attaching auto-save when enabled.
async fn start(state: &SharedState, request: ChatStreamRequest) -> Result<ChatStream, ApiError> {
    let user_text = request.user_text.clone();
    let image = request
        .image_path
        .as_ref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned());

    let stream = state
        .pipeline
        .start_chat_stream(request)
        .await
        .map_err(ApiError::from_context)?;

    Ok(if state.auto_save {
        save_on_completion(stream, state.store.clone(), user_text, image)
    } else {
        stream
    })
}

/// Pass events through unchanged; once `Done` arrives, persist the exchange
/// in the background. Interrupted, unavailable or abandoned streams are not saved.
pub fn save_on_completion(
    mut upstream: ChatStream,
    store: Arc<dyn InteractionStore>,
    user_text: String,
    image_path: Option<String>,
) -> ChatStream {
    let (tx, rx) = mpsc::channel(1);

    tokio::spawn(async move {
        let mut answer = String::new();
        loop {
            let event = tokio::select! {
                _ = tx.closed() => return,
                next = upstream.next_event() => match next {
                    Some(event) => event,
                    None => return,
                },
            };
            match &event {
                ChatStreamEvent::Fragment { content } => answer.push_str(content),
                ChatStreamEvent::Done { .. } => {
                    let interaction = NewInteraction::new(user_text.clone(), answer.clone())
                        .with_image_path(image_path.clone());
                    let store = store.clone();
                    tokio::spawn(async move {
                        match store.save(interaction).await {
                            Ok(id) => debug!(id, "Interaction saved"),
                            Err(e) => error!(error = %e, "Failed to save interaction"),
                        }
                    });
                }
                _ => {}
            }
            if tx.send(event).await.is_err() {
                return;
            }
        }
    });

    ChatStream::from_receiver(rx)
}

/// Text fields of the multipart form, with their defaults.
#[derive(Debug)]
struct ChatForm {
    text: Option<String>,
    lang: String,
    history: String,
    fast: bool,
    persona: String,
    location: String,
    image: Option<PathBuf>,
    document: Option<PathBuf>,
}

impl Default for ChatForm {
    fn default() -> Self {
        Self {
            text: None,
            lang: default_lang(),
            history: "[]".into(),
            fast: false,
            persona: default_persona(),
            location: default_location(),
            image: None,
            document: None,
        }
    }
}

impl ChatForm {
    fn set(&mut self, name: &str, value: String) {
        match name {
            "text" => self.text = Some(value),
            "lang" => self.lang = value,
            "history" => self.history = value,
            "fast" => self.fast = parse_flag(&value),
            "persona" => self.persona = value,
            "location" => self.location = value,
            other => debug!(field = %other, "Ignoring unknown form field"),
        }
    }

    fn into_request(self) -> Result<ChatStreamRequest, ApiError> {
        let text = self
            .text
            .ok_or_else(|| ApiError::bad_request("Missing form field: text"))?;
        let history: Vec<ChatMessage> = serde_json::from_str(&self.history)
            .map_err(|e| ApiError::bad_request(format!("Invalid history JSON: {e}")))?;

        let mut request = ChatStreamRequest::new(text)
            .with_language(self.lang)
            .with_history(history)
            .with_persona(self.persona)
            .with_location(self.location)
            .fast(self.fast);
        request.image_path = self.image;
        request.document_path = self.document;
        Ok(request)
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn flags() {
        assert!(parse_flag("true"));
        assert!(parse_flag("True"));
        assert!(parse_flag("1"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
    }

    #[test]
    fn form_defaults() {
        let mut form = ChatForm::default();
        form.set("text", "hello".into());
        let request = form.into_request().unwrap();
        assert_eq!(request.language_code, "en");
        assert_eq!(request.persona, "Default");
        assert_eq!(request.location, "Unknown");
        assert!(request.history.is_empty());
    }

    #[test]
    fn form_requires_text() {
        assert!(ChatForm::default().into_request().is_err());
    }

    #[test]
    fn form_rejects_bad_history() {
        let mut form = ChatForm::default();
        form.set("text", "hi".into());
        form.set("history", "not json".into());
        let err = form.into_request().unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn form_parses_history() {
        let mut form = ChatForm::default();
        form.set("text", "and now?".into());
        form.set(
            "history",
            r#"[{"role":"user","content":"hi"},{"role":"assistant","content":"hello"}]"#.into(),
        );
        form.set("fast", "true".into());
        let request = form.into_request().unwrap();
        assert_eq!(request.history.len(), 2);
        assert!(request.fast_mode);
    }
}
