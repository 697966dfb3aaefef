//! Request payload assembly.

use std::path::Path;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use synapse_config::{AppConfig, AssistantConfig, ContextConfig, PersonaTable};
use synapse_core::message::ChatMessage;
use tracing::debug;

use crate::context::document::{document_context, truncate_context};
use crate::context::prompt::system_prompt;
use crate::error::ContextError;
use crate::extract::{DocumentExtractor, FileExtractor};
use crate::request::ChatStreamRequest;

const FALLBACK_IMAGE_MIME: &str = "image/jpeg";

/// Everything sent to a model for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPayload {
    pub system_prompt: String,
    pub history: Vec<ChatMessage>,
    pub current_message: ChatMessage,
}

impl RequestPayload {
    pub fn has_image(&self) -> bool {
        self.current_message.content.has_image()
    }

    /// `[system, ...history, current]`.
    pub fn into_messages(self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(ChatMessage::system(self.system_prompt));
        messages.extend(self.history);
        messages.push(self.current_message);
        messages
    }
}

/// Builds [`RequestPayload`]s. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct ContextBuilder {
    personas: PersonaTable,
    assistant: AssistantConfig,
    limits: ContextConfig,
    extractor: Arc<dyn DocumentExtractor>,
}

impl ContextBuilder {
    pub fn new(
        personas: PersonaTable,
        assistant: AssistantConfig,
        limits: ContextConfig,
        extractor: Arc<dyn DocumentExtractor>,
    ) -> Self {
        Self {
            personas,
            assistant,
            limits,
            extractor,
        }
    }

    /// Builder using the filesystem extractor and the configured tables.
    pub fn from_config(config: &AppConfig) -> Self {
        let extractor = Arc::new(FileExtractor::new(config.context.table_preview_rows));
        Self::new(
            config.personas.clone(),
            config.assistant.clone(),
            config.context.clone(),
            extractor,
        )
    }

    /// Assemble the payload. Blocking: reads the document and image from disk.
    ///
    /// Only an unreadable image is an error; document problems are reported
    /// inline in the user turn.
    pub fn build(&self, request: &ChatStreamRequest) -> Result<RequestPayload, ContextError> {
        let tone = self.personas.tone(&request.persona);
        let system_prompt = system_prompt(
            &self.assistant,
            tone,
            &request.language_code,
            &request.location,
        );

        let doc_context = match &request.document_path {
            Some(path) => truncate_context(
                document_context(path, self.extractor.as_ref()),
                self.limits.max_document_chars,
                &self.limits.truncation_marker,
            ),
            None => String::new(),
        };
        let text = format!("{doc_context}\nUSER REQUEST: {}", request.user_text);

        let current_message = match &request.image_path {
            Some(path) => ChatMessage::user_with_image(text, image_data_url(path)?),
            None => ChatMessage::user(text),
        };

        debug!(
            persona = %request.persona,
            history = request.history.len(),
            document_chars = doc_context.chars().count(),
            image = request.image_path.is_some(),
            "Context built"
        );

        Ok(RequestPayload {
            system_prompt,
            history: request.history.clone(),
            current_message,
        })
    }
}

/// `data:{mime};base64,{bytes}` for an image on disk.
pub fn image_data_url(path: &Path) -> Result<String, ContextError> {
    let bytes = std::fs::read(path).map_err(|e| ContextError::Image {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mime = mime_guess::from_path(path)
        .first_raw()
        .filter(|m| m.starts_with("image/"))
        .unwrap_or(FALLBACK_IMAGE_MIME);
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use synapse_core::message::{ContentPart, MessageContent, Role};

    fn builder() -> ContextBuilder {
        ContextBuilder::from_config(&AppConfig::default())
    }

    #[test]
    fn plain_request_has_three_parts() {
        let request = ChatStreamRequest::new("What is UPI?")
            .with_history(vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")]);
        let payload = builder().build(&request).unwrap();

        assert!(payload.system_prompt.contains("TONE: Standard preset style and tone."));
        assert_eq!(payload.history.len(), 2);
        assert_eq!(payload.current_message.role, Role::User);
        assert_eq!(
            payload.current_message.content.text(),
            "\nUSER REQUEST: What is UPI?"
        );
        assert!(!payload.has_image());
    }

    #[test]
    fn into_messages_orders_system_history_current() {
        let request = ChatStreamRequest::new("now")
            .with_history(vec![ChatMessage::user("before")]);
        let messages = builder().build(&request).unwrap().into_messages();

        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::User]);
        assert_eq!(messages[1].content.text(), "before");
    }

    #[test]
    fn unknown_persona_uses_default_tone() {
        let request = ChatStreamRequest::new("x").with_persona("Pirate");
        let payload = builder().build(&request).unwrap();
        assert!(payload.system_prompt.contains("TONE: Standard preset style and tone."));
    }

    #[test]
    fn known_persona_tone_is_used() {
        let request = ChatStreamRequest::new("x").with_persona("Cynical");
        let payload = builder().build(&request).unwrap();
        assert!(payload.system_prompt.contains("TONE: Critical and sarcastic."));
    }

    #[test]
    fn document_text_precedes_user_request() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("todo.txt");
        std::fs::write(&path, "buy milk").unwrap();

        let request = ChatStreamRequest::new("summarise").with_document(&path);
        let payload = builder().build(&request).unwrap();
        assert_eq!(
            payload.current_message.content.text(),
            "\n--- File: todo.txt ---\nbuy milk\n\nUSER REQUEST: summarise"
        );
    }

    #[test]
    fn long_document_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.txt");
        std::fs::write(&path, "y".repeat(25_000)).unwrap();

        let request = ChatStreamRequest::new("q").with_document(&path);
        let text = builder().build(&request).unwrap().current_message.content.text();
        assert!(text.ends_with("\n... [Content Truncated] ...\nUSER REQUEST: q"));
        let marker_at = text.find("\n... [Content Truncated]").unwrap();
        assert_eq!(text[..marker_at].chars().count(), 20_000);
    }

    #[test]
    fn image_is_inlined_as_data_url() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("photo.png");
        std::fs::write(&path, [1u8, 2, 3]).unwrap();

        let request = ChatStreamRequest::new("what is this").with_image(&path);
        let payload = builder().build(&request).unwrap();
        assert!(payload.has_image());

        match &payload.current_message.content {
            MessageContent::Parts(parts) => match &parts[1] {
                ContentPart::ImageUrl { image_url } => {
                    assert_eq!(image_url.url, "data:image/png;base64,AQID");
                }
                other => panic!("Expected image part, got {other:?}"),
            },
            other => panic!("Expected parts, got {other:?}"),
        }
    }

    #[test]
    fn unknown_image_extension_falls_back_to_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.bin");
        std::fs::write(&path, [0u8]).unwrap();
        assert!(image_data_url(&path).unwrap().starts_with("data:image/jpeg;base64,"));
    }

    #[test]
    fn unreadable_image_is_an_error() {
        let request = ChatStreamRequest::new("x").with_image("/no/such/photo.jpg");
        assert!(matches!(
            builder().build(&request),
            Err(ContextError::Image { .. })
        ));
    }

    #[test]
    fn history_is_not_modified() {
        let history = vec![ChatMessage::user("one")];
        let request = ChatStreamRequest::new("two").with_history(history.clone());
        builder().build(&request).unwrap();
        assert_eq!(request.history, history);
    }
}
