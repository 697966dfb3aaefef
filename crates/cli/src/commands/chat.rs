//! `synapse chat`: One question, answer streamed to stdout.

use std::io::{self, Write};
use std::path::PathBuf;

use synapse_config::{AppConfig, DEFAULT_PERSONA};
use synapse_core::interaction::{InteractionStore, NewInteraction};
use synapse_engine::{ChatPipeline, ChatStream, ChatStreamEvent, ChatStreamRequest, LOCATION_UNKNOWN};
use tracing::{debug, warn};

pub struct ChatArgs {
    pub text: String,
    pub fast: bool,
    pub persona: Option<String>,
    pub lang: String,
    pub location: Option<String>,
    pub image: Option<PathBuf>,
    pub document: Option<PathBuf>,
    pub save: bool,
}

impl ChatArgs {
    fn into_request(self) -> ChatStreamRequest {
        let mut request = ChatStreamRequest::new(self.text)
            .with_language(self.lang)
            .with_persona(self.persona.unwrap_or_else(|| DEFAULT_PERSONA.into()))
            .with_location(self.location.unwrap_or_else(|| LOCATION_UNKNOWN.into()))
            .fast(self.fast);
        if let Some(image) = self.image {
            request = request.with_image(image);
        }
        if let Some(document) = self.document {
            request = request.with_document(document);
        }
        request
    }
}

/// What came out of one streamed answer.
#[derive(Debug, Default, PartialEq)]
pub struct Transcript {
    /// Model fragments only, without terminal markers.
    pub answer: String,
    /// The model finished normally.
    pub completed: bool,
}

pub async fn run(args: ChatArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    super::require_api_key(&config)?;

    let save = args.save && config.storage.auto_save;
    let image = args.image.as_ref().map(|p| p.display().to_string());
    let user_text = args.text.clone();

    let provider = synapse_providers::build_from_config(&config);
    let pipeline = ChatPipeline::from_config(&config, provider);
    let stream = pipeline
        .start_chat_stream(args.into_request())
        .await
        .map_err(|e| format!("Could not prepare request: {e}"))?;

    let transcript = print_stream(stream, &mut io::stdout().lock()).await?;

    if save && transcript.completed {
        let store = synapse_memory::open_store(&config.storage).await?;
        let id = store
            .save(NewInteraction::new(user_text, transcript.answer).with_image_path(image))
            .await?;
        debug!(id, "Interaction saved");
    } else if !transcript.completed {
        warn!("Answer did not complete; not saved");
    }

    Ok(())
}

/// Write each fragment to `out` as it arrives.
pub async fn print_stream<W: Write>(mut stream: ChatStream, out: &mut W) -> io::Result<Transcript> {
    let mut transcript = Transcript::default();

    while let Some(event) = stream.next_event().await {
        match &event {
            ChatStreamEvent::Fragment { content } => transcript.answer.push_str(content),
            ChatStreamEvent::Done { .. } => transcript.completed = true,
            _ => {}
        }
        if let Some(text) = event.text_fragment() {
            out.write_all(text.as_bytes())?;
            out.flush()?;
        }
    }
    writeln!(out)?;

    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn stream_of(events: Vec<ChatStreamEvent>) -> ChatStream {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            tx.try_send(event).unwrap();
        }
        ChatStream::from_receiver(rx)
    }

    #[tokio::test]
    async fn prints_fragments_and_marks_completion() {
        let stream = stream_of(vec![
            ChatStreamEvent::Fragment { content: "Namaste".into() },
            ChatStreamEvent::Fragment { content: "!".into() },
            ChatStreamEvent::Done { model: "m".into() },
        ]);
        let mut out = Vec::new();
        let transcript = print_stream(stream, &mut out).await.unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), "Namaste!\n");
        assert_eq!(transcript.answer, "Namaste!");
        assert!(transcript.completed);
    }

    #[tokio::test]
    async fn interruption_is_shown_but_not_recorded() {
        let stream = stream_of(vec![
            ChatStreamEvent::Fragment { content: "part".into() },
            ChatStreamEvent::Interrupted { message: "reset".into() },
        ]);
        let mut out = Vec::new();
        let transcript = print_stream(stream, &mut out).await.unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "part\n[Response interrupted: reset]\n"
        );
        assert_eq!(transcript.answer, "part");
        assert!(!transcript.completed);
    }

    #[test]
    fn args_fill_defaults() {
        let args = ChatArgs {
            text: "hello".into(),
            fast: true,
            persona: None,
            lang: "ta".into(),
            location: None,
            image: None,
            document: Some(PathBuf::from("notes.txt")),
            save: true,
        };
        let request = args.into_request();
        assert_eq!(request.persona, DEFAULT_PERSONA);
        assert_eq!(request.location, LOCATION_UNKNOWN);
        assert_eq!(request.language_code, "ta");
        assert!(request.fast_mode);
        assert_eq!(request.document_path, Some(PathBuf::from("notes.txt")));
    }
}
