//! Inbound chat request.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use synapse_config::DEFAULT_PERSONA;
use synapse_core::message::ChatMessage;

/// Location value meaning "no location known"; omitted from the prompt.
pub const LOCATION_UNKNOWN: &str = "Unknown";

/// Everything needed to run one streaming chat turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatStreamRequest {
    pub user_text: String,

    #[serde(default = "default_language")]
    pub language_code: String,

    /// Prior turns, oldest first. Never mutated by the engine.
    #[serde(default)]
    pub history: Vec<ChatMessage>,

    #[serde(default)]
    pub image_path: Option<PathBuf>,

    #[serde(default)]
    pub document_path: Option<PathBuf>,

    #[serde(default)]
    pub fast_mode: bool,

    #[serde(default = "default_persona")]
    pub persona: String,

    #[serde(default = "default_location")]
    pub location: String,
}

fn default_language() -> String {
    "en".into()
}

fn default_persona() -> String {
    DEFAULT_PERSONA.into()
}

fn default_location() -> String {
    LOCATION_UNKNOWN.into()
}

impl ChatStreamRequest {
    pub fn new(user_text: impl Into<String>) -> Self {
        Self {
            user_text: user_text.into(),
            language_code: default_language(),
            history: Vec::new(),
            image_path: None,
            document_path: None,
            fast_mode: false,
            persona: default_persona(),
            location: default_location(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = Some(path.into());
        self
    }

    pub fn with_document(mut self, path: impl Into<PathBuf>) -> Self {
        self.document_path = Some(path.into());
        self
    }

    pub fn with_language(mut self, code: impl Into<String>) -> Self {
        self.language_code = code.into();
        self
    }

    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = persona.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn fast(mut self, fast_mode: bool) -> Self {
        self.fast_mode = fast_mode;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_from_minimal_json() {
        let req: ChatStreamRequest = serde_json::from_str(r#"{"user_text":"hi"}"#).unwrap();
        assert_eq!(req.language_code, "en");
        assert_eq!(req.persona, "Default");
        assert_eq!(req.location, LOCATION_UNKNOWN);
        assert!(!req.fast_mode);
        assert!(req.history.is_empty());
        assert!(req.image_path.is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let req = ChatStreamRequest::new("hello")
            .with_language("hi")
            .with_persona("Teacher")
            .with_location("Pune")
            .with_document("/tmp/a.txt")
            .fast(true);
        assert_eq!(req.language_code, "hi");
        assert_eq!(req.persona, "Teacher");
        assert_eq!(req.location, "Pune");
        assert_eq!(req.document_path, Some(PathBuf::from("/tmp/a.txt")));
        assert!(req.fast_mode);
    }
}
