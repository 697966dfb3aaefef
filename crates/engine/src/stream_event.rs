//! Caller-facing streaming events.
//!
//! `ChatStreamEvent` wraps provider-level chunks into the events a caller
//! sees. The gateway forwards them as typed SSE events, or flattens them
//! into a plain text stream with [`ChatStreamEvent::text_fragment`].
//!
//! - `fragment`:    one non-empty piece of model output
//! - `unavailable`: every candidate model refused the request
//! - `interrupted`: the accepted stream failed part-way
//! - `done`:        the model finished normally

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatStreamEvent {
    /// Partial text from the model.
    Fragment { content: String },

    /// No candidate accepted the request. Always the only event of its stream.
    Unavailable { message: String },

    /// The stream failed after output had begun; earlier fragments stand.
    Interrupted { message: String },

    /// The stream completed normally.
    Done { model: String },
}

impl ChatStreamEvent {
    /// SSE event name for this event type.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Fragment { .. } => "fragment",
            Self::Unavailable { .. } => "unavailable",
            Self::Interrupted { .. } => "interrupted",
            Self::Done { .. } => "done",
        }
    }

    /// Text rendering for plain-text transports. `Done` renders as nothing.
    pub fn text_fragment(self) -> Option<String> {
        match self {
            Self::Fragment { content } => Some(content),
            Self::Unavailable { message } => Some(message),
            Self::Interrupted { message } => Some(format!("\n[Response interrupted: {message}]")),
            Self::Done { .. } => None,
        }
    }
}
