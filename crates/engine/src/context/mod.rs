//! Context building: turns a chat request into the model payload.
//!
//! | Part | Source |
//! |------|--------|
//! | System prompt | assistant identity, persona tone, language, location |
//! | History | caller-supplied turns, unchanged |
//! | Current turn | extracted document text + user request, optional image |

pub mod builder;
pub mod document;
pub mod prompt;

pub use builder::{ContextBuilder, RequestPayload};
pub use document::{document_context, truncate_context};
pub use prompt::system_prompt;
