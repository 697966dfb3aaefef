//! Streaming chat orchestration: the core of Synapse.
//!
//! One request flows strictly in sequence:
//!
//! 1. **Build context**: system prompt (persona, locale, language), caller
//!    history, and a user turn carrying extracted document text and an
//!    optional inline image
//! 2. **Dispatch**: try the selected model candidates in order until one
//!    accepts the streaming request
//! 3. **Relay**: forward each content fragment to the caller as it arrives,
//!    ending with a typed terminal event
//!
//! Persistence is the caller's job once the stream has finished.

pub mod context;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod relay;
pub mod request;
pub mod stream_event;

pub use context::{ContextBuilder, RequestPayload};
pub use error::{ContextError, ExtractError};
pub use extract::{DocumentExtractor, FileExtractor};
pub use pipeline::{ChatPipeline, ChatStream};
pub use relay::UNAVAILABLE_MESSAGE;
pub use request::{ChatStreamRequest, LOCATION_UNKNOWN};
pub use stream_event::ChatStreamEvent;
