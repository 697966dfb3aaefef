//! # Synapse Core
//!
//! Domain types, traits, and error definitions for the Synapse chat backend.
//! This crate has **no framework dependencies**: it defines the model that the
//! provider, engine, storage and gateway crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: a hosted LLM endpoint that can stream a completion
//! - [`InteractionStore`]: persistence of finished prompt/response pairs
//!
//! Implementations live in their own crates, so the pipeline can be exercised
//! with fake backends in tests.

pub mod error;
pub mod interaction;
pub mod message;
pub mod provider;

// Re-export key types at crate root for ergonomics
pub use error::{ProviderError, StoreError};
pub use interaction::{Interaction, InteractionStore, InteractionUpdate, NewInteraction};
pub use message::{ChatMessage, ContentPart, ImageUrl, MessageContent, Role};
pub use provider::{Provider, ProviderRequest, ProviderStream, StreamChunk, Usage};
