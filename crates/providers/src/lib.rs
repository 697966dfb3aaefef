//! LLM provider implementations for Synapse.
//!
//! All providers implement the `synapse_core::Provider` trait.
//! The router builds the configured provider once; the dispatcher walks a
//! model fallback chain against it.

pub mod dispatcher;
pub mod openai_compat;
pub mod router;

pub use dispatcher::{Dispatch, FailedAttempt, ModelDispatcher};
pub use openai_compat::OpenAiCompatProvider;
pub use router::{build_from_config, default_base_url};
