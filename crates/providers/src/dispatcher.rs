//! Model fallback dispatcher: ordered, strictly sequential trial of candidates.
//!
//! Each request walks the candidate list from the top. The first candidate
//! whose streaming submission is accepted wins and no later candidate is
//! attempted. There are no retries, no backoff and no memory across requests.

use std::sync::Arc;
use std::time::Duration;

use synapse_config::ModelCandidate;
use synapse_core::error::ProviderError;
use synapse_core::message::ChatMessage;
use synapse_core::provider::{Provider, ProviderRequest, ProviderStream};
use tracing::{info, warn};

/// One candidate that refused the request.
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub model: String,
    pub error: ProviderError,
}

/// Outcome of walking the fallback chain.
pub enum Dispatch {
    /// A candidate accepted the request; its stream may still fail later.
    Accepted { model: String, stream: ProviderStream },
    /// Every candidate failed at submission.
    Unavailable { failures: Vec<FailedAttempt> },
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Accepted { model, .. } => {
                f.debug_struct("Accepted").field("model", model).finish()
            }
            Dispatch::Unavailable { failures } => f
                .debug_struct("Unavailable")
                .field("failures", failures)
                .finish(),
        }
    }
}

/// Walks a model fallback chain against a single provider client.
#[derive(Clone)]
pub struct ModelDispatcher {
    provider: Arc<dyn Provider>,
    submit_timeout: Option<Duration>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

impl ModelDispatcher {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self {
            provider,
            submit_timeout: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Bound how long a single submission may take before moving on.
    pub fn with_submit_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.submit_timeout = timeout;
        self
    }

    pub fn with_sampling(mut self, temperature: Option<f32>, max_tokens: Option<u32>) -> Self {
        self.temperature = temperature;
        self.max_tokens = max_tokens;
        self
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    /// Try each candidate in order until one accepts the streaming request.
    pub async fn dispatch(
        &self,
        messages: Vec<ChatMessage>,
        candidates: &[ModelCandidate],
    ) -> Dispatch {
        let mut request = ProviderRequest::new("", messages);
        request.temperature = self.temperature;
        request.max_tokens = self.max_tokens;

        let mut failures = Vec::new();

        for (i, candidate) in candidates.iter().enumerate() {
            let model = candidate.identifier.as_str();

            info!(
                provider = %self.provider.name(),
                model = %model,
                attempt = i + 1,
                total = candidates.len(),
                "Dispatch: trying model"
            );

            let submission = self.provider.stream(request.for_model(model));
            let outcome = match self.submit_timeout {
                Some(limit) => match tokio::time::timeout(limit, submission).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderError::Timeout(format!(
                        "Model '{model}' did not accept the request within {}s",
                        limit.as_secs()
                    ))),
                },
                None => submission.await,
            };

            match outcome {
                Ok(stream) => {
                    info!(model = %model, "Dispatch: model accepted request");
                    return Dispatch::Accepted {
                        model: model.to_string(),
                        stream,
                    };
                }
                Err(e) => {
                    warn!(
                        model = %model,
                        error = %e,
                        "Dispatch: model failed, trying next"
                    );
                    failures.push(FailedAttempt {
                        model: model.to_string(),
                        error: e,
                    });
                }
            }
        }

        warn!(
            attempts = failures.len(),
            "Dispatch: every candidate model failed"
        );
        Dispatch::Unavailable { failures }
    }
}
