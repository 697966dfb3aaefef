//! The streaming chat pipeline: build context, dispatch, relay.

use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use synapse_config::{AppConfig, ModelsConfig};
use synapse_core::provider::Provider;
use synapse_providers::{Dispatch, ModelDispatcher};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{info, warn};

use crate::context::ContextBuilder;
use crate::error::ContextError;
use crate::relay;
use crate::request::ChatStreamRequest;
use crate::stream_event::ChatStreamEvent;

/// The caller's end of one streaming answer.
///
/// Dropping it cancels the request: the relay stops and the model
/// connection is released.
#[derive(Debug)]
pub struct ChatStream {
    rx: mpsc::Receiver<ChatStreamEvent>,
}

impl ChatStream {
    pub fn from_receiver(rx: mpsc::Receiver<ChatStreamEvent>) -> Self {
        Self { rx }
    }

    /// Next event, or `None` once the stream has ended.
    pub async fn next_event(&mut self) -> Option<ChatStreamEvent> {
        self.rx.recv().await
    }

    /// Typed events as a `Stream`.
    pub fn into_events(self) -> ReceiverStream<ChatStreamEvent> {
        ReceiverStream::new(self.rx)
    }

    /// Plain-text fragments as a `Stream`, terminal events rendered inline.
    pub fn into_text_stream(self) -> impl Stream<Item = String> + Send + 'static {
        self.into_events().filter_map(ChatStreamEvent::text_fragment)
    }

    /// Drain the stream into one string.
    pub async fn collect_text(mut self) -> String {
        let mut text = String::new();
        while let Some(event) = self.next_event().await {
            if let Some(fragment) = event.text_fragment() {
                text.push_str(&fragment);
            }
        }
        text
    }
}

/// Runs chat requests end to end. Clone freely; requests share nothing
/// mutable.
#[derive(Clone)]
pub struct ChatPipeline {
    builder: ContextBuilder,
    dispatcher: ModelDispatcher,
    models: ModelsConfig,
}

impl ChatPipeline {
    pub fn new(builder: ContextBuilder, dispatcher: ModelDispatcher, models: ModelsConfig) -> Self {
        Self {
            builder,
            dispatcher,
            models,
        }
    }

    /// Wire a pipeline from configuration around an already-built provider.
    pub fn from_config(config: &AppConfig, provider: Arc<dyn Provider>) -> Self {
        let dispatcher = ModelDispatcher::new(provider)
            .with_submit_timeout(config.models.submit_timeout_secs.map(Duration::from_secs))
            .with_sampling(Some(config.default_temperature), config.default_max_tokens);
        Self::new(
            ContextBuilder::from_config(config),
            dispatcher,
            config.models.clone(),
        )
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        self.dispatcher.provider()
    }

    /// Start one streaming answer.
    ///
    /// Fails only when the context cannot be built. Model unavailability and
    /// mid-stream failures arrive as events on the returned stream.
    pub async fn start_chat_stream(
        &self,
        request: ChatStreamRequest,
    ) -> Result<ChatStream, ContextError> {
        let has_image = request.image_path.is_some();
        let fast_mode = request.fast_mode;

        let builder = self.builder.clone();
        let payload = tokio::task::spawn_blocking(move || builder.build(&request))
            .await
            .map_err(|e| ContextError::Join(e.to_string()))??;

        let candidates = self.models.select(has_image, fast_mode);
        info!(
            candidates = candidates.len(),
            has_image, fast_mode, "Starting chat stream"
        );

        match self.dispatcher.dispatch(payload.into_messages(), &candidates).await {
            Dispatch::Accepted { model, stream } => Ok(relay::spawn(stream, model)),
            Dispatch::Unavailable { failures } => {
                warn!(attempts = failures.len(), "No model accepted the request");
                Ok(relay::unavailable())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use synapse_core::error::ProviderError;
    use synapse_core::provider::{ProviderRequest, ProviderStream, StreamChunk};

    use crate::relay::UNAVAILABLE_MESSAGE;

    /// Accepts models not listed as failing and streams a fixed reply.
    struct FakeProvider {
        failing: Vec<String>,
        reply: Vec<&'static str>,
        requests: Mutex<Vec<ProviderRequest>>,
    }

    impl FakeProvider {
        fn new(failing: &[&str], reply: Vec<&'static str>) -> Self {
            Self {
                failing: failing.iter().map(|s| s.to_string()).collect(),
                reply,
                requests: Mutex::new(Vec::new()),
            }
        }

        fn models_tried(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|r| r.model.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Provider for FakeProvider {
        fn name(&self) -> &str {
            "fake"
        }

        async fn stream(&self, request: ProviderRequest) -> Result<ProviderStream, ProviderError> {
            let model = request.model.clone();
            self.requests.lock().unwrap().push(request);
            if self.failing.contains(&model) {
                return Err(ProviderError::ModelNotFound(model));
            }
            let (tx, rx) = mpsc::channel(self.reply.len() + 1);
            for piece in &self.reply {
                tx.try_send(Ok(StreamChunk::text(*piece))).unwrap();
            }
            tx.try_send(Ok(StreamChunk::finished(None))).unwrap();
            Ok(rx)
        }
    }

    fn config_with(vision: &[&str], fast: &[&str], quality: &[&str]) -> AppConfig {
        let mut config = AppConfig::default();
        config.models.vision = vision.iter().map(|s| s.to_string()).collect();
        config.models.fast = fast.iter().map(|s| s.to_string()).collect();
        config.models.quality = quality.iter().map(|s| s.to_string()).collect();
        config
    }

    #[tokio::test]
    async fn quality_chain_falls_back_and_streams() {
        let provider = Arc::new(FakeProvider::new(&["q1"], vec!["Hello", " world"]));
        let pipeline = ChatPipeline::from_config(&config_with(&["v"], &["f"], &["q1", "q2"]), provider.clone());

        let text = pipeline
            .start_chat_stream(ChatStreamRequest::new("hi"))
            .await
            .unwrap()
            .collect_text()
            .await;

        assert_eq!(text, "Hello world");
        assert_eq!(provider.models_tried(), vec!["q1", "q2"]);
    }

    #[tokio::test]
    async fn fast_mode_uses_fast_chain() {
        let provider = Arc::new(FakeProvider::new(&[], vec!["ok"]));
        let pipeline = ChatPipeline::from_config(&config_with(&["v"], &["f1"], &["q1"]), provider.clone());

        pipeline
            .start_chat_stream(ChatStreamRequest::new("hi").fast(true))
            .await
            .unwrap()
            .collect_text()
            .await;
        assert_eq!(provider.models_tried(), vec!["f1"]);
    }

    #[tokio::test]
    async fn image_uses_vision_chain_even_in_fast_mode() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cat.jpg");
        std::fs::write(&image, [0xffu8, 0xd8]).unwrap();

        let provider = Arc::new(FakeProvider::new(&[], vec!["a cat"]));
        let pipeline = ChatPipeline::from_config(&config_with(&["v1"], &["f1"], &["q1"]), provider.clone());

        let text = pipeline
            .start_chat_stream(ChatStreamRequest::new("what?").with_image(&image).fast(true))
            .await
            .unwrap()
            .collect_text()
            .await;

        assert_eq!(text, "a cat");
        assert_eq!(provider.models_tried(), vec!["v1"]);
        let sent = provider.requests.lock().unwrap()[0].messages.last().cloned().unwrap();
        assert!(sent.content.has_image());
    }

    #[tokio::test]
    async fn all_models_failing_yields_single_message() {
        let provider = Arc::new(FakeProvider::new(&["q1", "q2"], vec![]));
        let pipeline = ChatPipeline::from_config(&config_with(&["v"], &["f"], &["q1", "q2"]), provider);

        let chunks: Vec<String> = pipeline
            .start_chat_stream(ChatStreamRequest::new("hi"))
            .await
            .unwrap()
            .into_text_stream()
            .collect()
            .await;
        assert_eq!(chunks, vec![UNAVAILABLE_MESSAGE.to_string()]);
    }

    #[tokio::test]
    async fn done_event_names_the_model() {
        let provider = Arc::new(FakeProvider::new(&[], vec!["x"]));
        let pipeline = ChatPipeline::from_config(&config_with(&["v"], &["f"], &["q"]), provider);

        let mut stream = pipeline
            .start_chat_stream(ChatStreamRequest::new("hi"))
            .await
            .unwrap();
        assert_eq!(
            stream.next_event().await,
            Some(ChatStreamEvent::Fragment { content: "x".into() })
        );
        assert_eq!(
            stream.next_event().await,
            Some(ChatStreamEvent::Done { model: "q".into() })
        );
        assert_eq!(stream.next_event().await, None);
    }

    #[tokio::test]
    async fn missing_image_fails_before_dispatch() {
        let provider = Arc::new(FakeProvider::new(&[], vec!["x"]));
        let pipeline = ChatPipeline::from_config(&AppConfig::default(), provider.clone());

        let result = pipeline
            .start_chat_stream(ChatStreamRequest::new("hi").with_image("/nope/img.png"))
            .await;
        assert!(matches!(result, Err(ContextError::Image { .. })));
        assert!(provider.models_tried().is_empty());
    }

    #[tokio::test]
    async fn system_prompt_comes_first() {
        let provider = Arc::new(FakeProvider::new(&[], vec!["x"]));
        let pipeline = ChatPipeline::from_config(&config_with(&["v"], &["f"], &["q"]), provider.clone());

        pipeline
            .start_chat_stream(ChatStreamRequest::new("hi").with_language("hi"))
            .await
            .unwrap()
            .collect_text()
            .await;

        let requests = provider.requests.lock().unwrap();
        let system = &requests[0].messages[0];
        assert!(system.content.text().contains("Respond in Hindi."));
    }
}
