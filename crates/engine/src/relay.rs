//! Stream relay: forwards accepted model output to the caller.
//!
//! The relay owns the upstream receiver. It reads one chunk, hands the
//! fragment to the caller over a capacity-1 channel, then reads the next;
//! at most one fragment is ever in flight. When the caller goes away the
//! relay stops at once and drops the upstream, which in turn stops the
//! provider's reader task.

use synapse_core::provider::ProviderStream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::pipeline::ChatStream;
use crate::stream_event::ChatStreamEvent;

/// Sole output when no candidate model accepted the request.
pub const UNAVAILABLE_MESSAGE: &str =
    "Error: All models are currently unavailable. Please try again later.";

/// Start relaying `upstream` from `model` on a background task.
pub fn spawn(upstream: ProviderStream, model: String) -> ChatStream {
    let (tx, rx) = mpsc::channel(1);
    tokio::spawn(forward(upstream, model, tx));
    ChatStream::from_receiver(rx)
}

/// A stream holding exactly one `Unavailable` event.
pub fn unavailable() -> ChatStream {
    let (tx, rx) = mpsc::channel(1);
    // A fresh capacity-1 channel always has room for the first event.
    let _ = tx.try_send(ChatStreamEvent::Unavailable {
        message: UNAVAILABLE_MESSAGE.into(),
    });
    ChatStream::from_receiver(rx)
}

/// Pump `upstream` into `tx` until it ends, fails, or the caller leaves.
pub async fn forward(
    mut upstream: ProviderStream,
    model: String,
    tx: mpsc::Sender<ChatStreamEvent>,
) {
    let mut fragments = 0usize;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(model = %model, fragments, "Relay: caller disconnected");
                return;
            }
            next = upstream.recv() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let done = chunk.done;
                if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                    if tx.send(ChatStreamEvent::Fragment { content }).await.is_err() {
                        debug!(model = %model, fragments, "Relay: caller disconnected");
                        return;
                    }
                    fragments += 1;
                }
                if done {
                    break;
                }
            }
            Some(Err(e)) => {
                warn!(model = %model, fragments, error = %e, "Relay: stream interrupted");
                let _ = tx
                    .send(ChatStreamEvent::Interrupted {
                        message: e.to_string(),
                    })
                    .await;
                return;
            }
            None => break,
        }
    }

    info!(model = %model, fragments, "Relay: stream complete");
    let _ = tx.send(ChatStreamEvent::Done { model }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use synapse_core::error::ProviderError;
    use synapse_core::provider::StreamChunk;

    fn upstream(chunks: Vec<Result<StreamChunk, ProviderError>>) -> ProviderStream {
        let (tx, rx) = mpsc::channel(chunks.len().max(1));
        for chunk in chunks {
            tx.try_send(chunk).unwrap();
        }
        rx
    }

    async fn drain(mut stream: ChatStream) -> Vec<ChatStreamEvent> {
        let mut events = Vec::new();
        while let Some(event) = stream.next_event().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn fragments_then_done() {
        let stream = spawn(
            upstream(vec![
                Ok(StreamChunk::text("Hel")),
                Ok(StreamChunk::text("lo")),
                Ok(StreamChunk::finished(None)),
            ]),
            "m1".into(),
        );

        assert_eq!(
            drain(stream).await,
            vec![
                ChatStreamEvent::Fragment { content: "Hel".into() },
                ChatStreamEvent::Fragment { content: "lo".into() },
                ChatStreamEvent::Done { model: "m1".into() },
            ]
        );
    }

    #[tokio::test]
    async fn empty_fragments_are_skipped() {
        let stream = spawn(
            upstream(vec![
                Ok(StreamChunk::text("")),
                Ok(StreamChunk::default()),
                Ok(StreamChunk::text("x")),
            ]),
            "m".into(),
        );

        assert_eq!(
            drain(stream).await,
            vec![
                ChatStreamEvent::Fragment { content: "x".into() },
                ChatStreamEvent::Done { model: "m".into() },
            ]
        );
    }

    #[tokio::test]
    async fn upstream_closing_without_marker_is_done() {
        let stream = spawn(upstream(vec![Ok(StreamChunk::text("a"))]), "m".into());
        let events = drain(stream).await;
        assert_eq!(events.last(), Some(&ChatStreamEvent::Done { model: "m".into() }));
    }

    #[tokio::test]
    async fn mid_stream_error_keeps_partial_output() {
        let stream = spawn(
            upstream(vec![
                Ok(StreamChunk::text("Hel")),
                Err(ProviderError::StreamInterrupted("connection reset".into())),
                Ok(StreamChunk::text("never")),
            ]),
            "m".into(),
        );

        let events = drain(stream).await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], ChatStreamEvent::Fragment { content: "Hel".into() });
        assert!(matches!(events[1], ChatStreamEvent::Interrupted { .. }));
    }

    #[tokio::test]
    async fn unavailable_is_a_single_event() {
        let events = drain(unavailable()).await;
        assert_eq!(
            events,
            vec![ChatStreamEvent::Unavailable {
                message: UNAVAILABLE_MESSAGE.into()
            }]
        );
    }

    #[tokio::test]
    async fn caller_drop_releases_upstream() {
        let (up_tx, up_rx) = mpsc::channel(1);
        let stream = spawn(up_rx, "m".into());
        up_tx.send(Ok(StreamChunk::text("first"))).await.unwrap();

        drop(stream);

        // The relay drops its receiver once it notices the caller is gone.
        tokio::time::timeout(Duration::from_secs(1), up_tx.closed())
            .await
            .expect("upstream should be released after caller drop");
    }
}
