//! One-shot consumer for a job's progress stream.
//!
//! [`EventStreamConsumer`] owns a background task that reads the
//! transport, splits it into SSE messages, decodes each into a
//! [`Frame`](vistral_core::Frame) and folds it into a [`StreamState`].
//! Observers only ever see snapshots through a `watch` channel.
//!
//! The channel is closed (transport dropped, task exited) on the first
//! of: a terminal event, a transport failure, [`close`](EventStreamConsumer::close),
//! or dropping the consumer. No reconnect is attempted.

use std::fmt::Display;
use std::sync::Arc;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use vistral_core::{parse_frame, PipelineEvent};

use crate::client::StreamClient;
use crate::sse::SseDecoder;
use crate::state::{Applied, StreamState};

/// Label used in logs for streams not opened from a URL.
const IN_MEMORY_SOURCE: &str = "in-memory";

pub struct EventStreamConsumer {
    state: Arc<watch::Sender<StreamState>>,
    /// Owner-side close request.
    cancel: CancellationToken,
    /// Cancelled by the task once the transport has been dropped.
    finished: CancellationToken,
}

impl EventStreamConsumer {
    /// Open `client`'s endpoint and start consuming it.
    ///
    /// Must be called from within a Tokio runtime. A failure to open the
    /// stream ends in the same `"Connection lost"` state as a transport
    /// failure mid-stream.
    pub fn connect(client: StreamClient) -> Self {
        let consumer = Self::idle();
        let state = Arc::clone(&consumer.state);
        let cancel = consumer.cancel.clone();
        let finished = consumer.finished.clone();

        tokio::spawn(async move {
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = client.connect() => Some(result),
            };

            match opened {
                Some(Ok(conn)) => run(conn.body, &state, &cancel, &conn.url).await,
                Some(Err(e)) => {
                    tracing::warn!(url = %client.url(), error = %e, "Failed to open event stream");
                    state.send_if_modified(StreamState::fail_transport);
                    tracing::debug!(url = %client.url(), "Event stream closed");
                }
                None => tracing::debug!(url = %client.url(), "Event stream closed before opening"),
            }
            finished.cancel();
        });

        consumer
    }

    /// Consume an already-open byte stream.
    ///
    /// Used for transports other than HTTP and by tests. Must be called
    /// from within a Tokio runtime.
    pub fn from_stream<S, E>(body: S) -> Self
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let consumer = Self::idle();
        let state = Arc::clone(&consumer.state);
        let cancel = consumer.cancel.clone();
        let finished = consumer.finished.clone();

        tokio::spawn(async move {
            run(body, &state, &cancel, IN_MEMORY_SOURCE).await;
            finished.cancel();
        });

        consumer
    }

    fn idle() -> Self {
        let (state, _) = watch::channel(StreamState::default());
        Self {
            state: Arc::new(state),
            cancel: CancellationToken::new(),
            finished: CancellationToken::new(),
        }
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> StreamState {
        self.state.borrow().clone()
    }

    /// Receive a notification for every visible state change.
    pub fn subscribe(&self) -> watch::Receiver<StreamState> {
        self.state.subscribe()
    }

    /// Significant events so far, in arrival order.
    pub fn events(&self) -> Vec<PipelineEvent> {
        self.state.borrow().events().to_vec()
    }

    /// Latest event of any kind except heartbeats.
    pub fn latest(&self) -> Option<PipelineEvent> {
        self.state.borrow().latest().cloned()
    }

    pub fn is_complete(&self) -> bool {
        self.state.borrow().is_complete()
    }

    pub fn error(&self) -> Option<String> {
        self.state.borrow().error().map(str::to_owned)
    }

    /// Clear accumulated state without touching the transport.
    pub fn reset(&self) {
        self.state.send_modify(StreamState::reset);
    }

    /// Close the channel. Idempotent.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// `true` once the channel is closed or closing.
    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.finished.is_cancelled()
    }

    /// Wait until the transport has been released.
    pub async fn closed(&self) {
        self.finished.cancelled().await;
    }
}

impl Drop for EventStreamConsumer {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Read `body` until a terminal event, a transport failure, or
/// cancellation. The body is dropped on return.
async fn run<S, E>(
    body: S,
    state: &watch::Sender<StreamState>,
    cancel: &CancellationToken,
    source: &str,
) where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut body = std::pin::pin!(body);
    let mut decoder = SseDecoder::new();

    let reason = 'read: loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => break 'read "closed by owner",
            chunk = body.next() => chunk,
        };

        match chunk {
            Some(Ok(bytes)) => {
                for message in decoder.feed(&bytes) {
                    if cancel.is_cancelled() {
                        break 'read "closed by owner";
                    }
                    if handle_message(state, &message, source) == Applied::Terminated {
                        break 'read "terminal event";
                    }
                }
            }
            Some(Err(e)) => {
                tracing::warn!(source, error = %e, "Event stream transport error");
                state.send_if_modified(StreamState::fail_transport);
                break 'read "transport error";
            }
            None => {
                if state.send_if_modified(StreamState::fail_transport) {
                    tracing::warn!(source, "Event stream ended without a terminal event");
                }
                break 'read "end of stream";
            }
        }
    };

    tracing::debug!(source, reason, "Event stream closed");
}

/// Decode one SSE message and apply it.
fn handle_message(state: &watch::Sender<StreamState>, raw: &str, source: &str) -> Applied {
    let frame = match parse_frame(raw) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::warn!(
                source,
                error = %e,
                raw_message = %raw,
                "Dropping malformed stream frame",
            );
            return Applied::Ignored;
        }
    };

    let mut applied = Applied::Ignored;
    state.send_if_modified(|s| {
        applied = s.apply(frame);
        applied.is_visible()
    });

    let current = state.borrow();
    if let Some(ev) = current.latest() {
        match applied {
            Applied::Logged => tracing::info!(
                source,
                step = %ev.step,
                progress = ev.progress,
                message = %ev.message,
                "Pipeline step",
            ),
            Applied::Updated => tracing::trace!(
                source,
                step = %ev.step,
                progress = ev.progress,
                "Pipeline ticker",
            ),
            Applied::Terminated if current.is_complete() => {
                tracing::info!(source, "Pipeline complete")
            }
            Applied::Terminated => tracing::warn!(
                source,
                error = current.error().unwrap_or_default(),
                "Pipeline reported an error",
            ),
            Applied::Ignored => {}
        }
    }

    applied
}
