//! Progress sink
//!
//! Owned channel carrying progress events from the batch processor to the
//! single writer that serializes them onto the HTTP response.

use convoy_core::domain::progress::ProgressEvent;
use tokio::sync::mpsc;

/// Sending half of a progress stream
#[derive(Debug, Clone)]
pub struct ProgressSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ProgressSink {
    /// Create a sink and the receiver its events are drained from
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Forward an event; a disconnected client never interrupts an orchestration
    pub fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("Progress receiver dropped, discarding event");
        }
    }
}
