//! Streamed progress responses
//!
//! Long-running orchestrations answer with a newline-delimited JSON body.
//! The orchestration runs on its own task and feeds a [`ProgressSink`]; the
//! response body is the only reader. The last line is always a verdict event.

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use convoy_core::domain::progress::ProgressEvent;
use std::future::Future;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::api::error::status_for;
use crate::batch::ProgressSink;
use crate::service;

pub const NDJSON: &str = "application/x-ndjson";

/// Run `orchestration` in the background and stream its progress
///
/// A disconnecting client does not cancel the orchestration.
pub fn stream_progress<F, Fut>(orchestration: F) -> Response
where
    F: FnOnce(ProgressSink) -> Fut,
    Fut: Future<Output = service::Result<String>> + Send + 'static,
{
    let (sink, rx) = ProgressSink::channel();
    let task = orchestration(sink.clone());

    tokio::spawn(async move {
        let verdict = match task.await {
            Ok(message) => ProgressEvent::verdict(true, StatusCode::OK.as_u16(), message),
            Err(e) => {
                tracing::error!("Orchestration failed: {}", e);
                ProgressEvent::verdict(false, status_for(&e).as_u16(), e.to_string())
            }
        };
        sink.send(verdict);
    });

    let lines = UnboundedReceiverStream::new(rx).map(|event| {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        Ok::<_, serde_json::Error>(line)
    });

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, NDJSON)],
        Body::from_stream(lines),
    )
        .into_response()
}
