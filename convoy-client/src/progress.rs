//! Progress stream decoding
//!
//! Orchestrations answer with newline-delimited JSON. Chunks arrive at
//! arbitrary boundaries, so bytes are buffered until a full line is seen.

use convoy_core::domain::progress::ProgressEvent;

use crate::error::{ClientError, Result};

/// Incremental decoder for a newline-delimited progress body
#[derive(Debug, Default)]
pub struct LineDecoder {
    buffer: Vec<u8>,
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<ProgressEvent>> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=end).collect();
            if let Some(event) = decode(&line)? {
                events.push(event);
            }
        }

        Ok(events)
    }

    /// Decode whatever is left once the body ended
    pub fn finish(self) -> Result<Option<ProgressEvent>> {
        decode(&self.buffer)
    }
}

fn decode(line: &[u8]) -> Result<Option<ProgressEvent>> {
    let line = line.trim_ascii();
    if line.is_empty() {
        return Ok(None);
    }

    serde_json::from_slice(line)
        .map(Some)
        .map_err(|e| ClientError::ParseError(format!("Invalid progress line: {}", e)))
}
