//! Batch progress events
//!
//! Streamed to the client as newline-delimited JSON while a batch runs.

use serde::{Deserialize, Serialize};

/// Status class of a progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    /// Sentinel emitted before any instance reports
    Starting,
    /// 2xx response
    Ok,
    /// 3xx response, non-fatal
    Warning,
    /// Transport failure, 4xx or 5xx response
    Error,
    /// Sentinel emitted after the last instance reported
    Complete,
    /// Terminal verdict: the whole operation succeeded
    Success,
    /// Terminal verdict: the whole operation failed
    Failure,
}

impl ProgressStatus {
    /// Whether an instance may continue with its next step
    pub fn is_success(self) -> bool {
        matches!(self, ProgressStatus::Ok | ProgressStatus::Warning)
    }
}

/// A single progress line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: ProgressStatus,
    pub message: String,
    pub code: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    pub item: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn starting(message: impl Into<String>, total: usize) -> Self {
        Self {
            status: ProgressStatus::Starting,
            message: message.into(),
            code: 0,
            instance: None,
            item: 0,
            total,
        }
    }

    pub fn complete(message: impl Into<String>, total: usize) -> Self {
        Self {
            status: ProgressStatus::Complete,
            message: message.into(),
            code: 0,
            instance: None,
            item: total,
            total,
        }
    }

    /// Final verdict of an orchestration, always the last line of a stream
    pub fn verdict(success: bool, code: u16, message: impl Into<String>) -> Self {
        Self {
            status: if success {
                ProgressStatus::Success
            } else {
                ProgressStatus::Failure
            },
            message: message.into(),
            code,
            instance: None,
            item: 0,
            total: 0,
        }
    }

    pub fn is_verdict(&self) -> bool {
        matches!(
            self.status,
            ProgressStatus::Success | ProgressStatus::Failure
        )
    }
}
