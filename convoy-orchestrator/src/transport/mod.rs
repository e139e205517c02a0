//! Transport Module
//!
//! Issues batch steps against Docker hosts. Every request is routed through
//! a [`TargetResolver`] first so instances behind a beacon receive the
//! beacon's address and token instead of a direct connection.

pub mod beacon;
pub mod docker;
#[cfg(test)]
pub mod mock;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::batch::Step;
pub use beacon::{DirectResolver, StaticBeaconResolver, Target, TargetResolver};

/// Transport error type
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid instance address `{0}`")]
    InvalidAddress(String),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Status and message returned by a Docker host for one step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub message: String,
}

/// Sends a single batch step to a single instance
#[async_trait]
pub trait InstanceTransport: Send + Sync {
    async fn send(&self, instance: &str, step: &Step) -> Result<TransportResponse, TransportError>;
}

/// reqwest-backed transport talking to the Docker Engine API
pub struct HttpTransport {
    client: Client,
    resolver: Arc<dyn TargetResolver>,
    api_version: Option<String>,
    token_header: String,
}

impl HttpTransport {
    /// Create a transport whose every request is bounded by `timeout`
    pub fn new(
        timeout: Duration,
        resolver: Arc<dyn TargetResolver>,
        api_version: Option<String>,
        token_header: impl Into<String>,
    ) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            resolver,
            api_version,
            token_header: token_header.into(),
        })
    }

    fn url(&self, target: &Target, step: &Step) -> String {
        match &self.api_version {
            Some(version) => format!("{}/{}/{}", target.address, version, step.path),
            None => format!("{}/{}", target.address, step.path),
        }
    }
}

#[async_trait]
impl InstanceTransport for HttpTransport {
    async fn send(&self, instance: &str, step: &Step) -> Result<TransportResponse, TransportError> {
        let target = self.resolver.resolve(instance).await?;
        let url = self.url(&target, step);
        tracing::debug!("{} {} (proxied: {})", step.method, url, target.proxied);

        let mut request = self
            .client
            .request(step.method.clone(), &url)
            .query(&step.query);

        if let Some(body) = &step.body {
            request = request.json(body);
        }

        if target.proxied {
            if let Some(token) = &target.token {
                request = request.header(self.token_header.as_str(), token);
            }
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        Ok(TransportResponse {
            status: status.as_u16(),
            message: docker_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string()),
        })
    }
}

/// Extract the `message` field Docker puts in error bodies
fn docker_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("message")?
        .as_str()
        .map(str::to_string)
}
