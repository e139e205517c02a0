//! Convoy HTTP Client
//!
//! Type-safe client for the Convoy control-plane API, used by the CLI.
//!
//! # Example
//!
//! ```no_run
//! use convoy_client::ConvoyClient;
//!
//! #[tokio::main]
//! async fn main() -> convoy_client::Result<()> {
//!     let client = ConvoyClient::new("http://localhost:8080", "dev@example.com");
//!
//!     for app in client.list_applications().await? {
//!         println!("{} on {} instance(s)", app.name, app.instances.len());
//!     }
//!     Ok(())
//! }
//! ```

mod applications;
pub mod error;
pub mod progress;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use progress::LineDecoder;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// Header the orchestrator reads the caller's identity from by default
pub const DEFAULT_USER_HEADER: &str = "x-forwarded-email";

/// HTTP client for the Convoy orchestrator API
#[derive(Debug, Clone)]
pub struct ConvoyClient {
    /// Base URL of the orchestrator (e.g., "http://localhost:8080")
    base_url: String,
    user: String,
    user_header: String,
    client: Client,
}

impl ConvoyClient {
    /// Create a client acting as `user`
    ///
    /// ```
    /// use convoy_client::ConvoyClient;
    ///
    /// let client = ConvoyClient::new("http://localhost:8080/", "dev@example.com");
    /// assert_eq!(client.base_url(), "http://localhost:8080");
    /// ```
    pub fn new(base_url: impl Into<String>, user: impl Into<String>) -> Self {
        Self::with_client(base_url, user, Client::new())
    }

    /// Create a client with a custom HTTP client (timeouts, proxies, TLS)
    pub fn with_client(base_url: impl Into<String>, user: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.into(),
            user_header: DEFAULT_USER_HEADER.to_string(),
            client,
        }
    }

    /// Send the identity in another header, matching the proxy in front of
    /// the orchestrator
    pub fn with_user_header(mut self, header: impl Into<String>) -> Self {
        self.user_header = header.into();
        self
    }

    /// Get the base URL of the orchestrator
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authenticated(&self, request: RequestBuilder) -> RequestBuilder {
        request.header(self.user_header.as_str(), self.user.as_str())
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Check the status of a response, turning failures into errors
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status == StatusCode::NOT_MODIFIED {
            return Err(ClientError::NotModified);
        }

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ClientError::api_error(status.as_u16(), error_text));
        }

        Ok(response)
    }

    /// Handle an API response and deserialize JSON
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        self.check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }
}
