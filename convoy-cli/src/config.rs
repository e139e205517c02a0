//! Configuration module
//!
//! Where the orchestrator lives and who the CLI acts as.

use convoy_client::ConvoyClient;

/// CLI configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the orchestrator service
    pub orchestrator_url: String,
    /// Email sent as the caller's identity
    pub user: String,
    pub user_header: String,
}

impl Config {
    pub fn client(&self) -> ConvoyClient {
        ConvoyClient::new(&self.orchestrator_url, &self.user).with_user_header(&self.user_header)
    }
}
