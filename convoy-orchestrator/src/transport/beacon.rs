//! Beacon resolution
//!
//! Translates an instance address into the address the orchestrator actually
//! connects to. Instances reachable directly map onto themselves; instances
//! behind a beacon map onto the beacon route and carry its auth token.

use async_trait::async_trait;
use std::collections::HashMap;

use super::TransportError;

/// Effective connection target for one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Base URL requests are sent to, without trailing slash
    pub address: String,
    pub token: Option<String>,
    pub proxied: bool,
}

impl Target {
    pub fn direct(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: None,
            proxied: false,
        }
    }

    pub fn proxied(address: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            token: Some(token.into()),
            proxied: true,
        }
    }
}

/// Resolves an instance address to a reachable target
#[async_trait]
pub trait TargetResolver: Send + Sync {
    async fn resolve(&self, instance: &str) -> Result<Target, TransportError>;
}

/// Connects to every instance directly
pub struct DirectResolver;

#[async_trait]
impl TargetResolver for DirectResolver {
    async fn resolve(&self, instance: &str) -> Result<Target, TransportError> {
        Ok(Target::direct(base_url(instance)?))
    }
}

/// Routes configured instances through beacons, everything else directly
pub struct StaticBeaconResolver {
    routes: HashMap<String, Target>,
}

impl StaticBeaconResolver {
    /// Build a resolver from `(instance, beacon_url, token)` routes
    pub fn new(routes: impl IntoIterator<Item = (String, String, String)>) -> Self {
        let routes = routes
            .into_iter()
            .map(|(instance, beacon, token)| {
                let address = beacon.trim_end_matches('/').to_string();
                (instance, Target::proxied(address, token))
            })
            .collect();

        Self { routes }
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[async_trait]
impl TargetResolver for StaticBeaconResolver {
    async fn resolve(&self, instance: &str) -> Result<Target, TransportError> {
        match self.routes.get(instance) {
            Some(target) => Ok(target.clone()),
            None => DirectResolver.resolve(instance).await,
        }
    }
}

/// Normalize a bare `host[:port]` into an http base URL
fn base_url(instance: &str) -> Result<String, TransportError> {
    let instance = instance.trim().trim_end_matches('/');
    if instance.is_empty() || instance.contains(char::is_whitespace) {
        return Err(TransportError::InvalidAddress(instance.to_string()));
    }

    if instance.starts_with("http://") || instance.starts_with("https://") {
        Ok(instance.to_string())
    } else {
        Ok(format!("http://{}", instance))
    }
}
