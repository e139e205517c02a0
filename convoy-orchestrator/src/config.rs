//! Orchestrator configuration
//!
//! Everything is read from the environment at startup and validated before
//! the server binds.

use axum::http::HeaderName;
use std::net::SocketAddr;
use std::time::Duration;

/// Route sending an instance's traffic through a beacon
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconRoute {
    pub instance: String,
    pub address: String,
    pub token: String,
}

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when absent
    pub database_url: Option<String>,

    pub bind_addr: String,

    /// Upper bound of every request sent to an instance
    pub request_timeout: Duration,

    /// Docker Engine API version prefix, e.g. `v1.43`
    pub docker_api_version: Option<String>,

    /// Header the authenticating proxy puts the caller's email in
    pub user_header: String,

    /// Users allowed to view and modify every application
    pub admins: Vec<String>,

    /// Users allowed to view every application
    pub viewers: Vec<String>,

    pub beacons: Vec<BeaconRoute>,

    /// Header carrying the beacon token on proxied requests
    pub beacon_token_header: String,
}

impl Config {
    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - DATABASE_URL (optional)
    /// - ORCHESTRATOR_BIND_ADDR (optional, default: 0.0.0.0:8080)
    /// - CONVOY_REQUEST_TIMEOUT (optional, seconds, default: 60)
    /// - CONVOY_DOCKER_API_VERSION (optional)
    /// - CONVOY_USER_HEADER (optional, default: x-forwarded-email)
    /// - CONVOY_ADMINS, CONVOY_VIEWERS (optional, comma-separated emails)
    /// - CONVOY_BEACONS (optional, comma-separated `instance=beacon_url@token`)
    /// - CONVOY_BEACON_TOKEN_HEADER (optional, default: X-Beacon-Token)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let request_timeout = match var("CONVOY_REQUEST_TIMEOUT") {
            Some(raw) => raw.trim().parse::<u64>().map(Duration::from_secs).map_err(|_| {
                anyhow::anyhow!("CONVOY_REQUEST_TIMEOUT must be a number of seconds")
            })?,
            None => defaults.request_timeout,
        };

        let beacons = match var("CONVOY_BEACONS") {
            Some(raw) => parse_beacons(&raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            database_url: var("DATABASE_URL"),
            bind_addr: var("ORCHESTRATOR_BIND_ADDR").unwrap_or(defaults.bind_addr),
            request_timeout,
            docker_api_version: var("CONVOY_DOCKER_API_VERSION"),
            user_header: var("CONVOY_USER_HEADER").unwrap_or(defaults.user_header),
            admins: var("CONVOY_ADMINS").map(|v| split_list(&v)).unwrap_or_default(),
            viewers: var("CONVOY_VIEWERS").map(|v| split_list(&v)).unwrap_or_default(),
            beacons,
            beacon_token_header: var("CONVOY_BEACON_TOKEN_HEADER")
                .unwrap_or(defaults.beacon_token_header),
        })
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.parse::<SocketAddr>().is_err() {
            anyhow::bail!("bind_addr `{}` is not a socket address", self.bind_addr);
        }

        if self.request_timeout.is_zero() {
            anyhow::bail!("request_timeout must be greater than 0");
        }

        for header in [&self.user_header, &self.beacon_token_header] {
            if HeaderName::from_bytes(header.as_bytes()).is_err() {
                anyhow::bail!("`{}` is not a valid header name", header);
            }
        }

        Ok(())
    }

    /// Permissions are only enforced once some admin or viewer is named
    pub fn restricts_access(&self) -> bool {
        !self.admins.is_empty() || !self.viewers.is_empty()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            request_timeout: Duration::from_secs(60),
            docker_api_version: None,
            user_header: "x-forwarded-email".to_string(),
            admins: Vec::new(),
            viewers: Vec::new(),
            beacons: Vec::new(),
            beacon_token_header: "X-Beacon-Token".to_string(),
        }
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `instance=beacon_url@token` entries
///
/// The token follows the last `@` so beacon URLs may carry user info.
fn parse_beacons(raw: &str) -> anyhow::Result<Vec<BeaconRoute>> {
    split_list(raw)
        .into_iter()
        .map(|entry| -> anyhow::Result<BeaconRoute> {
            let (instance, route) = entry
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("beacon route `{}` has no `=`", entry))?;
            let (address, token) = route
                .rsplit_once('@')
                .ok_or_else(|| anyhow::anyhow!("beacon route `{}` has no `@token`", entry))?;

            if instance.trim().is_empty() || address.trim().is_empty() || token.is_empty() {
                anyhow::bail!("beacon route `{}` is incomplete", entry);
            }

            Ok(BeaconRoute {
                instance: instance.trim().to_string(),
                address: address.trim().to_string(),
                token: token.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = load(&[]).unwrap();
        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.bind_addr, "0.0.0.0:8080");
        assert!(config.database_url.is_none());
        assert!(!config.restricts_access());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lists_and_beacons() {
        let config = load(&[
            ("CONVOY_ADMINS", "root@example.com, ,ops@example.com"),
            (
                "CONVOY_BEACONS",
                "10.0.0.5:2375=http://user@beacon:9000@s3cret, h2=beacon2@t",
            ),
        ])
        .unwrap();

        assert_eq!(config.admins, vec!["root@example.com", "ops@example.com"]);
        assert!(config.restricts_access());
        assert_eq!(
            config.beacons[0],
            BeaconRoute {
                instance: "10.0.0.5:2375".to_string(),
                address: "http://user@beacon:9000".to_string(),
                token: "s3cret".to_string(),
            }
        );
        assert_eq!(config.beacons[1].instance, "h2");
    }

    #[test]
    fn test_invalid_values() {
        assert!(load(&[("CONVOY_REQUEST_TIMEOUT", "soon")]).is_err());
        assert!(load(&[("CONVOY_BEACONS", "h1=beacon")]).is_err());

        let mut config = Config::default();
        config.request_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.bind_addr = "not-an-address".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.user_header = "bad header".to_string();
        assert!(config.validate().is_err());
    }
}
