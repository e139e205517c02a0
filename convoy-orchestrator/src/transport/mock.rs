//! Scripted transport for tests
//!
//! Answers 200 for every step unless a rule matches the instance and a
//! fragment of the step path. Every call is recorded in arrival order.

use async_trait::async_trait;
use reqwest::Method;
use std::sync::{Arc, Mutex};

use super::{InstanceTransport, TransportError, TransportResponse};
use crate::batch::Step;

struct Rule {
    instance: String,
    fragment: String,
    /// `None` simulates an unreachable host
    status: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub instance: String,
    pub method: Method,
    pub path: String,
}

#[derive(Default)]
pub struct MockTransport {
    rules: Mutex<Vec<Rule>>,
    calls: Mutex<Vec<Call>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answer `status` when `instance` hits a path containing `fragment`
    pub fn respond(&self, instance: &str, fragment: &str, status: u16) {
        self.rules.lock().unwrap().push(Rule {
            instance: instance.to_string(),
            fragment: fragment.to_string(),
            status: Some(status),
        });
    }

    /// Fail with a transport error when `instance` hits a path containing `fragment`
    pub fn unreachable(&self, instance: &str, fragment: &str) {
        self.rules.lock().unwrap().push(Rule {
            instance: instance.to_string(),
            fragment: fragment.to_string(),
            status: None,
        });
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Paths `instance` received, in order
    pub fn paths_for(&self, instance: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.instance == instance)
            .map(|c| c.path)
            .collect()
    }

    /// Instances that received a path containing `fragment`
    pub fn instances_hit(&self, fragment: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.path.contains(fragment))
            .map(|c| c.instance)
            .collect()
    }
}

#[async_trait]
impl InstanceTransport for MockTransport {
    async fn send(&self, instance: &str, step: &Step) -> Result<TransportResponse, TransportError> {
        self.calls.lock().unwrap().push(Call {
            instance: instance.to_string(),
            method: step.method.clone(),
            path: step.path.clone(),
        });

        let status = self
            .rules
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.instance == instance && step.path.contains(&r.fragment))
            .map(|r| r.status)
            .unwrap_or(Some(200));

        match status {
            Some(status) => Ok(TransportResponse {
                status,
                message: format!("{} answered {}", instance, status),
            }),
            None => Err(TransportError::InvalidAddress(instance.to_string())),
        }
    }
}
