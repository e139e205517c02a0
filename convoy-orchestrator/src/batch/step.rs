//! Batch steps

use reqwest::Method;
use serde_json::Value;

/// One HTTP call issued against every instance of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub method: Method,
    /// Endpoint path relative to the instance base URL
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Step {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{}{}={}", sep, key, value)?;
        }
        Ok(())
    }
}
