//! Instance set
//!
//! Ordered collection of Docker host addresses belonging to one application.

use serde::{Deserialize, Serialize};

/// Ordered, duplicate-free list of instance addresses
///
/// Order carries no priority but is preserved so batches iterate the fleet
/// in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct InstanceSet(Vec<String>);

impl InstanceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, instance: &str) -> bool {
        self.0.iter().any(|i| i == instance)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, String> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<String> {
        self.0
    }
}

impl From<Vec<String>> for InstanceSet {
    fn from(instances: Vec<String>) -> Self {
        instances.into_iter().collect()
    }
}

impl From<InstanceSet> for Vec<String> {
    fn from(set: InstanceSet) -> Self {
        set.0
    }
}

impl FromIterator<String> for InstanceSet {
    /// Trims addresses, drops blanks and keeps the first occurrence of duplicates
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        let mut instances: Vec<String> = Vec::new();
        for instance in iter {
            let instance = instance.trim();
            if instance.is_empty() || instances.iter().any(|i| i == instance) {
                continue;
            }
            instances.push(instance.to_string());
        }
        Self(instances)
    }
}

impl<'a> IntoIterator for &'a InstanceSet {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
