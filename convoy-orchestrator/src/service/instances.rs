//! Instance set arithmetic used by application updates

use convoy_core::domain::instance::InstanceSet;
use std::cmp::Ordering;

/// Result of applying an add/remove request to an application's instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceChanges {
    /// Full instance list once the change is applied
    pub instances: InstanceSet,
    /// Instances that were not part of the application before
    pub added: InstanceSet,
    /// Instances that were part of the application and are leaving it
    pub removed: InstanceSet,
}

impl InstanceChanges {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Remove `remove` from `original`, then append `add`
///
/// Both sides of the removal are sorted and merged in a single pass, so the
/// remaining instances come out sorted, followed by the new ones in request
/// order. Additions are looked up in the sorted kept and removed lists.
pub fn apply_changes(
    original: &InstanceSet,
    add: &InstanceSet,
    remove: &InstanceSet,
) -> InstanceChanges {
    let (kept, removed) = difference(original, remove);

    let added: InstanceSet = add
        .iter()
        .filter(|i| kept.binary_search(*i).is_err() && removed.binary_search(*i).is_err())
        .cloned()
        .collect();

    InstanceChanges {
        instances: kept.into_iter().chain(added.iter().cloned()).collect(),
        added,
        removed: removed.into(),
    }
}

/// Sorted merge difference: returns the kept and the removed instances
fn difference(original: &InstanceSet, remove: &InstanceSet) -> (Vec<String>, Vec<String>) {
    let mut original: Vec<&String> = original.iter().collect();
    let mut remove: Vec<&String> = remove.iter().collect();
    original.sort();
    remove.sort();

    let mut kept = Vec::with_capacity(original.len());
    let mut removed = Vec::new();
    let mut r = 0;

    for instance in original {
        while r < remove.len() && remove[r] < instance {
            r += 1;
        }
        match remove.get(r).map(|candidate| candidate.as_str().cmp(instance.as_str())) {
            Some(Ordering::Equal) => removed.push(instance.clone()),
            _ => kept.push(instance.clone()),
        }
    }

    (kept, removed)
}
