use serde::Serialize;
use shellrun_schema::OutputMap;

/// Key-level difference between a recorded output and a fresh one.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct OutputDrift {
    pub added: Vec<String>,
    pub changed: Vec<String>,
    pub removed: Vec<String>,
    pub has_drift: bool,
}

/// Exact equality: same keys, same values. Order never matters.
pub fn outputs_equal(previous: &OutputMap, current: &OutputMap) -> bool {
    previous == current
}

/// Classify every key that differs between `previous` and `current`.
///
/// Lists come back sorted. `has_drift` is false exactly when
/// [`outputs_equal`] holds.
pub fn diff_outputs(previous: &OutputMap, current: &OutputMap) -> OutputDrift {
    let mut added = Vec::new();
    let mut changed = Vec::new();
    let mut removed = Vec::new();

    for (key, value) in current {
        match previous.get(key) {
            None => added.push(key.clone()),
            Some(old) if old != value => changed.push(key.clone()),
            Some(_) => {}
        }
    }
    for key in previous.keys() {
        if !current.contains_key(key) {
            removed.push(key.clone());
        }
    }

    // OutputMap iterates in key order, so the lists are already sorted.
    let has_drift = !added.is_empty() || !changed.is_empty() || !removed.is_empty();

    OutputDrift {
        added,
        changed,
        removed,
        has_drift,
    }
}
