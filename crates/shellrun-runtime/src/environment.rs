use shellrun_schema::EnvMap;
use std::collections::HashMap;
use std::fmt;
use tracing::trace;

/// Replacement text for sensitive values in anything meant for humans.
pub const REDACTED: &str = "******";

#[derive(Clone, PartialEq, Eq)]
pub struct EnvEntry {
    pub key: String,
    pub value: String,
    pub sensitive: bool,
}

impl fmt::Debug for EnvEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = if self.sensitive {
            REDACTED
        } else {
            self.value.as_str()
        };
        f.debug_struct("EnvEntry")
            .field("key", &self.key)
            .field("value", &value)
            .field("sensitive", &self.sensitive)
            .finish()
    }
}

/// The exact environment handed to a child process.
///
/// Built from three layers (inherited, plain, sensitive). A later layer
/// overrides an earlier one on key collision; the overridden entry keeps its
/// original position. Entries set by the sensitive layer are tagged so every
/// human-facing rendering can mask them.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ComposedEnvironment {
    entries: Vec<EnvEntry>,
    index: HashMap<String, usize>,
}

impl ComposedEnvironment {
    fn set(&mut self, key: &str, value: &str, sensitive: bool) {
        if let Some(&pos) = self.index.get(key) {
            let entry = &mut self.entries[pos];
            entry.value = value.to_owned();
            entry.sensitive = sensitive;
        } else {
            self.index.insert(key.to_owned(), self.entries.len());
            self.entries.push(EnvEntry {
                key: key.to_owned(),
                value: value.to_owned(),
                sensitive,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.index
            .get(key)
            .map(|&pos| self.entries[pos].value.as_str())
    }

    pub fn is_sensitive(&self, key: &str) -> bool {
        self.index
            .get(key)
            .is_some_and(|&pos| self.entries[pos].sensitive)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EnvEntry> {
        self.entries.iter()
    }

    pub fn sensitive_keys(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|e| e.sensitive)
            .map(|e| e.key.as_str())
    }

    /// `KEY=VALUE` strings in composition order, values unmasked.
    ///
    /// Only for process injection; never log the result.
    pub fn to_env_strings(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| format!("{}={}", e.key, e.value))
            .collect()
    }

    /// `KEY=VALUE` strings with sensitive values replaced by [`REDACTED`].
    pub fn redacted(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|e| {
                if e.sensitive {
                    format!("{}={REDACTED}", e.key)
                } else {
                    format!("{}={}", e.key, e.value)
                }
            })
            .collect()
    }

    /// Mask every occurrence of a sensitive value in `text`.
    ///
    /// Longer values are replaced first so a value that contains another one
    /// is masked as a whole.
    pub fn scrub(&self, text: &str) -> String {
        let mut values: Vec<&str> = self
            .entries
            .iter()
            .filter(|e| e.sensitive && !e.value.is_empty())
            .map(|e| e.value.as_str())
            .collect();
        values.sort_by_key(|v| std::cmp::Reverse(v.len()));

        let mut scrubbed = text.to_owned();
        for value in values {
            if scrubbed.contains(value) {
                scrubbed = scrubbed.replace(value, REDACTED);
            }
        }
        scrubbed
    }
}

impl fmt::Debug for ComposedEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.redacted()).finish()
    }
}

/// Compose a child environment from an inherited base plus the plain and
/// sensitive maps, in that precedence order.
pub fn compose<I, K, V>(inherited: I, plain: &EnvMap, sensitive: &EnvMap) -> ComposedEnvironment
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut env = ComposedEnvironment::default();
    for (key, value) in inherited {
        env.set(key.as_ref(), value.as_ref(), false);
    }
    for (key, value) in plain {
        env.set(key, value, false);
    }
    for (key, value) in sensitive {
        env.set(key, value, true);
    }
    env
}

/// [`compose`] with the current process environment as the inherited layer.
///
/// Variables whose name or value is not valid UTF-8 are not forwarded.
pub fn compose_with_process_env(plain: &EnvMap, sensitive: &EnvMap) -> ComposedEnvironment {
    let inherited = std::env::vars_os().filter_map(|(key, value)| {
        match (key.into_string(), value.into_string()) {
            (Ok(k), Ok(v)) => Some((k, v)),
            (Ok(k), Err(_)) => {
                trace!("skipping inherited variable {k} with non-UTF-8 value");
                None
            }
            _ => None,
        }
    });
    compose(inherited, plain, sensitive)
}
