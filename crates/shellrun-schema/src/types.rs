use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Parsed `KEY=VALUE` output of a lifecycle command.
pub type OutputMap = BTreeMap<String, String>;

/// Environment variables keyed by name.
pub type EnvMap = BTreeMap<String, String>;

/// Key-wise merge of two environment maps; entries from `overrides` win.
pub fn merge_env(base: &EnvMap, overrides: &EnvMap) -> EnvMap {
    let mut merged = base.clone();
    merged.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged
}

/// Lifecycle action a command is run for.
///
/// The action frames log lines and error messages; it never changes how the
/// command itself is executed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Read,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Create, Action::Read, Action::Update, Action::Delete];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Read => "read",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(Action::Create),
            "read" => Ok(Action::Read),
            "update" => Ok(Action::Update),
            "delete" => Ok(Action::Delete),
            _ => Err(ConfigError::UnknownAction(s.to_owned())),
        }
    }
}

/// Parse a previously recorded output snapshot stored as a flat JSON object.
pub fn parse_output_json(input: &str) -> Result<OutputMap, ConfigError> {
    Ok(serde_json::from_str(input)?)
}

pub fn load_output_file(path: impl AsRef<Path>) -> Result<OutputMap, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_output_json(&content)
}
