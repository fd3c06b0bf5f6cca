use crate::types::EnvMap;
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Process-wide configuration shared by every invocation.
///
/// Per-call values in a `CommandConfig` override these; environment maps are
/// merged key by key with the per-call entry winning.
#[derive(Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Default interpreter tokens. Empty selects the platform default.
    #[serde(default)]
    pub interpreter: Vec<String>,
    #[serde(default)]
    pub environment: EnvMap,
    #[serde(default)]
    pub sensitive_environment: EnvMap,
    #[serde(default)]
    pub enable_parallelism: bool,
    /// Advisory lock file taken alongside the in-process gate when
    /// parallelism is disabled.
    #[serde(default)]
    pub lock_file: Option<PathBuf>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .interpreter
            .first()
            .is_some_and(|program| program.trim().is_empty())
        {
            return Err(ConfigError::EmptyInterpreterToken);
        }
        if self.timeout_secs == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sensitive_keys: Vec<&str> = self
            .sensitive_environment
            .keys()
            .map(String::as_str)
            .collect();
        f.debug_struct("ClientConfig")
            .field("interpreter", &self.interpreter)
            .field("environment", &self.environment)
            .field("sensitive_environment_keys", &sensitive_keys)
            .field("enable_parallelism", &self.enable_parallelism)
            .field("lock_file", &self.lock_file)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

pub fn parse_client_config_str(input: &str) -> Result<ClientConfig, ConfigError> {
    let config: ClientConfig = toml::from_str(input)?;
    config.validate()?;
    Ok(config)
}

pub fn parse_client_config_file(path: impl AsRef<Path>) -> Result<ClientConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_client_config_str(&content)
}
