use crate::command::CommandConfig;
use crate::config::ClientConfig;
use crate::types::{merge_env, Action, EnvMap, OutputMap};
use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SCRIPT_VERSION: u32 = 1;

/// A scripted resource: one command per lifecycle action plus the
/// environment they run in.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ScriptDefinition {
    #[serde(default = "default_version")]
    pub version: u32,
    pub lifecycle_commands: LifecycleCommands,
    #[serde(default)]
    pub arguments: ArgumentsSection,
    #[serde(default)]
    pub environment: EnvMap,
    #[serde(default)]
    pub sensitive_environment: EnvMap,
    #[serde(default)]
    pub interpreter: Vec<String>,
    #[serde(default = "default_working_directory")]
    pub working_directory: PathBuf,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LifecycleCommands {
    #[serde(default)]
    pub create: Option<String>,
    #[serde(default)]
    pub read: Option<String>,
    #[serde(default)]
    pub update: Option<String>,
    #[serde(default)]
    pub delete: Option<String>,
}

impl LifecycleCommands {
    pub fn get(&self, action: Action) -> Option<&str> {
        match action {
            Action::Create => self.create.as_deref(),
            Action::Read => self.read.as_deref(),
            Action::Update => self.update.as_deref(),
            Action::Delete => self.delete.as_deref(),
        }
    }

    /// Actions that have a command defined, in lifecycle order.
    pub fn defined(&self) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|a| self.get(*a).is_some())
            .collect()
    }
}

/// Extra positional arguments per action, passed after the command text.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ArgumentsSection {
    #[serde(default)]
    pub create: Vec<String>,
    #[serde(default)]
    pub read: Vec<String>,
    #[serde(default)]
    pub update: Vec<String>,
    #[serde(default)]
    pub delete: Vec<String>,
}

impl ArgumentsSection {
    pub fn get(&self, action: Action) -> &[String] {
        match action {
            Action::Create => &self.create,
            Action::Read => &self.read,
            Action::Update => &self.update,
            Action::Delete => &self.delete,
        }
    }
}

fn default_version() -> u32 {
    SCRIPT_VERSION
}

fn default_working_directory() -> PathBuf {
    PathBuf::from(".")
}

impl ScriptDefinition {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != SCRIPT_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        if self.lifecycle_commands.defined().is_empty() {
            return Err(ConfigError::NoLifecycleCommands);
        }
        for action in self.lifecycle_commands.defined() {
            if self
                .lifecycle_commands
                .get(action)
                .is_some_and(|c| c.trim().is_empty())
            {
                return Err(ConfigError::EmptyCommand(action));
            }
        }
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

    /// Build the `CommandConfig` for one action, layering this script over
    /// the client configuration.
    ///
    /// Script values win over client values: environment maps merge key by
    /// key, a non-empty script interpreter replaces the client's, and a script
    /// timeout replaces the client timeout. Parallelism is a client-level
    /// setting only.
    pub fn command_config(
        &self,
        action: Action,
        client: &ClientConfig,
        previous_output: OutputMap,
    ) -> Result<CommandConfig, ConfigError> {
        let command = self
            .lifecycle_commands
            .get(action)
            .ok_or(ConfigError::MissingLifecycleCommand(action))?;

        let interpreter = if self.interpreter.is_empty() {
            &client.interpreter
        } else {
            &self.interpreter
        };
        let timeout = self
            .timeout_secs
            .or(client.timeout_secs)
            .map(Duration::from_secs);

        CommandConfig::new(action, command)?
            .with_arguments(self.arguments.get(action).iter().cloned())
            .with_environment(merge_env(&client.environment, &self.environment))
            .with_sensitive_environment(merge_env(
                &client.sensitive_environment,
                &self.sensitive_environment,
            ))
            .with_interpreter(interpreter.iter().cloned())?
            .with_working_directory(&self.working_directory)
            .with_previous_output(previous_output)
            .with_parallelism(client.enable_parallelism)
            .with_timeout(timeout)
    }
}

pub fn parse_script_str(input: &str) -> Result<ScriptDefinition, ConfigError> {
    let script: ScriptDefinition = toml::from_str(input)?;
    script.validate()?;
    Ok(script)
}

pub fn parse_script_file(path: impl AsRef<Path>) -> Result<ScriptDefinition, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_script_str(&content)
}
