//! Configuration types for shellrun.
//!
//! This crate defines the schema layer: the lifecycle `Action` set, the typed
//! per-invocation `CommandConfig` (validated at construction), the process-wide
//! `ClientConfig`, and the TOML `ScriptDefinition` that describes one scripted
//! resource and merges with the client configuration into a `CommandConfig`.

pub mod command;
pub mod config;
pub mod script;
pub mod types;

pub use command::CommandConfig;
pub use config::{parse_client_config_file, parse_client_config_str, ClientConfig};
pub use script::{
    parse_script_file, parse_script_str, ArgumentsSection, LifecycleCommands, ScriptDefinition,
};
pub use types::{load_output_file, merge_env, parse_output_json, Action, EnvMap, OutputMap};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse configuration: {0}")]
    ParseToml(#[from] toml::de::Error),
    #[error("failed to parse output snapshot: {0}")]
    ParseJson(#[from] serde_json::Error),
    #[error("unsupported script version: {0}, expected 1")]
    UnsupportedVersion(u32),
    #[error("{0} command must not be empty")]
    EmptyCommand(Action),
    #[error("lifecycle_commands must define at least one command")]
    NoLifecycleCommands,
    #[error("no {0} command defined in lifecycle_commands")]
    MissingLifecycleCommand(Action),
    #[error("interpreter entry must not be empty")]
    EmptyInterpreterToken,
    #[error("unknown action '{0}', expected one of: create, read, update, delete")]
    UnknownAction(String),
    #[error("timeout must be greater than zero")]
    ZeroTimeout,
}
