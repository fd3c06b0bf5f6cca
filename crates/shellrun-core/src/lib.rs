//! Core orchestration for shellrun lifecycle commands.
//!
//! This crate ties the schema and runtime layers together into the `Client`:
//! the process-lifetime context that owns the global configuration and the
//! `ParallelismGate`, and runs each `CommandConfig` through a single-use
//! `CommandRunner` state machine. It also provides output change detection for
//! update no-op checks and Ctrl-C wiring for cancellation.

pub mod client;
pub mod concurrency;
pub mod drift;
pub mod lifecycle;
pub mod runner;

pub use client::{Client, ReadOutcome, UpdateResult};
pub use concurrency::{install_signal_handler, GateGuard, ParallelismGate};
pub use drift::{diff_outputs, outputs_equal, OutputDrift};
pub use lifecycle::{validate_transition, RunState};
pub use runner::CommandRunner;

use shellrun_schema::Action;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(#[from] shellrun_schema::ConfigError),
    #[error("{action} command failed: {source}")]
    Execution {
        action: Action,
        #[source]
        source: shellrun_runtime::RuntimeError,
    },
    #[error("parallelism lock error: {0}")]
    Lock(String),
    #[error("invalid run state transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    /// The underlying execution failure, if this error came from running a
    /// command.
    pub fn runtime(&self) -> Option<&shellrun_runtime::RuntimeError> {
        match self {
            CoreError::Execution { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(
            self.runtime(),
            Some(shellrun_runtime::RuntimeError::Cancelled { .. })
        )
    }
}
