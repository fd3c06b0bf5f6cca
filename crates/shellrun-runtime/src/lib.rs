//! Execution layer for shellrun lifecycle commands.
//!
//! This crate turns a validated command description into a running child
//! process and back into data: environment composition with sensitive-value
//! tagging (`ComposedEnvironment`), interpreter resolution with documented
//! per-platform defaults (`Interpreter`), the `KEY=VALUE` output grammar
//! (`parse_output`), and cancellable child execution with separate stdout and
//! stderr capture (`run_captured`).

pub mod cancel;
pub mod environment;
pub mod interpreter;
pub mod output;
pub mod process;

pub use cancel::{CancelReason, CancelToken};
pub use environment::{compose, compose_with_process_env, ComposedEnvironment, EnvEntry, REDACTED};
pub use interpreter::Interpreter;
pub use output::{parse_output, parse_output_bytes, render_output};
pub use process::{run_captured, CapturedOutput, Completion, Invocation};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("runtime I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("working directory '{0}' does not exist or is not a directory")]
    InvalidWorkingDirectory(String),
    #[error("interpreter '{0}' not found or not executable")]
    InterpreterNotFound(String),
    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed output on line {line_number}: '{line}' (expected KEY=VALUE)")]
    MalformedOutputLine { line_number: usize, line: String },
    #[error("command exited with {}: {stderr}", exit_description(.code))]
    NonZeroExit { code: Option<i32>, stderr: String },
    #[error("command {reason}")]
    Cancelled { reason: CancelReason },
}

#[allow(clippy::ref_option)]
fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_owned(),
    }
}
