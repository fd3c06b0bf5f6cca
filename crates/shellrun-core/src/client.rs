use crate::concurrency::ParallelismGate;
use crate::drift::{diff_outputs, OutputDrift};
use crate::runner::CommandRunner;
use crate::CoreError;
use serde::Serialize;
use shellrun_runtime::{CancelToken, Interpreter};
use shellrun_schema::{ClientConfig, CommandConfig, OutputMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Process-lifetime execution context.
///
/// Owns the validated `ClientConfig` and the `ParallelismGate` every
/// invocation goes through. Construct one per process and share it by
/// reference or `Arc`; it is `Send + Sync`.
#[derive(Debug)]
pub struct Client {
    config: ClientConfig,
    gate: Arc<ParallelismGate>,
    default_interpreter: Option<Interpreter>,
}

/// Result of a `read` command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "output", rename_all = "lowercase")]
pub enum ReadOutcome {
    /// The command printed nothing: the resource no longer exists.
    Absent,
    Present(OutputMap),
}

impl ReadOutcome {
    pub fn from_output(output: OutputMap) -> Self {
        if output.is_empty() {
            ReadOutcome::Absent
        } else {
            ReadOutcome::Present(output)
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, ReadOutcome::Absent)
    }
}

/// Output of an `update` command together with its drift from the
/// previously recorded output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateResult {
    pub output: OutputMap,
    pub drift: OutputDrift,
}

impl UpdateResult {
    pub fn is_noop(&self) -> bool {
        !self.drift.has_drift
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Result<Self, CoreError> {
        let gate = match &config.lock_file {
            Some(path) => ParallelismGate::with_lock_file(path),
            None => ParallelismGate::new(),
        };
        Self::with_gate(config, Arc::new(gate))
    }

    /// Build a client around an existing gate, e.g. one shared with another
    /// client in the same process.
    pub fn with_gate(config: ClientConfig, gate: Arc<ParallelismGate>) -> Result<Self, CoreError> {
        config.validate()?;
        let default_interpreter = Interpreter::from_tokens(&config.interpreter);
        debug!("client configured: {config:?}");
        Ok(Self {
            config,
            gate,
            default_interpreter,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn gate(&self) -> &ParallelismGate {
        &self.gate
    }

    pub fn default_interpreter(&self) -> Option<&Interpreter> {
        self.default_interpreter.as_ref()
    }

    /// Run one lifecycle command and return its parsed output.
    pub fn execute(
        &self,
        command: &CommandConfig,
        cancel: &CancelToken,
    ) -> Result<OutputMap, CoreError> {
        CommandRunner::new(command, self).run(cancel)
    }

    pub fn read(
        &self,
        command: &CommandConfig,
        cancel: &CancelToken,
    ) -> Result<ReadOutcome, CoreError> {
        let outcome = ReadOutcome::from_output(self.execute(command, cancel)?);
        if outcome.is_absent() {
            info!("read produced no output, resource is absent");
        }
        Ok(outcome)
    }

    pub fn update(
        &self,
        command: &CommandConfig,
        cancel: &CancelToken,
    ) -> Result<UpdateResult, CoreError> {
        let output = self.execute(command, cancel)?;
        let drift = diff_outputs(command.previous_output(), &output);
        if drift.has_drift {
            info!(
                "update changed output: {} added, {} changed, {} removed",
                drift.added.len(),
                drift.changed.len(),
                drift.removed.len()
            );
        } else {
            info!("update output matches previous output");
        }
        Ok(UpdateResult { output, drift })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shellrun_schema::{Action, ConfigError};

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn client_is_send_and_sync() {
        assert_send_sync::<Client>();
    }

    #[test]
    fn invalid_config_rejected() {
        let config = ClientConfig {
            timeout_secs: Some(0),
            ..ClientConfig::default()
        };
        let err = Client::new(config).unwrap_err();
        assert!(matches!(err, CoreError::Config(ConfigError::ZeroTimeout)));
    }

    #[test]
    fn default_interpreter_from_config() {
        let config = ClientConfig {
            interpreter: vec!["/bin/bash".to_owned(), "-c".to_owned()],
            ..ClientConfig::default()
        };
        let client = Client::new(config).unwrap();
        let interp = client.default_interpreter().unwrap();
        assert_eq!(interp.program, "/bin/bash");
        assert_eq!(interp.args, vec!["-c"]);

        let plain = Client::new(ClientConfig::default()).unwrap();
        assert!(plain.default_interpreter().is_none());
    }

    #[test]
    fn lock_file_wired_into_gate() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            lock_file: Some(dir.path().join("gate.lock")),
            ..ClientConfig::default()
        };
        let client = Client::new(config).unwrap();
        assert_eq!(
            client.gate().lock_path(),
            Some(dir.path().join("gate.lock").as_path())
        );
    }

    #[test]
    fn shared_gate_is_the_same_instance() {
        let gate = Arc::new(ParallelismGate::new());
        let a = Client::with_gate(ClientConfig::default(), Arc::clone(&gate)).unwrap();
        let b = Client::with_gate(ClientConfig::default(), Arc::clone(&gate)).unwrap();
        assert!(std::ptr::eq(a.gate(), b.gate()));
    }

    #[test]
    fn read_outcome_classification() {
        assert!(ReadOutcome::from_output(OutputMap::new()).is_absent());
        let mut output = OutputMap::new();
        output.insert("id".to_owned(), "1".to_owned());
        assert_eq!(
            ReadOutcome::from_output(output.clone()),
            ReadOutcome::Present(output)
        );
    }

    #[test]
    fn read_outcome_json_shape() {
        let json = serde_json::to_value(ReadOutcome::Absent).unwrap();
        assert_eq!(json, serde_json::json!({"status": "absent"}));

        let mut output = OutputMap::new();
        output.insert("id".to_owned(), "1".to_owned());
        let json = serde_json::to_value(ReadOutcome::Present(output)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"status": "present", "output": {"id": "1"}})
        );
    }

    #[cfg(unix)]
    #[test]
    fn read_without_output_is_absent() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let cmd = CommandConfig::new(Action::Read, "printf '\\n  \\n'").unwrap();
        let outcome = client.read(&cmd, &CancelToken::new()).unwrap();
        assert!(outcome.is_absent());
    }

    #[cfg(unix)]
    #[test]
    fn update_reports_drift_against_previous_output() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let mut previous = OutputMap::new();
        previous.insert("id".to_owned(), "1".to_owned());
        previous.insert("size".to_owned(), "small".to_owned());

        let same = CommandConfig::new(Action::Update, "echo id=1; echo size=small")
            .unwrap()
            .with_previous_output(previous.clone());
        let result = client.update(&same, &CancelToken::new()).unwrap();
        assert!(result.is_noop());

        let changed = CommandConfig::new(Action::Update, "echo id=1; echo size=large")
            .unwrap()
            .with_previous_output(previous);
        let result = client.update(&changed, &CancelToken::new()).unwrap();
        assert!(!result.is_noop());
        assert_eq!(result.drift.changed, vec!["size"]);
        assert_eq!(result.output["size"], "large");
    }
}
