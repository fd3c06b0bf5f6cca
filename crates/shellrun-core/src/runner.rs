use crate::client::Client;
use crate::lifecycle::{validate_transition, RunState};
use crate::CoreError;
use shellrun_runtime::{
    compose_with_process_env, parse_output_bytes, run_captured, CancelToken, Completion,
    ComposedEnvironment, Interpreter, Invocation, RuntimeError,
};
use shellrun_schema::{merge_env, CommandConfig, OutputMap};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Drives a single `CommandConfig` from `Idle` to a terminal state.
///
/// A runner is single-use: once it has reached `Succeeded`, `Failed` or
/// `Cancelled`, a second `run` is rejected with `InvalidTransition`.
pub struct CommandRunner<'a> {
    config: &'a CommandConfig,
    client: &'a Client,
    state: RunState,
}

impl<'a> CommandRunner<'a> {
    pub fn new(config: &'a CommandConfig, client: &'a Client) -> Self {
        Self {
            config,
            client,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn run(&mut self, cancel: &CancelToken) -> Result<OutputMap, CoreError> {
        let action = self.config.action();

        // Held until this function returns, whatever the outcome.
        let _gate = self
            .client
            .gate()
            .acquire(self.config.enable_parallelism())?;
        self.transition(RunState::Preparing)?;

        let (invocation, env) = match self.prepare() {
            Ok(prepared) => prepared,
            Err(e) => return Err(self.finish(RunState::Failed, e)),
        };

        self.transition(RunState::Running)?;
        let timeout = self
            .config
            .timeout()
            .or_else(|| self.client.config().timeout());
        info!(
            "running {action} command with {}",
            invocation.program.display()
        );
        let started = Instant::now();

        let captured = match run_captured(&invocation, cancel, timeout) {
            Ok(Completion::Exited(captured)) => captured,
            Ok(Completion::Cancelled(reason)) => {
                warn!("{action} command {reason} after {:?}", started.elapsed());
                return Err(self.finish(RunState::Cancelled, RuntimeError::Cancelled { reason }));
            }
            Err(e) => return Err(self.finish(RunState::Failed, e)),
        };

        self.transition(RunState::Collecting)?;
        if !captured.status.success() {
            let stderr = String::from_utf8_lossy(&captured.stderr).into_owned();
            debug!("{action} stderr: {}", env.scrub(&stderr));
            return Err(self.finish(
                RunState::Failed,
                RuntimeError::NonZeroExit {
                    code: captured.status.code(),
                    stderr,
                },
            ));
        }

        match parse_output_bytes(&captured.stdout) {
            Ok(output) => {
                self.transition(RunState::Succeeded)?;
                info!(
                    "{action} command succeeded in {:?} with {} output key(s)",
                    started.elapsed(),
                    output.len()
                );
                Ok(output)
            }
            Err(e) => Err(self.finish(RunState::Failed, e)),
        }
    }

    fn prepare(&self) -> Result<(Invocation, ComposedEnvironment), RuntimeError> {
        let client = self.client.config();
        let plain = merge_env(&client.environment, self.config.environment());
        let sensitive = merge_env(
            &client.sensitive_environment,
            self.config.sensitive_environment(),
        );
        let env = compose_with_process_env(&plain, &sensitive);
        debug!(
            "{} environment ({} entries): {:?}",
            self.config.action(),
            env.len(),
            env.redacted()
        );

        let cwd = self.config.working_directory();
        if !cwd.is_dir() {
            return Err(RuntimeError::InvalidWorkingDirectory(
                cwd.display().to_string(),
            ));
        }

        let interpreter = Interpreter::resolve(
            self.config.interpreter(),
            self.client.default_interpreter(),
        );
        let program = interpreter.locate(env.get("PATH"), cwd)?;
        debug!("interpreter resolved to {}", program.display());

        let mut args = interpreter.args;
        args.push(self.config.command().to_owned());
        args.extend(self.config.arguments().iter().cloned());

        let invocation = Invocation {
            program,
            args,
            env: env.clone(),
            cwd: cwd.to_path_buf(),
        };
        Ok((invocation, env))
    }

    fn transition(&mut self, to: RunState) -> Result<(), CoreError> {
        validate_transition(self.state, to)?;
        debug!("{} runner: {} -> {to}", self.config.action(), self.state);
        self.state = to;
        Ok(())
    }

    fn finish(&mut self, to: RunState, source: RuntimeError) -> CoreError {
        if let Err(e) = self.transition(to) {
            return e;
        }
        CoreError::Execution {
            action: self.config.action(),
            source,
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use shellrun_schema::{Action, ClientConfig, EnvMap};

    fn config(command: &str) -> CommandConfig {
        CommandConfig::new(Action::Create, command).unwrap()
    }

    #[test]
    fn success_ends_in_succeeded() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let cfg = config("echo id=42");
        let mut runner = CommandRunner::new(&cfg, &client);
        assert_eq!(runner.state(), RunState::Idle);

        let output = runner.run(&CancelToken::new()).unwrap();
        assert_eq!(output.get("id").map(String::as_str), Some("42"));
        assert_eq!(runner.state(), RunState::Succeeded);
    }

    #[test]
    fn runner_is_single_use() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let cfg = config("true");
        let mut runner = CommandRunner::new(&cfg, &client);
        runner.run(&CancelToken::new()).unwrap();

        let err = runner.run(&CancelToken::new()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidTransition { .. }));
        assert_eq!(runner.state(), RunState::Succeeded);
    }

    #[test]
    fn non_zero_exit_ends_in_failed() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let cfg = config("echo boom >&2; exit 2");
        let mut runner = CommandRunner::new(&cfg, &client);

        let err = runner.run(&CancelToken::new()).unwrap_err();
        assert_eq!(runner.state(), RunState::Failed);
        match err.runtime() {
            Some(RuntimeError::NonZeroExit { code, stderr }) => {
                assert_eq!(*code, Some(2));
                assert_eq!(stderr, "boom\n");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_working_directory_fails_while_preparing() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let cfg = config("true").with_working_directory("/nonexistent/shellrun/dir");
        let mut runner = CommandRunner::new(&cfg, &client);

        let err = runner.run(&CancelToken::new()).unwrap_err();
        assert_eq!(runner.state(), RunState::Failed);
        assert!(matches!(
            err.runtime(),
            Some(RuntimeError::InvalidWorkingDirectory(_))
        ));
    }

    #[test]
    fn pre_cancelled_token_ends_in_cancelled() {
        let client = Client::new(ClientConfig::default()).unwrap();
        let cfg = config("sleep 30");
        let token = CancelToken::new();
        token.cancel();
        let mut runner = CommandRunner::new(&cfg, &client);

        let err = runner.run(&token).unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(runner.state(), RunState::Cancelled);
    }

    #[test]
    fn client_environment_merged_under_call_environment() {
        let mut client_cfg = ClientConfig::default();
        client_cfg
            .environment
            .insert("GREETING".to_owned(), "hello".to_owned());
        client_cfg
            .environment
            .insert("TARGET".to_owned(), "client".to_owned());
        let client = Client::new(client_cfg).unwrap();

        let mut call_env = EnvMap::new();
        call_env.insert("TARGET".to_owned(), "call".to_owned());
        let cfg = config("echo \"greeting=$GREETING\"; echo \"target=$TARGET\"")
            .with_environment(call_env);

        let output = CommandRunner::new(&cfg, &client)
            .run(&CancelToken::new())
            .unwrap();
        assert_eq!(output["greeting"], "hello");
        assert_eq!(output["target"], "call");
    }
}
