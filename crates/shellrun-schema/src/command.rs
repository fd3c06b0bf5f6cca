use crate::types::{Action, EnvMap, OutputMap};
use crate::ConfigError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything needed to execute one lifecycle command.
///
/// Built once by the caller-facing adapter and validated at construction: the
/// command text is never empty and the interpreter, when given, names a program.
/// Fields are read through accessors so a validated config cannot be
/// invalidated afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct CommandConfig {
    action: Action,
    command: String,
    arguments: Vec<String>,
    environment: EnvMap,
    sensitive_environment: EnvMap,
    interpreter: Vec<String>,
    working_directory: PathBuf,
    previous_output: OutputMap,
    enable_parallelism: bool,
    timeout: Option<Duration>,
}

impl CommandConfig {
    pub fn new(action: Action, command: impl Into<String>) -> Result<Self, ConfigError> {
        let command = command.into();
        if command.trim().is_empty() {
            return Err(ConfigError::EmptyCommand(action));
        }
        Ok(Self {
            action,
            command,
            arguments: Vec::new(),
            environment: EnvMap::new(),
            sensitive_environment: EnvMap::new(),
            interpreter: Vec::new(),
            working_directory: PathBuf::from("."),
            previous_output: OutputMap::new(),
            enable_parallelism: false,
            timeout: None,
        })
    }

    #[must_use]
    pub fn with_arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments = arguments.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_environment(mut self, environment: EnvMap) -> Self {
        self.environment = environment;
        self
    }

    #[must_use]
    pub fn with_sensitive_environment(mut self, sensitive: EnvMap) -> Self {
        self.sensitive_environment = sensitive;
        self
    }

    /// Set the interpreter tokens (program followed by its flags).
    ///
    /// An empty list selects the platform default at execution time.
    pub fn with_interpreter<I, S>(mut self, interpreter: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tokens: Vec<String> = interpreter.into_iter().map(Into::into).collect();
        if tokens.first().is_some_and(|program| program.trim().is_empty()) {
            return Err(ConfigError::EmptyInterpreterToken);
        }
        self.interpreter = tokens;
        Ok(self)
    }

    #[must_use]
    pub fn with_working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = dir.into();
        self
    }

    #[must_use]
    pub fn with_previous_output(mut self, previous: OutputMap) -> Self {
        self.previous_output = previous;
        self
    }

    #[must_use]
    pub fn with_parallelism(mut self, enabled: bool) -> Self {
        self.enable_parallelism = enabled;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Result<Self, ConfigError> {
        if timeout.is_some_and(|t| t.is_zero()) {
            return Err(ConfigError::ZeroTimeout);
        }
        self.timeout = timeout;
        Ok(self)
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    pub fn environment(&self) -> &EnvMap {
        &self.environment
    }

    pub fn sensitive_environment(&self) -> &EnvMap {
        &self.sensitive_environment
    }

    pub fn interpreter(&self) -> &[String] {
        &self.interpreter
    }

    pub fn working_directory(&self) -> &Path {
        &self.working_directory
    }

    pub fn previous_output(&self) -> &OutputMap {
        &self.previous_output
    }

    pub fn enable_parallelism(&self) -> bool {
        self.enable_parallelism
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

// Sensitive values are replaced so `{:?}` is safe to log.
impl fmt::Debug for CommandConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sensitive_keys: Vec<&str> = self
            .sensitive_environment
            .keys()
            .map(String::as_str)
            .collect();
        f.debug_struct("CommandConfig")
            .field("action", &self.action)
            .field("command", &self.command)
            .field("arguments", &self.arguments)
            .field("environment", &self.environment)
            .field("sensitive_environment_keys", &sensitive_keys)
            .field("interpreter", &self.interpreter)
            .field("working_directory", &self.working_directory)
            .field("previous_output", &self.previous_output)
            .field("enable_parallelism", &self.enable_parallelism)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_applied_on_construction() {
        let config = CommandConfig::new(Action::Read, "echo a=1").unwrap();
        assert_eq!(config.action(), Action::Read);
        assert_eq!(config.working_directory(), Path::new("."));
        assert!(config.interpreter().is_empty());
        assert!(config.arguments().is_empty());
        assert!(!config.enable_parallelism());
        assert!(config.timeout().is_none());
    }

    #[test]
    fn rejects_empty_command() {
        let err = CommandConfig::new(Action::Create, "").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyCommand(Action::Create)));
        assert!(CommandConfig::new(Action::Create, "   \n").is_err());
    }

    #[test]
    fn rejects_blank_interpreter_program() {
        let config = CommandConfig::new(Action::Read, "true").unwrap();
        assert!(config.with_interpreter(["", "-c"]).is_err());
    }

    #[test]
    fn empty_interpreter_is_allowed() {
        let config = CommandConfig::new(Action::Read, "true")
            .unwrap()
            .with_interpreter(Vec::<String>::new())
            .unwrap();
        assert!(config.interpreter().is_empty());
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = CommandConfig::new(Action::Read, "true").unwrap();
        assert!(matches!(
            config.with_timeout(Some(Duration::ZERO)),
            Err(ConfigError::ZeroTimeout)
        ));
    }

    #[test]
    fn debug_output_hides_sensitive_values() {
        let mut sensitive = EnvMap::new();
        sensitive.insert("API_TOKEN".to_owned(), "hunter2".to_owned());
        let config = CommandConfig::new(Action::Update, "true")
            .unwrap()
            .with_sensitive_environment(sensitive);
        let rendered = format!("{config:?}");
        assert!(rendered.contains("API_TOKEN"));
        assert!(!rendered.contains("hunter2"));
    }
}
