use crate::RuntimeError;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Program plus leading flags used to run command text as an inline script.
///
/// The command text is appended as a single argument after `args`, so the
/// flags must put the interpreter in "run this string" mode (`-c` for POSIX
/// shells, `/C` for `cmd`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Interpreter {
    pub program: String,
    pub args: Vec<String>,
}

impl Interpreter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Split interpreter tokens into program and flags. `None` when empty.
    pub fn from_tokens(tokens: &[String]) -> Option<Self> {
        let (program, args) = tokens.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }

    /// `/bin/sh -c` on Unix.
    #[cfg(not(windows))]
    pub fn platform_default() -> Self {
        Self::new("/bin/sh", vec!["-c".to_owned()])
    }

    /// `cmd /C` on Windows.
    #[cfg(windows)]
    pub fn platform_default() -> Self {
        Self::new("cmd", vec!["/C".to_owned()])
    }

    /// Per-call tokens win, then the configured fallback, then the platform
    /// default. Never fails.
    pub fn resolve(tokens: &[String], fallback: Option<&Interpreter>) -> Self {
        Self::from_tokens(tokens)
            .or_else(|| fallback.cloned())
            .unwrap_or_else(Self::platform_default)
    }

    pub fn tokens(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Resolve the program to an executable file.
    ///
    /// Names containing a path separator are taken as paths (relative ones are
    /// joined onto `cwd`, the child's working directory); bare names are
    /// searched in `path_var` using the platform `PATH` syntax. The result is
    /// absolute, since the child is spawned after changing into `cwd`.
    pub fn locate(&self, path_var: Option<&str>, cwd: &Path) -> Result<PathBuf, RuntimeError> {
        if self.program.trim().is_empty() {
            return Err(RuntimeError::InterpreterNotFound(self.program.clone()));
        }

        let cwd = std::env::current_dir()?.join(cwd);
        which::which_in(&self.program, path_var, &cwd).map_err(|e| {
            debug!("interpreter lookup for '{}' failed: {e}", self.program);
            RuntimeError::InterpreterNotFound(self.program.clone())
        })
    }
}
