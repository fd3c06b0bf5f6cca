use crate::CoreError;
use serde::Serialize;

/// States a single command execution moves through.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Preparing,
    Running,
    Collecting,
    Succeeded,
    Failed,
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Cancelled
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Idle => write!(f, "idle"),
            RunState::Preparing => write!(f, "preparing"),
            RunState::Running => write!(f, "running"),
            RunState::Collecting => write!(f, "collecting"),
            RunState::Succeeded => write!(f, "succeeded"),
            RunState::Failed => write!(f, "failed"),
            RunState::Cancelled => write!(f, "cancelled"),
        }
    }
}

pub fn validate_transition(from: RunState, to: RunState) -> Result<(), CoreError> {
    let valid = matches!(
        (from, to),
        (RunState::Idle, RunState::Preparing)
            | (RunState::Preparing, RunState::Running | RunState::Failed)
            | (
                RunState::Running,
                RunState::Collecting | RunState::Failed | RunState::Cancelled
            )
            | (RunState::Collecting, RunState::Succeeded | RunState::Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(CoreError::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}
