pub mod check;
pub mod completions;
pub mod diff;
pub mod run;

use indicatif::{ProgressBar, ProgressStyle};
use shellrun_core::Client;
use shellrun_schema::{
    parse_client_config_file, parse_script_file, Action, ClientConfig, ScriptDefinition,
};
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_CONFIG_ERROR: u8 = 2;
pub const EXIT_COMMAND_FAILED: u8 = 3;

const CONFIG_ERROR_PREFIX: &str = "configuration error:";

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn config_error(err: impl Display) -> String {
    let msg = err.to_string();
    if msg.starts_with(CONFIG_ERROR_PREFIX) {
        msg
    } else {
        format!("{CONFIG_ERROR_PREFIX} {msg}")
    }
}

/// Map a command error message to the process exit code.
pub fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with(CONFIG_ERROR_PREFIX) {
        EXIT_CONFIG_ERROR
    } else if is_command_failure(msg) {
        EXIT_COMMAND_FAILED
    } else {
        EXIT_FAILURE
    }
}

fn is_command_failure(msg: &str) -> bool {
    Action::ALL.iter().any(|action| {
        msg.strip_prefix(action.as_str())
            .is_some_and(|rest| rest.starts_with(" command failed: "))
    })
}

pub fn load_client(config: Option<&Path>) -> Result<Client, String> {
    let config = match config {
        Some(path) => parse_client_config_file(path).map_err(config_error)?,
        None => ClientConfig::default(),
    };
    Client::new(config).map_err(config_error)
}

pub fn load_script(path: &Path) -> Result<ScriptDefinition, String> {
    parse_script_file(path).map_err(|e| config_error(format!("{}: {e}", path.display())))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
    pb.set_style(style);
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn finish(pb: &ProgressBar, msg: String) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(msg);
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    finish(pb, format!("✗ {msg}"));
}

pub fn colorize_drift(has_drift: bool) -> String {
    use console::Style;
    if has_drift {
        Style::new().yellow().apply_to("changed").to_string()
    } else {
        Style::new().green().apply_to("unchanged").to_string()
    }
}
