use super::{config_error, json_pretty, load_script, EXIT_SUCCESS};
use serde::Serialize;
use shellrun_core::Client;
use shellrun_runtime::{compose, Interpreter};
use shellrun_schema::OutputMap;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ActionPlan {
    action: String,
    interpreter: Vec<String>,
    command: String,
    arguments: Vec<String>,
    working_directory: String,
    /// Configured variables only, sensitive values masked.
    environment: Vec<String>,
    timeout_secs: Option<u64>,
}

pub fn run(client: &Client, script_path: &Path, json: bool) -> Result<u8, String> {
    let script = load_script(script_path)?;

    let mut plans = Vec::new();
    for action in script.lifecycle_commands.defined() {
        let command = script
            .command_config(action, client.config(), OutputMap::new())
            .map_err(config_error)?;
        let interpreter = Interpreter::resolve(command.interpreter(), client.default_interpreter());
        let env = compose(
            Vec::<(String, String)>::new(),
            command.environment(),
            command.sensitive_environment(),
        );
        plans.push(ActionPlan {
            action: action.to_string(),
            interpreter: interpreter.tokens(),
            command: command.command().to_owned(),
            arguments: command.arguments().to_vec(),
            working_directory: command.working_directory().display().to_string(),
            environment: env.redacted(),
            timeout_secs: command
                .timeout()
                .or_else(|| client.config().timeout())
                .map(|t| t.as_secs()),
        });
    }

    if json {
        println!("{}", json_pretty(&plans)?);
    } else {
        println!("{} is valid", script_path.display());
        for plan in &plans {
            println!("\n[{}]", plan.action);
            println!("  interpreter: {}", plan.interpreter.join(" "));
            println!("  command:     {}", plan.command);
            if !plan.arguments.is_empty() {
                println!("  arguments:   {}", plan.arguments.join(" "));
            }
            println!("  directory:   {}", plan.working_directory);
            if let Some(secs) = plan.timeout_secs {
                println!("  timeout:     {secs}s");
            }
            for entry in &plan.environment {
                println!("  env:         {entry}");
            }
        }
    }
    Ok(EXIT_SUCCESS)
}
