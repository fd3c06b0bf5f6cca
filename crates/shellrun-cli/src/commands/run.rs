use super::{
    colorize_drift, config_error, json_pretty, load_script, spin_fail, spin_ok, spinner,
    EXIT_SUCCESS,
};
use indicatif::ProgressBar;
use shellrun_core::{Client, CoreError, ReadOutcome};
use shellrun_runtime::{render_output, CancelToken};
use shellrun_schema::{load_output_file, Action, OutputMap};
use std::path::Path;

pub fn run(
    client: &Client,
    script_path: &Path,
    action: Action,
    previous: Option<&Path>,
    cancel: &CancelToken,
    json: bool,
) -> Result<u8, String> {
    let script = load_script(script_path)?;
    let previous_output = match previous {
        Some(path) => load_output_file(path)
            .map_err(|e| config_error(format!("{}: {e}", path.display())))?,
        None => OutputMap::new(),
    };
    let command = script
        .command_config(action, client.config(), previous_output)
        .map_err(config_error)?;

    let pb = (!json).then(|| spinner(&format!("running {action} command...")));
    let pb = pb.as_ref();

    match action {
        Action::Read => {
            let outcome = finish(pb, action, client.read(&command, cancel))?;
            if json {
                println!("{}", json_pretty(&outcome)?);
            } else {
                match &outcome {
                    ReadOutcome::Absent => println!("absent"),
                    ReadOutcome::Present(output) => print!("{}", render_output(output)),
                }
            }
        }
        Action::Update => {
            let result = finish(pb, action, client.update(&command, cancel))?;
            if json {
                println!("{}", json_pretty(&result)?);
            } else {
                print!("{}", render_output(&result.output));
                if previous.is_some() {
                    eprintln!(
                        "output {} from previous",
                        colorize_drift(result.drift.has_drift)
                    );
                }
            }
        }
        Action::Create | Action::Delete => {
            let output = finish(pb, action, client.execute(&command, cancel))?;
            if json {
                println!("{}", json_pretty(&output)?);
            } else {
                print!("{}", render_output(&output));
            }
        }
    }
    Ok(EXIT_SUCCESS)
}

fn finish<T>(
    pb: Option<&ProgressBar>,
    action: Action,
    result: Result<T, CoreError>,
) -> Result<T, String> {
    if let Some(pb) = pb {
        match &result {
            Ok(_) => spin_ok(pb, &format!("{action} command finished")),
            Err(_) => spin_fail(pb, &format!("{action} command failed")),
        }
    }
    result.map_err(|e| e.to_string())
}
