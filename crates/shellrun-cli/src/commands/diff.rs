use super::{colorize_drift, config_error, json_pretty, EXIT_SUCCESS};
use shellrun_core::diff_outputs;
use shellrun_schema::load_output_file;
use std::path::Path;

pub fn run(previous: &Path, current: &Path, json: bool) -> Result<u8, String> {
    let load = |path: &Path| {
        load_output_file(path).map_err(|e| config_error(format!("{}: {e}", path.display())))
    };
    let drift = diff_outputs(&load(previous)?, &load(current)?);

    if json {
        println!("{}", json_pretty(&drift)?);
    } else if drift.has_drift {
        println!("output {}:", colorize_drift(true));
        for key in &drift.added {
            println!("  + {key}");
        }
        for key in &drift.changed {
            println!("  ~ {key}");
        }
        for key in &drift.removed {
            println!("  - {key}");
        }
    } else {
        println!("output {}", colorize_drift(false));
    }
    Ok(EXIT_SUCCESS)
}
