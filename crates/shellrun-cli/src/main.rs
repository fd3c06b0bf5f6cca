mod commands;

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::exit_code_for;
use shellrun_core::install_signal_handler;
use shellrun_runtime::CancelToken;
use shellrun_schema::Action;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "shellrun",
    version,
    about = "Run lifecycle scripts and collect their KEY=VALUE output"
)]
struct Cli {
    /// Client configuration file (interpreter, environment, parallelism).
    #[arg(long, env = "SHELLRUN_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one lifecycle command from a script definition.
    Run {
        /// Lifecycle action: create, read, update or delete.
        action: Action,
        /// Path to the script definition TOML file.
        #[arg(long, default_value = "shellrun.toml")]
        script: PathBuf,
        /// JSON file holding the previously recorded output.
        #[arg(long)]
        previous: Option<PathBuf>,
    },
    /// Validate configuration and show what each action would run.
    Check {
        /// Path to the script definition TOML file.
        #[arg(long, default_value = "shellrun.toml")]
        script: PathBuf,
    },
    /// Compare two recorded outputs.
    Diff {
        /// Previously recorded output (JSON object).
        previous: PathBuf,
        /// Current output (JSON object).
        current: PathBuf,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("SHELLRUN_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let cancel = CancelToken::new();
    install_signal_handler(cancel.clone());

    let config_path = cli.config.as_deref();
    let json_output = cli.json;

    let result = match cli.command {
        Commands::Run {
            action,
            script,
            previous,
        } => commands::load_client(config_path).and_then(|client| {
            commands::run::run(
                &client,
                &script,
                action,
                previous.as_deref(),
                &cancel,
                json_output,
            )
        }),
        Commands::Check { script } => commands::load_client(config_path)
            .and_then(|client| commands::check::run(&client, &script, json_output)),
        Commands::Diff { previous, current } => {
            commands::diff::run(&previous, &current, json_output)
        }
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}
