//! FILENAME: app/src/lib.rs
// PURPOSE: Main library entry point for the `pivot` command-line host.
// CONTEXT: Loads inputs through `persistence`, runs `pivot-engine`, prints JSON.

use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use serde::Serialize;

pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::{Cli, Commands, InputArgs};
pub use commands::{
    drill_down_command, parse_column_value, transform_command, validate_command, DrillDownOutput,
    FormattedCalculated, TransformOutput, ValidationReport,
};

/// Parses the command line, installs logging and runs the command.
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match execute(cli.command) {
        Ok(code) => code,
        Err(e) => {
            log_warn!("CMD", "command failed: {}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Runs one command. Invalid configurations found by `validate` exit with
/// failure after printing their report.
pub fn execute(command: Commands) -> Result<ExitCode, String> {
    match command {
        Commands::Transform {
            input,
            output,
            format_calculated,
        } => {
            let out = transform_command(&input, format_calculated)?;
            match (&output, &out.formatted_calculated) {
                (Some(path), None) => persistence::save_result(&out.result, path)
                    .map_err(|e| format!("{}: {}", path.display(), e))?,
                _ => emit(&out, output.as_deref())?,
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate {
            config,
            records,
            normalize,
        } => {
            let report = validate_command(&config, records.as_deref(), normalize.as_deref())?;
            emit(&report, None)?;
            Ok(if report.valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::DrillDown {
            input,
            group,
            column,
            max_records,
        } => {
            let out = drill_down_command(&input, &group, column.as_deref(), max_records)?;
            emit(&out, None)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Pretty JSON to `path`, or to stdout.
fn emit<T: Serialize>(value: &T, path: Option<&Path>) -> Result<(), String> {
    let json = serde_json::to_string_pretty(value).map_err(|e| e.to_string())?;
    match path {
        Some(path) => std::fs::write(path, json + "\n").map_err(|e| format!("{}: {}", path.display(), e)),
        None => {
            println!("{}", json);
            Ok(())
        }
    }
}
