//! FILENAME: app/src/main.rs
// PURPOSE: Command-line entry point. Results go to stdout, logs to stderr.
// FORMAT: seq|level|category|message

use std::process::ExitCode;

fn main() -> ExitCode {
    app_lib::run()
}
