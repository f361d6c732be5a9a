//! FILENAME: app/src/cli.rs
// PURPOSE: Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Pivot flat JSON records into grouped rows, columns and grand totals
#[derive(Parser, Debug)]
#[command(name = "pivot", author, version, about, long_about = None)]
pub struct Cli {
    /// Log engine decisions (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transform records with a pivot configuration and print the result
    Transform {
        #[command(flatten)]
        input: InputArgs,

        /// Write the result to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Add display strings for every calculated cell
        #[arg(long)]
        format_calculated: bool,
    },

    /// Check a configuration and its calculated-field formulas
    Validate {
        /// Pivot configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Records used to resolve column values for formula checks
        #[arg(short, long)]
        records: Option<PathBuf>,

        /// Save the configuration as a versioned document when it is valid
        #[arg(long)]
        normalize: Option<PathBuf>,
    },

    /// List the source records behind one pivot cell
    DrillDown {
        #[command(flatten)]
        input: InputArgs,

        /// Group key of the row ("all" without row fields)
        #[arg(short, long)]
        group: String,

        /// Column value; numbers, booleans and null are read as JSON
        #[arg(long)]
        column: Option<String>,

        /// Maximum number of records to return
        #[arg(short, long, default_value_t = 1000)]
        max_records: usize,
    },
}

#[derive(Args, Debug, Clone)]
pub struct InputArgs {
    /// Source records (JSON array of objects)
    #[arg(short, long)]
    pub records: PathBuf,

    /// Pivot configuration (JSON)
    #[arg(short, long)]
    pub config: PathBuf,
}
