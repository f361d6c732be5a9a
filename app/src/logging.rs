//! FILENAME: app/src/logging.rs
// PURPOSE: Unified logging for the CLI and the engine crates.
// FORMAT: seq|level|category|message, written to stderr.

use std::io::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{Level, LevelFilter};

/// Global sequence counter shared by every log line.
static LOG_SEQ: AtomicU64 = AtomicU64::new(0);

/// Get next sequence number
pub fn next_seq() -> u64 {
    LOG_SEQ.fetch_add(1, Ordering::SeqCst) + 1
}

fn level_letter(level: Level) -> &'static str {
    match level {
        Level::Error => "E",
        Level::Warn => "W",
        Level::Info => "I",
        Level::Debug => "D",
        Level::Trace => "T",
    }
}

/// Installs the logger. `RUST_LOG` overrides the default level, which is
/// `warn`, or `debug` with `verbose`. The category is the log target, so
/// engine lines read `pivot` and CLI lines read their own category.
pub fn init(verbose: bool) {
    let default_level = if verbose { LevelFilter::Debug } else { LevelFilter::Warn };

    let result = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .format(|buf, record| {
            writeln!(
                buf,
                "{}|{}|{}|{}",
                next_seq(),
                level_letter(record.level()),
                record.target(),
                record.args()
            )
        })
        .try_init();

    if let Err(e) = result {
        eprintln!("[LOG_INIT] Logger already installed: {}", e);
    }
}

// ============================================================================
// MACRO DEFINITIONS
// ============================================================================

#[macro_export]
macro_rules! log_debug {
    ($cat:expr, $($arg:tt)*) => {
        log::debug!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_info {
    ($cat:expr, $($arg:tt)*) => {
        log::info!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_warn {
    ($cat:expr, $($arg:tt)*) => {
        log::warn!(target: $cat, $($arg)*)
    };
}

#[macro_export]
macro_rules! log_perf {
    ($cat:expr, $label:expr, $start:expr) => {
        log::debug!(target: $cat, "PERF {} took {:?}", $label, $start.elapsed())
    };
}
