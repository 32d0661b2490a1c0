//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[inline]
pub fn json_mode() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

#[derive(Parser, Debug)]
#[command(name = "capscale", version, about = "Capacitive scale calibration CLI")]
pub struct Cli {
    /// Path to config TOML (defaults apply when omitted)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Emit JSON lines instead of human text
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); RUST_LOG wins when set
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a calibration session CSV and report the fitted model
    Fit {
        /// Session CSV with headers real_weight_g,adc_raw,tare
        #[arg(long, value_name = "FILE")]
        samples: PathBuf,
        /// Write the sample table (with active predictions) to this CSV
        #[arg(long, value_name = "FILE")]
        export: Option<PathBuf>,
    },
    /// Interactive or scripted calibration over the simulated sensor
    Session {
        /// Read commands from this file instead of stdin
        #[arg(long, value_name = "FILE")]
        script: Option<PathBuf>,
    },
    /// Construct the stack and take one reading
    SelfCheck,
}
