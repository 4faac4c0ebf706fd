//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

/// Which node feeds the head of the pipeline.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default, ValueEnum)]
pub enum SourceKind {
    /// Simulated analog sensor (noisy sine)
    #[default]
    Sensor,
    /// Free-running oscillator
    Oscillator,
}

#[derive(Parser, Debug)]
#[command(name = "lockstep", version, about = "Signal pipeline runner")]
pub struct Cli {
    /// Path to config TOML
    #[arg(long, value_name = "FILE", default_value = "etc/lockstep.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the configured pipeline against real time
    Run {
        /// Head of the pipeline
        #[arg(long, value_enum, default_value = "sensor")]
        source: SourceKind,
        /// Override run time in seconds (takes precedence over config)
        #[arg(long, value_name = "SECONDS")]
        run_s: Option<f32>,
        /// Override tick rate in Hz (takes precedence over config)
        #[arg(long, value_name = "HZ")]
        tick_hz: Option<u32>,
        /// Print per-second pipeline output summaries
        #[arg(long, action = ArgAction::SetTrue)]
        print_output: bool,
    },
    /// Parse and validate the config, then exit
    Check,
}
