//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

use fillmon_core::TankId;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "fillmon", version, about = "Fill-line session monitor")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/fillmon.toml")]
    pub config: PathBuf,

    /// Print results and logs as JSON lines instead of text
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
    /// Replay a recorded unit-weight capture through one session
    Replay {
        /// Tank to fill (`5` or `tk5`)
        #[arg(long)]
        tank: TankId,
        /// Process order TOML
        #[arg(long, value_name = "FILE")]
        order: PathBuf,
        /// Capture CSV with headers `t_ms,weight_kg`
        #[arg(long, value_name = "FILE")]
        samples: PathBuf,
    },
    /// Run one session against the simulated line
    Simulate {
        /// Tank to fill (`5` or `tk5`)
        #[arg(long)]
        tank: TankId,
        /// Process order TOML
        #[arg(long, value_name = "FILE")]
        order: PathBuf,
        /// Units to produce before stopping
        #[arg(long)]
        units: u64,
        /// Milliseconds between units
        #[arg(long, value_name = "MS", default_value_t = 2000)]
        cycle_ms: u64,
        /// Seed for the weight generator
        #[arg(long, default_value_t = 1)]
        seed: u32,
        /// Inventory in the tank when the session starts
        #[arg(long, value_name = "KG", default_value_t = 5000.0)]
        tank_kg: f64,
        /// Pace readings on the wall clock through the event loop (Ctrl-C stops)
        #[arg(long, action = ArgAction::SetTrue)]
        realtime: bool,
    },
    /// Feed `{"topic","payload"}` JSON lines through the event loop
    Listen {
        /// Read messages from a file instead of stdin
        #[arg(long, value_name = "FILE")]
        input: Option<PathBuf>,
    },
    /// Validate the config and print the line layout
    SelfCheck,
}
