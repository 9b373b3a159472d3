//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Parcel Track - Multi-camera parcel re-identification pipeline
#[derive(Parser, Debug)]
#[command(
    name = "parcel-track",
    author,
    version,
    about = "Multi-camera parcel conveyor tracking pipeline",
    long_about = "A multi-camera re-identification pipeline for conveyor-belt parcels.\n\n\
                  Synchronizes camera streams into receive-time windows, matches \n\
                  detections against scanner-created master records with FIFO stage \n\
                  queues, and pushes position and lifecycle events downstream."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "PARCEL_TRACK_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "PARCEL_TRACK_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the tracking pipeline
    Run(RunArgs),

    /// Validate configuration file without running
    Validate(ValidateArgs),

    /// Display configuration information
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// Path to configuration file (TOML or JSON)
    #[arg(
        short,
        long,
        default_value = "config.toml",
        env = "PARCEL_TRACK_CONFIG"
    )]
    pub config: PathBuf,

    /// Maximum number of windows to process (0 = unlimited)
    #[arg(long, default_value = "0", env = "PARCEL_TRACK_MAX_WINDOWS")]
    pub max_windows: u64,

    /// Pipeline timeout in seconds (0 = no timeout)
    #[arg(long, default_value = "0", env = "PARCEL_TRACK_TIMEOUT")]
    pub timeout: u64,

    /// Validate configuration and exit without running pipeline
    #[arg(long)]
    pub dry_run: bool,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "100", env = "PARCEL_TRACK_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Metrics server port (0 = disabled)
    #[arg(long, default_value = "9000", env = "PARCEL_TRACK_METRICS_PORT")]
    pub metrics_port: u16,

    /// Frame rate of the mock camera sources (Hz)
    #[arg(long, default_value = "10.0", env = "PARCEL_TRACK_MOCK_FPS")]
    pub mock_fps: f64,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Show detailed camera information
    #[arg(long)]
    pub cameras: bool,

    /// Show notifier configuration
    #[arg(long)]
    pub notifiers: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}
