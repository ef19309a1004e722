//! Configuration parsing and validation

use crate::constants::{camilla, mixer, state, table, volume};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Command line arguments for the dummyvol2cdsp application
#[derive(Parser)]
#[command(name = "dummyvol2cdsp")]
#[command(about = "Forward ALSA dummy mixer volume to CamillaDSP", version)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Follow the mixer and forward every change to CamillaDSP (default)
    Run(RunArgs),
    /// List playback volume controls on a device
    List(ListArgs),
    /// Print the percentage to dB mapping
    Curve(CurveArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Dynamic range of the volume slider in dB (50-100 is sensible)
    #[arg(long, default_value_t = volume::DEFAULT_RANGE_DB)]
    pub range: f64,

    /// CamillaDSP websocket host
    #[arg(long, default_value = camilla::DEFAULT_HOST)]
    pub host: String,

    /// CamillaDSP websocket port
    #[arg(long, default_value_t = camilla::DEFAULT_PORT)]
    pub port: u16,

    /// Timeout for a single CamillaDSP request in milliseconds
    #[arg(long, default_value_t = camilla::REQUEST_TIMEOUT_MS)]
    pub timeout_ms: u64,

    /// ALSA dummy device name
    #[arg(long, default_value = mixer::DEFAULT_DEVICE)]
    pub device: String,

    /// ALSA dummy mixer control name
    #[arg(long, default_value = mixer::DEFAULT_CONTROL)]
    pub control: String,

    /// File receiving the last volume and mute state
    #[arg(long, default_value = state::DEFAULT_STATE_FILE)]
    pub state_file: PathBuf,

    /// Log every request sent to CamillaDSP
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Parser)]
pub struct ListArgs {
    /// ALSA device name
    #[arg(long, default_value = mixer::DEFAULT_DEVICE)]
    pub device: String,
}

#[derive(Parser)]
pub struct CurveArgs {
    /// Dynamic range of the volume slider in dB
    #[arg(long, default_value_t = volume::DEFAULT_RANGE_DB)]
    pub range: f64,

    /// Percentage step between rows
    #[arg(long, default_value_t = table::DEFAULT_STEP, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub step: u8,

    /// Output only the dB values without labels
    #[arg(long)]
    pub quiet: bool,
}

/// Synchronizer configuration derived from command line arguments
pub struct Config {
    pub range_db: f64,
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
    pub device: String,
    pub control: String,
    pub state_file: PathBuf,
}

/// Check that a dynamic range is usable for the volume curve
pub fn validate_range(range_db: f64) -> Result<(), Box<dyn std::error::Error>> {
    if !range_db.is_finite() || range_db <= 0.0 || range_db > volume::MAX_RANGE_DB {
        return Err(format!(
            "Range must be above 0 and at most {} dB, got {}",
            volume::MAX_RANGE_DB,
            range_db
        )
        .into());
    }
    Ok(())
}

impl Config {
    /// Create configuration from run arguments
    pub fn from_run_args(run_args: RunArgs) -> Result<Self, Box<dyn std::error::Error>> {
        validate_range(run_args.range)?;

        if run_args.host.trim().is_empty() {
            return Err("Host must not be empty".into());
        }

        if run_args.control.trim().is_empty() {
            return Err("Mixer control must not be empty".into());
        }

        if run_args.timeout_ms == 0 {
            return Err("Timeout must be positive".into());
        }

        Ok(Config {
            range_db: run_args.range,
            host: run_args.host,
            port: run_args.port,
            timeout: Duration::from_millis(run_args.timeout_ms),
            device: run_args.device,
            control: run_args.control,
            state_file: run_args.state_file,
        })
    }
}
