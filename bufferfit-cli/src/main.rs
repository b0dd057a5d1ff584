//! Bufferfit CLI - Command-line interface
//!
//! Sizes buffers for a finite M/M/1/K queue shared by, or dedicated to, a
//! growing number of users.

mod commands;

use std::process::ExitCode;

use bufferfit_core::OutputFormat;
use bufferfit_core::tracing_setup::{CliLogLevel, init_tracing};
use clap::{Args, Parser};

#[derive(Parser)]
#[command(name = "bufferfit")]
#[command(about = "Buffer sizing for finite M/M/1/K queues")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<commands::Commands>,

    /// Console log level (RUST_LOG overrides)
    #[arg(long, value_enum, default_value_t = CliLogLevel::Warn, global = true)]
    log_level: CliLogLevel,

    /// Result encoding
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    format: OutputFormat,

    #[command(flatten)]
    overrides: ParameterOverrides,
}

/// Command-line overrides of the model parameters.
///
/// Applied on top of the defaults and any `BUFFERFIT_*` environment variables.
#[derive(Args, Debug, Default, Clone, Copy)]
pub struct ParameterOverrides {
    /// Mean interval between requests of one user, in seconds
    #[arg(long, global = true)]
    pub mean_interval: Option<f64>,
    /// Mean document length in bytes
    #[arg(long, global = true)]
    pub mean_length: Option<f64>,
    /// Processor throughput in bytes per second
    #[arg(long, global = true)]
    pub processor_speed: Option<f64>,
    /// Largest acceptable loss probability
    #[arg(long, global = true)]
    pub max_loss: Option<f64>,
    /// Largest acceptable delay, as a multiple of the mean service time
    #[arg(long, global = true)]
    pub multiplication_max: Option<f64>,
    /// Ceiling on the number of users tried
    #[arg(long, global = true)]
    pub max_users: Option<u32>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.log_level.as_tracing_level()) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match commands::handle_command(cli.command, cli.overrides, cli.format) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
