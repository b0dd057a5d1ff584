//! CLI command implementations

use std::io::{self, Write};

use anyhow::Context;
use bufferfit_core::invariants::default_invariants;
use bufferfit_core::report::{write_evaluation, write_sweep};
use bufferfit_core::{
    BufferSweep, BufferfitConfig, BufferfitError, OutputFormat, QueueModel, Result, Termination,
    Topology, check_all,
};
use clap::{Subcommand, ValueEnum};
use tracing::info;

use crate::ParameterOverrides;

/// Available CLI commands
#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Sweep user counts and buffer sizes, printing every feasible pair
    Sweep {
        /// Buffer topology to size
        #[arg(long, value_enum, default_value_t = TopologyArg::Both)]
        topology: TopologyArg,
    },
    /// Print every metric for one user count and buffer size
    Evaluate {
        /// Number of independent users
        #[arg(short, long)]
        users: u32,
        /// Buffer capacity, including the document in service
        #[arg(short, long)]
        buffer: u32,
    },
    /// Run both sweeps silently and verify the model invariants
    Check,
}

impl Default for Commands {
    fn default() -> Self {
        Self::Sweep {
            topology: TopologyArg::Both,
        }
    }
}

/// Topology selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TopologyArg {
    /// One buffer shared by all users
    Multiple,
    /// One dedicated buffer per user
    Single,
    /// Shared first, then dedicated
    Both,
}

impl TopologyArg {
    fn topologies(self) -> &'static [Topology] {
        match self {
            Self::Multiple => &[Topology::MultipleQueues],
            Self::Single => &[Topology::SingleQueue],
            Self::Both => &Topology::ALL,
        }
    }
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub fn handle_command(
    command: Option<Commands>,
    overrides: ParameterOverrides,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = resolve_config(overrides).context("Invalid parameters")?;
    let mut out = io::BufWriter::new(io::stdout().lock());

    let result = match command.unwrap_or_default() {
        Commands::Sweep { topology } => {
            run_sweeps(&mut out, &config, topology.topologies(), format).map(|_| ())
        }
        Commands::Evaluate { users, buffer } => {
            run_evaluation(&mut out, &config, users, buffer, format)
        }
        Commands::Check => run_check(&mut out, &config),
    };

    out.flush().context("Failed to flush output")?;
    result.map_err(|e| {
        let message = e.user_message();
        anyhow::Error::new(e).context(message)
    })
}

/// Builds configuration from defaults, environment, then command-line flags.
///
/// # Errors
/// - `BufferfitError::Config` - If the resulting parameters are invalid
pub fn resolve_config(overrides: ParameterOverrides) -> Result<BufferfitConfig> {
    let mut config = BufferfitConfig::from_env();
    apply_overrides(&mut config, overrides);
    config.validate()?;
    Ok(config)
}

fn apply_overrides(config: &mut BufferfitConfig, overrides: ParameterOverrides) {
    let model = &mut config.model;
    if let Some(value) = overrides.mean_interval {
        model.mean_interval = value;
    }
    if let Some(value) = overrides.mean_length {
        model.mean_length = value;
    }
    if let Some(value) = overrides.processor_speed {
        model.processor_speed = value;
    }
    if let Some(value) = overrides.max_loss {
        model.max_loss = value;
    }
    if let Some(value) = overrides.multiplication_max {
        model.multiplication_max = value;
    }
    if let Some(value) = overrides.max_users {
        config.sweep.max_users = value;
    }
}

/// Runs the sweeps for each topology in order.
///
/// # Errors
/// - `BufferfitError::Model` - A swept point has degenerate load; earlier output is kept
/// - `BufferfitError::Io` - Writing results failed
pub fn run_sweeps(
    out: &mut impl Write,
    config: &BufferfitConfig,
    topologies: &[Topology],
    format: OutputFormat,
) -> Result<Vec<Termination>> {
    let model = QueueModel::new(config.model)?;
    info!(one_user_load = model.one_user_load(), "Model ready");

    topologies
        .iter()
        .map(|&topology| write_sweep(&mut *out, &model, &config.sweep, topology, format))
        .collect()
}

/// Prints every metric of one point.
///
/// # Errors
/// - `BufferfitError::Model` - The point cannot be evaluated
/// - `BufferfitError::Io` - Writing results failed
pub fn run_evaluation(
    out: &mut impl Write,
    config: &BufferfitConfig,
    users: u32,
    buffer: u32,
    format: OutputFormat,
) -> Result<()> {
    let model = QueueModel::new(config.model)?;
    let evaluation = model.evaluate(users, buffer)?;
    write_evaluation(out, &evaluation, format)
}

/// Runs both sweeps and checks every invariant against their reports.
///
/// # Errors
/// - `BufferfitError::InvariantsViolated` - At least one invariant failed
/// - `BufferfitError::Model` - A swept point has degenerate load
pub fn run_check(out: &mut impl Write, config: &BufferfitConfig) -> Result<()> {
    let model = QueueModel::new(config.model)?;
    let invariants = default_invariants(config.sweep.min_buffer, config.sweep.max_buffer);
    let mut violations = Vec::new();

    for topology in Topology::ALL {
        let report = BufferSweep::new(&model, &config.sweep, topology).run()?;
        let found = check_all(&invariants, &model, &report);

        let max_users = report
            .max_users()
            .map_or_else(|| "none".to_string(), |users| users.to_string());
        writeln!(
            out,
            "{topology}: {} feasible points, max users {max_users}, {} violation(s)",
            report.points.len(),
            found.len()
        )?;
        for violation in &found {
            writeln!(out, "  {violation}")?;
        }
        violations.extend(found);
    }

    match violations.first() {
        Some(first) => Err(BufferfitError::InvariantsViolated {
            count: violations.len(),
            first: first.clone(),
        }),
        None => Ok(()),
    }
}
