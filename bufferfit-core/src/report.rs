//! Console rendering of sweep results.

use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::config::SweepConfig;
use crate::model::{Evaluation, QueueModel};
use crate::sweep::{BufferSweep, FeasiblePoint, Termination, Topology};

/// Output encoding for result lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Renders a float in shortest round-trip form.
///
/// Magnitudes in `[1e-4, 1e16)` are written as plain decimals with at least
/// one fractional digit; everything else uses scientific notation with a
/// signed exponent of at least two digits.
///
/// # Examples
/// ```
/// use bufferfit_core::report::format_metric;
///
/// assert_eq!(format_metric(1.0), "1.0");
/// assert_eq!(format_metric(0.0001), "0.0001");
/// assert_eq!(format_metric(2.5e-7), "2.5e-07");
/// ```
pub fn format_metric(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-4..1e16).contains(&magnitude) {
        let decimal = value.to_string();
        return if decimal.contains('.') {
            decimal
        } else {
            format!("{decimal}.0")
        };
    }

    let scientific = format!("{value:e}");
    match scientific.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}e{sign}{digits:0>2}")
        }
        None => scientific,
    }
}

/// Writes the banner that precedes a sweep.
///
/// # Errors
///
/// - `BufferfitError::Io` - If the writer fails
pub fn write_banner(out: &mut impl Write, topology: Topology, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Text {
        writeln!(out, "{}", topology.banner())?;
    }
    Ok(())
}

/// Writes one feasible point.
///
/// # Errors
///
/// - `BufferfitError::Io` - If the writer fails
/// - `BufferfitError::Serialization` - If JSON encoding fails
pub fn write_point(
    out: &mut impl Write,
    topology: Topology,
    point: &FeasiblePoint,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(
                out,
                "System fits requirements for {} users and buffer {}",
                point.users, point.buffer
            )?;
            writeln!(
                out,
                "Loss {}, {} {}",
                format_metric(point.loss),
                topology.delay_label(),
                format_metric(point.delay)
            )?;
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Line<'a> {
                topology: Topology,
                #[serde(flatten)]
                point: &'a FeasiblePoint,
            }
            serde_json::to_writer(&mut *out, &Line { topology, point })?;
            writeln!(out)?;
        }
    }
    Ok(())
}

/// Runs one sweep, writing its banner and every feasible point as found.
///
/// Output already written stays in place if the model fails part way.
///
/// # Errors
///
/// - `BufferfitError::Model` - If the model cannot be evaluated at a swept point
/// - `BufferfitError::Io` - If the writer fails
pub fn write_sweep(
    out: &mut impl Write,
    model: &QueueModel,
    config: &SweepConfig,
    topology: Topology,
    format: OutputFormat,
) -> Result<Termination> {
    write_banner(out, topology, format)?;
    BufferSweep::new(model, config, topology)
        .run_with(|point| write_point(&mut *out, topology, point, format))
}

/// Writes every metric of one evaluated point.
///
/// # Errors
///
/// - `BufferfitError::Io` - If the writer fails
/// - `BufferfitError::Serialization` - If JSON encoding fails
pub fn write_evaluation(
    out: &mut impl Write,
    evaluation: &Evaluation,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(
                out,
                "Users {}, buffer {}",
                evaluation.users, evaluation.buffer
            )?;
            writeln!(out, "Load {}", format_metric(evaluation.load))?;
            writeln!(out, "Loss {}", format_metric(evaluation.loss))?;
            writeln!(out, "Mean calls {}", format_metric(evaluation.mean_calls))?;
            writeln!(
                out,
                "delay_multiple {}, delay_single {}",
                format_metric(evaluation.delay_multiple),
                format_metric(evaluation.delay_single)
            )?;
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, evaluation)?;
            writeln!(out)?;
        }
    }
    Ok(())
}
