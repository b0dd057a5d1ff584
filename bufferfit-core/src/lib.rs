//! Bufferfit Core - Finite-buffer queue model and buffer sizing sweeps
//!
//! This crate evaluates the closed-form steady-state formulas of a single
//! server Markov queue with finite capacity (M/M/1/K) and sweeps user counts
//! and buffer sizes to find configurations that keep both loss probability
//! and mean delay under configured limits.
//!
//! Two buffer topologies are modelled: one buffer shared by every user and
//! one dedicated buffer per user.

pub mod config;
pub mod invariants;
pub mod model;
pub mod report;
pub mod sweep;
pub mod tracing_setup;

// Re-export main types for convenient access
pub use config::{BufferfitConfig, ConfigError, ModelConfig, SweepConfig};
pub use invariants::{InvariantViolation, ModelInvariant, check_all};
pub use model::{Evaluation, ModelError, QueueModel};
pub use report::{OutputFormat, format_metric};
pub use sweep::{BufferSweep, FeasiblePoint, SweepReport, Termination, Topology};

/// Errors that can bubble up from any Bufferfit subsystem.
#[derive(Debug, thiserror::Error)]
pub enum BufferfitError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("{count} invariant violation(s), first: {first}")]
    InvariantsViolated {
        count: usize,
        first: InvariantViolation,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl BufferfitError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            BufferfitError::Config(e) => format!("Invalid parameters: {e}"),
            BufferfitError::Model(ModelError::DegenerateLoad { users, load, .. }) => {
                format!("Load {load} for {users} users makes the queue formulas undefined")
            }
            BufferfitError::Model(_) => "Model evaluation failed".to_string(),
            BufferfitError::InvariantsViolated { count, .. } => {
                format!("Model self-check found {count} violation(s)")
            }
            BufferfitError::Io(_) => "Could not write output".to_string(),
            BufferfitError::Serialization(_) => "Could not encode output".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BufferfitError::Config(_) | BufferfitError::Model(ModelError::NoUsers)
        )
    }
}

pub type Result<T> = std::result::Result<T, BufferfitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_is_user_error() {
        let error = BufferfitError::from(ConfigError::InvalidParameter {
            name: "max_loss",
            value: 2.0,
            reason: "must be in [0, 1)",
        });
        assert!(error.is_user_error());
        assert!(error.user_message().starts_with("Invalid parameters"));
    }

    #[test]
    fn test_degenerate_load_message_names_users() {
        let error = BufferfitError::from(ModelError::DegenerateLoad {
            users: 240,
            queue: 10,
            load: 1.0,
        });
        assert!(!error.is_user_error());
        assert!(error.user_message().contains("240 users"));
    }
}
