//! Centralized configuration for Bufferfit.
//!
//! Model parameters and sweep bounds are defined here so the evaluator and
//! the sweep drivers never read process-wide state.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Central configuration for all Bufferfit components.
///
/// Supports environment variable overrides for runtime customization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BufferfitConfig {
    pub model: ModelConfig,
    pub sweep: SweepConfig,
}

/// Traffic, capacity and service-level parameters of the queue model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Mean interval between requests of one user, in seconds
    pub mean_interval: f64,
    /// Mean document length in bytes
    pub mean_length: f64,
    /// Processor throughput in bytes per second
    pub processor_speed: f64,
    /// Largest acceptable loss probability (exclusive)
    pub max_loss: f64,
    /// Largest acceptable mean delay, as a multiple of `mean_length / processor_speed`
    pub multiplication_max: f64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            mean_interval: 6.0,
            mean_length: 600.0,
            processor_speed: 24000.0,
            max_loss: 0.001,
            multiplication_max: 5.0,
        }
    }
}

impl ModelConfig {
    /// Checks that every parameter lies in its meaningful domain.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - If a parameter is non-finite or out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("mean_interval", self.mean_interval)?;
        require_positive("mean_length", self.mean_length)?;
        require_positive("processor_speed", self.processor_speed)?;

        if !(0.0..1.0).contains(&self.max_loss) {
            return Err(ConfigError::InvalidParameter {
                name: "max_loss",
                value: self.max_loss,
                reason: "must be in [0, 1)",
            });
        }
        if !self.multiplication_max.is_finite() || self.multiplication_max < 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "multiplication_max",
                value: self.multiplication_max,
                reason: "must be finite and non-negative",
            });
        }
        Ok(())
    }
}

fn require_positive(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidParameter {
            name,
            value,
            reason: "must be finite and positive",
        })
    }
}

/// Bounds of the user and buffer sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepConfig {
    /// Smallest buffer size tried for each user count
    pub min_buffer: u32,
    /// Largest buffer size tried for each user count (inclusive)
    pub max_buffer: u32,
    /// Hard ceiling on the user count, reached only if load falls off too slowly
    pub max_users: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            min_buffer: 1,
            max_buffer: 99,
            max_users: 10_000,
        }
    }
}

impl SweepConfig {
    /// Checks that the sweep ranges are non-empty.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidSweep` - If a range is empty or starts at zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_buffer == 0 {
            return Err(ConfigError::InvalidSweep {
                reason: "min_buffer must be at least 1".to_string(),
            });
        }
        if self.min_buffer > self.max_buffer {
            return Err(ConfigError::InvalidSweep {
                reason: format!(
                    "min_buffer {} exceeds max_buffer {}",
                    self.min_buffer, self.max_buffer
                ),
            });
        }
        if self.max_users == 0 {
            return Err(ConfigError::InvalidSweep {
                reason: "max_users must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

impl BufferfitConfig {
    /// Creates configuration with environment variable overrides.
    ///
    /// Values that fail to parse are reported and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Separated from [`BufferfitConfig::from_env`] so tests do not touch the
    /// process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let model = &mut config.model;

        override_value(&lookup, "BUFFERFIT_MEAN_INTERVAL", &mut model.mean_interval);
        override_value(&lookup, "BUFFERFIT_MEAN_LENGTH", &mut model.mean_length);
        override_value(&lookup, "BUFFERFIT_PROCESSOR_SPEED", &mut model.processor_speed);
        override_value(&lookup, "BUFFERFIT_MAX_LOSS", &mut model.max_loss);
        override_value(
            &lookup,
            "BUFFERFIT_MULTIPLICATION_MAX",
            &mut model.multiplication_max,
        );
        override_value(&lookup, "BUFFERFIT_MAX_USERS", &mut config.sweep.max_users);

        config
    }

    /// Validates both the model and the sweep sections.
    ///
    /// # Errors
    ///
    /// - `ConfigError` - If either section is invalid
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.model.validate()?;
        self.sweep.validate()
    }
}

fn override_value<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring unparsable {key}={raw:?}, keeping default"),
        }
    }
}

/// Errors raised while validating configuration.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A model parameter is outside its domain
    #[error("{name} = {value} {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    /// Sweep bounds describe an empty search
    #[error("Invalid sweep bounds: {reason}")]
    InvalidSweep { reason: String },
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn test_default_config_matches_reference_parameters() {
        let config = BufferfitConfig::default();
        assert_eq!(config.model.mean_interval, 6.0);
        assert_eq!(config.model.mean_length, 600.0);
        assert_eq!(config.model.processor_speed, 24000.0);
        assert_eq!(config.model.max_loss, 0.001);
        assert_eq!(config.model.multiplication_max, 5.0);
        assert_eq!(config.sweep.min_buffer, 1);
        assert_eq!(config.sweep.max_buffer, 99);
        assert_eq!(config.sweep.max_users, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_lookup_overrides_and_ignores_garbage() {
        let vars: HashMap<&str, &str> = [
            ("BUFFERFIT_MEAN_LENGTH", "1200"),
            ("BUFFERFIT_MAX_USERS", "50"),
            ("BUFFERFIT_MAX_LOSS", "not-a-number"),
        ]
        .into_iter()
        .collect();

        let config = BufferfitConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.model.mean_length, 1200.0);
        assert_eq!(config.sweep.max_users, 50);
        assert_eq!(config.model.max_loss, 0.001);
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        let model = ModelConfig {
            processor_speed: 0.0,
            ..ModelConfig::default()
        };
        assert!(matches!(
            model.validate(),
            Err(ConfigError::InvalidParameter {
                name: "processor_speed",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_loss_limit_of_one() {
        let model = ModelConfig {
            max_loss: 1.0,
            ..ModelConfig::default()
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_rejects_nan_multiplication_max() {
        let model = ModelConfig {
            multiplication_max: f64::NAN,
            ..ModelConfig::default()
        };
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_rejects_empty_buffer_range() {
        let sweep = SweepConfig {
            min_buffer: 10,
            max_buffer: 5,
            ..SweepConfig::default()
        };
        assert!(matches!(
            sweep.validate(),
            Err(ConfigError::InvalidSweep { .. })
        ));

        let zero = SweepConfig {
            min_buffer: 0,
            ..SweepConfig::default()
        };
        assert!(zero.validate().is_err());
    }
}
