//! Invariant checking for model results.
//!
//! Each invariant re-evaluates the model around the points of a sweep report
//! and reports the first place where a closed-form property does not hold.

use std::fmt;

use crate::model::{ModelError, QueueModel};
use crate::sweep::SweepReport;

/// Absolute tolerance for comparisons of probabilities.
const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Violation of a model invariant.
#[derive(Debug, Clone, PartialEq)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
}

impl InvariantViolation {
    fn new(invariant: &dyn ModelInvariant, description: String) -> Self {
        Self {
            invariant: invariant.name().to_string(),
            description,
        }
    }
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invariant '{}' violated: {}", self.invariant, self.description)
    }
}

impl From<(&str, ModelError)> for InvariantViolation {
    fn from((invariant, error): (&str, ModelError)) -> Self {
        Self {
            invariant: invariant.to_string(),
            description: format!("model evaluation failed: {error}"),
        }
    }
}

/// Trait for checking model invariants against a sweep report.
pub trait ModelInvariant {
    /// Checks if invariant holds for every point in `report`.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, model: &QueueModel, report: &SweepReport) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;
}

/// State probabilities of every reported point sum to one.
pub struct DistributionNormalized;

impl ModelInvariant for DistributionNormalized {
    fn check(&self, model: &QueueModel, report: &SweepReport) -> Result<(), InvariantViolation> {
        for point in &report.points {
            let mut total = 0.0;
            for k in 0..=point.buffer {
                total += model
                    .probability_k_elems_in_queue(point.users, k, point.buffer)
                    .map_err(|e| (self.name(), e))?;
            }
            if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(InvariantViolation::new(
                    self,
                    format!(
                        "probabilities for {} users and buffer {} sum to {total}",
                        point.users, point.buffer
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "DistributionNormalized"
    }
}

/// Loss never grows with buffer size below unit load.
pub struct LossMonotonic {
    min_buffer: u32,
    max_buffer: u32,
}

impl LossMonotonic {
    /// Creates invariant covering the given buffer range.
    pub fn new(min_buffer: u32, max_buffer: u32) -> Self {
        Self {
            min_buffer,
            max_buffer,
        }
    }
}

impl ModelInvariant for LossMonotonic {
    fn check(&self, model: &QueueModel, report: &SweepReport) -> Result<(), InvariantViolation> {
        for users in report.user_counts() {
            if model.total_load(users) >= 1.0 {
                continue;
            }

            let mut previous = model
                .loss(users, self.min_buffer)
                .map_err(|e| (self.name(), e))?;
            for buffer in self.min_buffer + 1..=self.max_buffer {
                let current = model.loss(users, buffer).map_err(|e| (self.name(), e))?;
                if current > previous * (1.0 + PROBABILITY_TOLERANCE) {
                    return Err(InvariantViolation::new(
                        self,
                        format!(
                            "loss for {users} users rises from {previous} to {current} at buffer {buffer}"
                        ),
                    ));
                }
                previous = current;
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "LossMonotonic"
    }
}

/// Mean occupancy lies within `[0, buffer]`.
pub struct OccupancyBounded;

impl ModelInvariant for OccupancyBounded {
    fn check(&self, model: &QueueModel, report: &SweepReport) -> Result<(), InvariantViolation> {
        for point in &report.points {
            let mean = model
                .mean_calls_in_system(point.users, point.buffer)
                .map_err(|e| (self.name(), e))?;
            if !(0.0..=f64::from(point.buffer)).contains(&mean) {
                return Err(InvariantViolation::new(
                    self,
                    format!(
                        "mean occupancy {mean} outside [0, {}] for {} users",
                        point.buffer, point.users
                    ),
                ));
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "OccupancyBounded"
    }
}

/// Every reported point strictly satisfies both limits.
pub struct ConstraintsRespected;

impl ModelInvariant for ConstraintsRespected {
    fn check(&self, model: &QueueModel, report: &SweepReport) -> Result<(), InvariantViolation> {
        match report
            .points
            .iter()
            .find(|point| !model.meets_requirements(point.loss, point.delay))
        {
            Some(point) => Err(InvariantViolation::new(
                self,
                format!(
                    "{} users and buffer {} reported with loss {} and delay {}",
                    point.users, point.buffer, point.loss, point.delay
                ),
            )),
            None => Ok(()),
        }
    }

    fn name(&self) -> &str {
        "ConstraintsRespected"
    }
}

/// Default invariant set for a sweep over the given buffer range.
pub fn default_invariants(min_buffer: u32, max_buffer: u32) -> Vec<Box<dyn ModelInvariant>> {
    vec![
        Box::new(DistributionNormalized),
        Box::new(LossMonotonic::new(min_buffer, max_buffer)),
        Box::new(OccupancyBounded),
        Box::new(ConstraintsRespected),
    ]
}

/// Runs every invariant and collects all violations.
pub fn check_all(
    invariants: &[Box<dyn ModelInvariant>],
    model: &QueueModel,
    report: &SweepReport,
) -> Vec<InvariantViolation> {
    invariants
        .iter()
        .filter_map(|invariant| invariant.check(model, report).err())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelConfig, SweepConfig};
    use crate::sweep::{BufferSweep, FeasiblePoint, Termination, Topology};

    fn default_model() -> QueueModel {
        QueueModel::new(ModelConfig::default()).unwrap()
    }

    #[test]
    fn test_default_sweeps_hold_all_invariants() {
        let model = default_model();
        let config = SweepConfig::default();
        let invariants = default_invariants(config.min_buffer, config.max_buffer);

        for topology in Topology::ALL {
            let report = BufferSweep::new(&model, &config, topology).run().unwrap();
            let violations = check_all(&invariants, &model, &report);
            assert!(violations.is_empty(), "{topology}: {violations:?}");
        }
    }

    #[test]
    fn test_forged_point_breaks_constraints() {
        let model = default_model();
        let report = SweepReport {
            topology: Topology::MultipleQueues,
            points: vec![FeasiblePoint {
                users: 1,
                buffer: 1,
                loss: 0.004149377593360996,
                delay: 0.0,
            }],
            termination: Termination::NoFeasibleBuffer { users: 2 },
        };

        let violation = ConstraintsRespected.check(&model, &report).unwrap_err();
        assert_eq!(violation.invariant, "ConstraintsRespected");
        assert!(violation.to_string().contains("buffer 1"));
    }

    #[test]
    fn test_degenerate_point_reports_model_error() {
        let model = QueueModel::new(ModelConfig {
            mean_interval: 1.0,
            mean_length: 600.0,
            processor_speed: 600.0,
            ..ModelConfig::default()
        })
        .unwrap();
        let report = SweepReport {
            topology: Topology::SingleQueue,
            points: vec![FeasiblePoint {
                users: 1,
                buffer: 3,
                loss: 0.0,
                delay: 0.0,
            }],
            termination: Termination::UserCapReached { max_users: 1 },
        };

        let violation = OccupancyBounded.check(&model, &report).unwrap_err();
        assert!(violation.description.contains("Degenerate load"));
    }
}
