//! Closed-form steady-state formulas for the M/M/1/K queue.
//!
//! All probabilities follow the truncated geometric distribution
//! `P(k) = ρ^k (1 - ρ) / (1 - ρ^(K+1))` of a birth-death chain with a
//! constant arrival/service ratio ρ and capacity K (including the document
//! in service).
//!
//! When `1 - ρ^(K+1)` is exactly zero (ρ = 1) the distribution is undefined.
//! Evaluation fails with [`ModelError::DegenerateLoad`] instead of returning
//! NaN, so a sweep stops at the first undefined point.

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, ModelConfig};

/// Errors raised while evaluating the queue formulas.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// The stationary distribution is undefined or overflowed for this load
    #[error("Degenerate load {load} for {users} users and queue {queue}")]
    DegenerateLoad {
        /// User count that produced the load
        users: u32,
        /// Queue capacity being evaluated
        queue: u32,
        /// Total offered load ρ
        load: f64,
    },

    /// Per-user normalization requested for zero users
    #[error("User count must be at least 1")]
    NoUsers,
}

/// Immutable evaluator for one parameter set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueModel {
    config: ModelConfig,
}

/// Every metric of one (users, buffer) point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub users: u32,
    pub buffer: u32,
    pub load: f64,
    pub loss: f64,
    pub mean_calls: f64,
    pub delay_multiple: f64,
    pub delay_single: f64,
}

impl QueueModel {
    /// Creates an evaluator after validating the parameters.
    ///
    /// # Errors
    ///
    /// - `ConfigError::InvalidParameter` - If a parameter is out of range
    pub fn new(config: ModelConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Returns the parameters this evaluator was built with.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Load offered by a single user.
    pub fn one_user_load(&self) -> f64 {
        self.config.mean_length / (self.config.mean_interval * self.config.processor_speed)
    }

    /// Load offered by `users` independent users.
    pub fn total_load(&self, users: u32) -> f64 {
        f64::from(users) * self.one_user_load()
    }

    /// Steady-state probability that exactly `k` documents are held by a
    /// buffer of capacity `queue`.
    ///
    /// # Errors
    ///
    /// - `ModelError::DegenerateLoad` - If `1 - ρ^(queue+1)` is zero or overflows, or the result is not finite
    pub fn probability_k_elems_in_queue(
        &self,
        users: u32,
        k: u32,
        queue: u32,
    ) -> Result<f64, ModelError> {
        let r = self.total_load(users);
        let degenerate = ModelError::DegenerateLoad {
            users,
            queue,
            load: r,
        };

        let denominator = 1.0 - r.powf(f64::from(queue) + 1.0);
        if denominator == 0.0 || !denominator.is_finite() {
            return Err(degenerate);
        }

        let probability = r.powf(f64::from(k)) * ((1.0 - r) / denominator);
        if probability.is_finite() {
            Ok(probability)
        } else {
            Err(degenerate)
        }
    }

    /// Probability that an arriving document finds the buffer full and is dropped.
    ///
    /// # Errors
    ///
    /// - `ModelError::DegenerateLoad` - If the distribution is undefined for this load
    pub fn loss(&self, users: u32, queue: u32) -> Result<f64, ModelError> {
        self.probability_k_elems_in_queue(users, queue, queue)
    }

    /// Occupancy-weighted sum over states `0..queue`.
    ///
    /// The full-buffer state is deliberately left out of the sum, so this is
    /// smaller than the textbook mean by `queue * loss`.
    ///
    /// # Errors
    ///
    /// - `ModelError::DegenerateLoad` - If the distribution is undefined for this load
    pub fn mean_calls_in_system(&self, users: u32, queue: u32) -> Result<f64, ModelError> {
        let mut sum = 0.0;
        for i in 0..queue {
            sum += f64::from(i) * self.probability_k_elems_in_queue(users, i, queue)?;
        }
        Ok(sum)
    }

    /// Mean time in system from Little's law, as a multiple of the mean
    /// service time, when all users share one buffer.
    ///
    /// # Errors
    ///
    /// - `ModelError::DegenerateLoad` - If the distribution is undefined for this
    ///   load, or no document is ever admitted (a zero-capacity buffer)
    pub fn multiplied_system_delay_multiple_queues(
        &self,
        users: u32,
        buffer: u32,
    ) -> Result<f64, ModelError> {
        let mean = self.mean_calls_in_system(users, buffer)?;
        let loss = self.loss(users, buffer)?;
        let delay = mean / (self.one_user_load() * (1.0 - loss));
        if delay.is_finite() {
            Ok(delay)
        } else {
            Err(ModelError::DegenerateLoad {
                users,
                queue: buffer,
                load: self.total_load(users),
            })
        }
    }

    /// Delay metric normalized per user, for one dedicated buffer per user.
    ///
    /// # Errors
    ///
    /// - `ModelError::NoUsers` - If `users` is zero
    /// - `ModelError::DegenerateLoad` - If the distribution is undefined for this load
    pub fn multiplied_system_delay_single_queue(
        &self,
        users: u32,
        buffer: u32,
    ) -> Result<f64, ModelError> {
        if users == 0 {
            return Err(ModelError::NoUsers);
        }
        Ok(self.multiplied_system_delay_multiple_queues(users, buffer)? / f64::from(users))
    }

    /// Evaluates every metric for one point.
    ///
    /// # Errors
    ///
    /// - `ModelError` - If any underlying formula fails
    pub fn evaluate(&self, users: u32, buffer: u32) -> Result<Evaluation, ModelError> {
        Ok(Evaluation {
            users,
            buffer,
            load: self.total_load(users),
            loss: self.loss(users, buffer)?,
            mean_calls: self.mean_calls_in_system(users, buffer)?,
            delay_multiple: self.multiplied_system_delay_multiple_queues(users, buffer)?,
            delay_single: self.multiplied_system_delay_single_queue(users, buffer)?,
        })
    }

    /// Checks a loss probability against the loss limit (strict).
    pub fn loss_acceptable(&self, loss: f64) -> bool {
        loss < self.config.max_loss
    }

    /// Checks a delay multiple against the delay limit (strict).
    pub fn delay_acceptable(&self, delay: f64) -> bool {
        delay < self.config.multiplication_max
    }

    /// Checks a loss and delay pair against both service-level limits.
    pub fn meets_requirements(&self, loss: f64, delay: f64) -> bool {
        self.loss_acceptable(loss) && self.delay_acceptable(delay)
    }
}
