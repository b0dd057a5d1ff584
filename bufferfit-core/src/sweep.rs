//! User and buffer sweeps for both buffer topologies.
//!
//! The outer loop increases the user count from 1; the inner loop scans every
//! buffer size in the configured range. The sweep stops at the first user
//! count for which no buffer size satisfies both service-level limits, or at
//! the configured user ceiling.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::SweepConfig;
use crate::model::{ModelError, QueueModel};

/// Buffer arrangement being sized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    /// One buffer shared by all users
    MultipleQueues,
    /// One dedicated buffer per user
    SingleQueue,
}

impl Topology {
    /// Both topologies in the order they are reported.
    pub const ALL: [Topology; 2] = [Topology::MultipleQueues, Topology::SingleQueue];

    /// Banner printed before a sweep of this topology.
    pub fn banner(self) -> &'static str {
        match self {
            Self::MultipleQueues => "Running for multiple queues",
            Self::SingleQueue => "Running for single queue",
        }
    }

    /// Label of the delay metric in result lines.
    pub fn delay_label(self) -> &'static str {
        match self {
            Self::MultipleQueues => "delay_multiple",
            Self::SingleQueue => "delay_single",
        }
    }

    /// Evaluates the delay metric relevant to this topology.
    ///
    /// # Errors
    ///
    /// - `ModelError` - If the model cannot be evaluated at this point
    pub fn delay(self, model: &QueueModel, users: u32, buffer: u32) -> Result<f64, ModelError> {
        match self {
            Self::MultipleQueues => model.multiplied_system_delay_multiple_queues(users, buffer),
            Self::SingleQueue => model.multiplied_system_delay_single_queue(users, buffer),
        }
    }
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleQueues => write!(f, "multiple"),
            Self::SingleQueue => write!(f, "single"),
        }
    }
}

impl std::str::FromStr for Topology {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "multiple" | "multiple-queues" | "shared" => Ok(Self::MultipleQueues),
            "single" | "single-queue" | "dedicated" => Ok(Self::SingleQueue),
            _ => Err(format!(
                "Invalid topology: '{s}'. Valid options are: multiple, single"
            )),
        }
    }
}

/// A (users, buffer) combination satisfying both limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeasiblePoint {
    pub users: u32,
    pub buffer: u32,
    pub loss: f64,
    pub delay: f64,
}

/// Why a sweep stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Termination {
    /// No buffer size in range satisfied both limits for this user count
    NoFeasibleBuffer { users: u32 },
    /// The user ceiling was reached while buffers were still feasible
    UserCapReached { max_users: u32 },
}

/// Collected outcome of one sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub topology: Topology,
    pub points: Vec<FeasiblePoint>,
    pub termination: Termination,
}

impl SweepReport {
    /// Largest user count with at least one feasible buffer.
    pub fn max_users(&self) -> Option<u32> {
        self.points.iter().map(|point| point.users).max()
    }

    /// Smallest feasible buffer for the given user count.
    pub fn smallest_buffer_for(&self, users: u32) -> Option<u32> {
        self.points
            .iter()
            .filter(|point| point.users == users)
            .map(|point| point.buffer)
            .min()
    }

    /// Distinct user counts present in the report, ascending.
    pub fn user_counts(&self) -> Vec<u32> {
        let mut users: Vec<u32> = self.points.iter().map(|point| point.users).collect();
        users.dedup();
        users
    }
}

/// Sweep driver for one topology.
pub struct BufferSweep<'a> {
    model: &'a QueueModel,
    config: &'a SweepConfig,
    topology: Topology,
}

impl<'a> BufferSweep<'a> {
    /// Creates a sweep over the given model and bounds.
    pub fn new(model: &'a QueueModel, config: &'a SweepConfig, topology: Topology) -> Self {
        Self {
            model,
            config,
            topology,
        }
    }

    /// Runs the sweep, handing each feasible point to `visit` as soon as it
    /// is found.
    ///
    /// Points already visited stay visited when a later point fails.
    ///
    /// # Errors
    ///
    /// - `E` - The first error from the model (converted) or from `visit`
    pub fn run_with<E, F>(&self, mut visit: F) -> Result<Termination, E>
    where
        E: From<ModelError>,
        F: FnMut(&FeasiblePoint) -> Result<(), E>,
    {
        info!(
            topology = %self.topology,
            buffers = ?(self.config.min_buffer..=self.config.max_buffer),
            max_users = self.config.max_users,
            "Starting sweep"
        );

        for users in 1..=self.config.max_users {
            let mut feasible = 0usize;

            for buffer in self.config.min_buffer..=self.config.max_buffer {
                let loss = self.model.loss(users, buffer)?;
                if !self.model.loss_acceptable(loss) {
                    continue;
                }

                let delay = self.topology.delay(self.model, users, buffer)?;
                if self.model.delay_acceptable(delay) {
                    feasible += 1;
                    visit(&FeasiblePoint {
                        users,
                        buffer,
                        loss,
                        delay,
                    })?;
                }
            }

            debug!(
                users,
                load = self.model.total_load(users),
                feasible,
                "Scanned buffer range"
            );

            if feasible == 0 {
                info!(topology = %self.topology, users, "No feasible buffer, sweep finished");
                return Ok(Termination::NoFeasibleBuffer { users });
            }
        }

        info!(
            topology = %self.topology,
            max_users = self.config.max_users,
            "User ceiling reached, sweep finished"
        );
        Ok(Termination::UserCapReached {
            max_users: self.config.max_users,
        })
    }

    /// Runs the sweep and collects every feasible point.
    ///
    /// # Errors
    ///
    /// - `ModelError` - If the model cannot be evaluated at a swept point
    pub fn run(&self) -> Result<SweepReport, ModelError> {
        let mut points = Vec::new();
        let termination = self.run_with(|point| {
            points.push(*point);
            Ok::<(), ModelError>(())
        })?;

        Ok(SweepReport {
            topology: self.topology,
            points,
            termination,
        })
    }
}
