//! Run and facility configuration.
//!
//! Configuration is validated in full before a run starts; no partial run is
//! ever produced from a bad config. Defaults reproduce the reference line:
//! six stations, three-slot supplier pool, 25-unit bins.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{SimulationError, SimulationResult};

/// Number of stations on the line. Four sequential, then two parallel.
pub const STATION_COUNT: usize = 6;

/// Stations visited strictly in order before the parallel stage.
pub const SEQUENTIAL_STATIONS: usize = 4;

/// How a product gets rejected during its journey.
///
/// The line has been operated under two different quality regimes; both are
/// kept selectable rather than hard-coding one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Independent rejection roll at every station visit. A hit aborts the
    /// rest of the product's journey immediately.
    PerStation {
        /// Probability of rejection at each individual station visit.
        probability: f64,
    },
    /// Single rejection roll at the last station of the route; earlier
    /// stations never reject.
    EndOfRoute {
        /// Probability of rejection at the final station visit.
        probability: f64,
    },
}

impl Default for RejectionPolicy {
    fn default() -> Self {
        Self::PerStation { probability: 0.01 }
    }
}

impl RejectionPolicy {
    /// The rejection probability applied at one visit, given whether the
    /// visit is the last of the route.
    pub fn probability_at(&self, is_final_station: bool) -> f64 {
        match *self {
            Self::PerStation { probability } => probability,
            Self::EndOfRoute { probability } => {
                if is_final_station {
                    probability
                } else {
                    0.0
                }
            }
        }
    }

    fn validate(&self) -> SimulationResult<()> {
        let p = match *self {
            Self::PerStation { probability } | Self::EndOfRoute { probability } => probability,
        };
        if !(0.0..=1.0).contains(&p) {
            return Err(SimulationError::InvalidConfig(format!(
                "rejection probability must be within [0, 1], got {p}"
            )));
        }
        Ok(())
    }
}

/// Static parameters of the manufacturing line.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FacilityConfig {
    /// Material units a bin holds when full; resupply refills to exactly this.
    pub bin_capacity: i32,
    /// Concurrent resupply operations the supplier pool can serve.
    pub supplier_capacity: usize,
    /// Per-station breakdown probability, rolled on every fifth processed item.
    pub failure_probs: [f64; STATION_COUNT],
    /// Mean of the normal processing-time draw, in seconds of virtual time.
    pub process_time_mean: f64,
    /// Standard deviation of the processing-time draw.
    pub process_time_std_dev: f64,
    /// Mean of the normal resupply-delay draw, in seconds of virtual time.
    pub resupply_delay_mean: f64,
    /// Standard deviation of the resupply-delay draw.
    pub resupply_delay_std_dev: f64,
    /// Mean of the exponential repair-duration draw, in seconds.
    pub repair_time_mean: f64,
    /// Breakdown checks happen every this-many processed items per station.
    pub breakdown_check_interval: u64,
    /// How and where products are rejected.
    pub rejection: RejectionPolicy,
    /// Base per-tick accident probability, scaled down for longer runs.
    pub accident_probability: f64,
    /// Station 0 queue length above which admission throttles.
    pub queue_threshold: usize,
    /// Arrival spacing while station 0's queue is at or below the threshold.
    pub base_arrival_interval: Duration,
    /// Arrival spacing while station 0's queue exceeds the threshold.
    pub slow_arrival_interval: Duration,
    /// Whether per-product journey records are retained in the result.
    pub record_products: bool,
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            bin_capacity: 25,
            supplier_capacity: 3,
            failure_probs: [0.02, 0.01, 0.05, 0.15, 0.07, 0.06],
            process_time_mean: 4.0,
            process_time_std_dev: 1.0,
            resupply_delay_mean: 2.0,
            resupply_delay_std_dev: 0.5,
            repair_time_mean: 3.0,
            breakdown_check_interval: 5,
            rejection: RejectionPolicy::default(),
            accident_probability: 0.0001,
            queue_threshold: 5,
            base_arrival_interval: Duration::from_secs(1),
            slow_arrival_interval: Duration::from_secs(2),
            record_products: false,
        }
    }
}

impl FacilityConfig {
    /// Validates every parameter, failing fast on the first violation.
    pub fn validate(&self) -> SimulationResult<()> {
        if self.bin_capacity <= 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "bin capacity must be positive, got {}",
                self.bin_capacity
            )));
        }
        if self.supplier_capacity == 0 {
            return Err(SimulationError::InvalidConfig(
                "supplier capacity must be positive".to_string(),
            ));
        }
        for (station_id, &p) in self.failure_probs.iter().enumerate() {
            if !(0.0..=1.0).contains(&p) {
                return Err(SimulationError::InvalidConfig(format!(
                    "failure probability for station {station_id} must be within [0, 1], got {p}"
                )));
            }
        }
        if self.process_time_mean <= 0.0 || !self.process_time_mean.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "process time mean must be positive and finite, got {}",
                self.process_time_mean
            )));
        }
        if self.process_time_std_dev <= 0.0 || !self.process_time_std_dev.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "process time std dev must be positive and finite, got {}",
                self.process_time_std_dev
            )));
        }
        if self.resupply_delay_mean <= 0.0 || !self.resupply_delay_mean.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "resupply delay mean must be positive and finite, got {}",
                self.resupply_delay_mean
            )));
        }
        if self.resupply_delay_std_dev <= 0.0 || !self.resupply_delay_std_dev.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "resupply delay std dev must be positive and finite, got {}",
                self.resupply_delay_std_dev
            )));
        }
        if self.repair_time_mean <= 0.0 || !self.repair_time_mean.is_finite() {
            return Err(SimulationError::InvalidConfig(format!(
                "repair time mean must be positive and finite, got {}",
                self.repair_time_mean
            )));
        }
        if self.breakdown_check_interval == 0 {
            return Err(SimulationError::InvalidConfig(
                "breakdown check interval must be positive".to_string(),
            ));
        }
        self.rejection.validate()?;
        if !(0.0..=1.0).contains(&self.accident_probability) {
            return Err(SimulationError::InvalidConfig(format!(
                "accident probability must be within [0, 1], got {}",
                self.accident_probability
            )));
        }
        if self.base_arrival_interval.is_zero() || self.slow_arrival_interval.is_zero() {
            return Err(SimulationError::InvalidConfig(
                "arrival intervals must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Everything needed to execute one reproducible run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    /// Seed for every stochastic draw in the run.
    pub seed: u64,
    /// Opaque label attached to the result record.
    pub run_id: String,
    /// Virtual-time budget. Zero yields an empty result without error.
    pub duration: Duration,
    /// Line parameters.
    #[serde(default)]
    pub facility: FacilityConfig,
}

impl RunConfig {
    /// Builds a run config over the default facility parameters.
    pub fn new(seed: u64, run_id: impl Into<String>, duration: Duration) -> Self {
        Self {
            seed,
            run_id: run_id.into(),
            duration,
            facility: FacilityConfig::default(),
        }
    }

    /// Validates the full configuration before any simulation work happens.
    pub fn validate(&self) -> SimulationResult<()> {
        self.facility.validate()
    }
}
