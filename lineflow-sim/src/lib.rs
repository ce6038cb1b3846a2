//! Deterministic discrete-event simulation of a six-station manufacturing
//! line.
//!
//! Products arrive at a variable cadence, traverse four sequential stations
//! and two load-balanced parallel stations, and leave as good or rejected
//! units. Stations are single-capacity FIFO resources with stochastic
//! processing times and probabilistic breakdowns; material bins refill
//! through a shared three-slot supplier pool. Everything runs on a virtual
//! clock with seeded randomness, so a run is exactly reproducible from its
//! seed.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use lineflow_sim::{RunConfig, run_simulation};
//!
//! # fn main() -> Result<(), lineflow_sim::SimulationError> {
//! let config = RunConfig::new(42, "run-42", Duration::from_secs(200));
//! let result = run_simulation(&config)?;
//! println!("production: {}, rejected: {}", result.production, result.rejected);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

pub mod error;
pub mod facility;
pub mod runner;
pub mod sim;

pub use error::{SimulationError, SimulationResult};
pub use facility::config::{FacilityConfig, RejectionPolicy, RunConfig, STATION_COUNT};
pub use facility::metrics::{ProductRecord, Quality, StationMetrics, StationVisit};
pub use facility::{Facility, StationOutcome};
pub use runner::{RunResult, StationReport, run_simulation};
pub use sim::{Resource, ResourceGuard, SimWorld, WeakSimWorld};
