//! Error types for the simulation engine.

/// Errors surfaced by the simulation engine.
///
/// Stochastic outcomes (product rejection, facility accidents) are modeled
/// results, not errors; they never appear here.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SimulationError {
    /// The simulation world has been torn down and is no longer accessible.
    #[error("simulation has been shut down")]
    SimulationShutdown,
    /// Configuration was rejected before the run started. No partial run is
    /// ever produced for an invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// An I/O error occurred while setting up the runtime.
    #[error("I/O error: {0}")]
    IoError(String),
}

/// A type alias for `Result<T, SimulationError>`.
pub type SimulationResult<T> = Result<T, SimulationError>;

impl From<std::io::Error> for SimulationError {
    fn from(err: std::io::Error) -> Self {
        SimulationError::IoError(err.to_string())
    }
}
