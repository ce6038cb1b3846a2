//! Runs one simulation and prints the result record as JSON.
//!
//! ```text
//! cargo run --example single_run
//! ```
//! Set `RUST_LOG=lineflow_sim=debug` for per-event logging.

use std::time::Duration;

use lineflow_sim::{RunConfig, SimulationError, run_simulation};

fn main() -> Result<(), SimulationError> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = RunConfig::new(42, "run-42", Duration::from_secs(500));
    config.facility.record_products = false;

    let result = run_simulation(&config)?;
    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| SimulationError::IoError(e.to_string()))?;
    println!("{json}");
    Ok(())
}
