//! Single-run execution driver.
//!
//! Bridges the async processes onto the virtual clock: all tasks run on a
//! tokio current-thread runtime inside a [`LocalSet`](tokio::task::LocalSet),
//! and a driver loop alternates between letting tasks make progress and
//! stepping the event queue. Tasks still pending at the time budget are
//! dropped with the `LocalSet`, never cancelled explicitly.

pub mod report;

pub use report::{RunResult, StationReport};

use std::rc::Rc;

use crate::error::SimulationResult;
use crate::facility::Facility;
use crate::facility::config::RunConfig;
use crate::sim::SimWorld;

/// Consecutive driver rounds with no dispatchable event before the run is
/// considered drained.
const IDLE_ROUND_LIMIT: u32 = 8;

/// Executes one complete simulation run and returns its result record.
///
/// Fails fast on invalid configuration; a valid run always yields a result,
/// accidents and rejections included. Identical seed and configuration
/// produce an identical result.
pub fn run_simulation(config: &RunConfig) -> SimulationResult<RunResult> {
    config.validate()?;
    tracing::info!(
        run_id = %config.run_id,
        seed = config.seed,
        duration_secs = config.duration.as_secs_f64(),
        "starting simulation run"
    );

    let mut sim = SimWorld::new_with_seed(config.seed);
    let facility = Facility::new(&sim, config.facility.clone());
    let duration = config.duration;

    let runtime = tokio::runtime::Builder::new_current_thread().build()?;
    let local = tokio::task::LocalSet::new();

    {
        let facility = Rc::clone(&facility);
        local.spawn_local(async move {
            if let Err(error) = facility.run_production(duration).await {
                tracing::trace!(%error, "arrival loop stopped");
            }
        });
    }

    local.block_on(&runtime, async {
        let mut idle_rounds = 0;
        loop {
            // Let every runnable task progress to its next suspension point
            // before touching the clock.
            tokio::task::yield_now().await;

            match sim.next_event_time() {
                Some(time) if time <= duration => {
                    sim.step();
                    idle_rounds = 0;
                }
                _ => {
                    // No dispatchable event; a few extra rounds let freshly
                    // woken tasks schedule follow-up events before we stop.
                    idle_rounds += 1;
                    if idle_rounds > IDLE_ROUND_LIMIT {
                        break;
                    }
                }
            }
        }
    });

    // Anything still in flight is abandoned with the LocalSet.
    drop(local);
    sim.advance_to(duration);

    let result = RunResult::build(&facility, &config.run_id, duration);
    tracing::info!(
        run_id = %result.run_id,
        production = result.production,
        rejected = result.rejected,
        events = sim.events_processed(),
        "simulation run finished"
    );
    Ok(result)
}
