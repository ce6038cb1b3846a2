//! Deterministic discrete-event simulation engine.
//!
//! The engine is domain-agnostic: it provides a virtual clock and event queue
//! ([`SimWorld`]), virtual-time sleeps ([`SleepFuture`]), capacity-limited
//! FIFO resources ([`Resource`]), and seeded randomness ([`rng`]). Processes
//! are plain async functions driven on a single-threaded executor; all
//! apparent concurrency is cooperative interleaving at await points.

pub mod events;
pub mod resource;
pub mod rng;
pub mod sleep;
pub(crate) mod wakers;
pub mod world;

pub use events::{Event, EventQueue, ScheduledEvent};
pub use resource::{AcquireFuture, Resource, ResourceGuard};
pub use rng::{
    get_current_sim_seed, reset_sim_rng, set_sim_seed, sim_exponential, sim_normal_abs,
    sim_random, sim_random_range,
};
pub use sleep::SleepFuture;
pub use world::{SimWorld, WeakSimWorld};
