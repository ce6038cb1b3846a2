//! The manufacturing line: stations, bins, supplier pool, and the product
//! lifecycle processes that run over the simulation engine.
//!
//! A [`Facility`] exclusively owns all line state for the duration of one
//! run; nothing survives a run boundary. Processes are async methods driven
//! cooperatively on a single thread, so shared state behind the inner
//! `RefCell` is only ever touched between suspension points and borrows are
//! never held across an await.

pub mod config;
pub mod metrics;

use std::{cell::RefCell, collections::BTreeMap, rc::Rc, time::Duration};

use crate::error::SimulationResult;
use crate::facility::config::{FacilityConfig, SEQUENTIAL_STATIONS, STATION_COUNT};
use crate::facility::metrics::{ProductRecord, Quality, StationMetrics, StationVisit};
use crate::sim::{
    Resource, SimWorld, WeakSimWorld, sim_exponential, sim_normal_abs, sim_random,
    sim_random_range,
};

/// Outcome of one station visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationOutcome {
    /// The product passed and may continue its route.
    Completed,
    /// The product was rejected here; the rest of its route is abandoned.
    Rejected {
        /// Station at which the rejection happened.
        station_id: usize,
    },
}

/// Mutable line state, touched only between suspension points.
#[derive(Debug)]
pub(crate) struct FacilityState {
    pub(crate) bins: [i32; STATION_COUNT],
    pub(crate) metrics: [StationMetrics; STATION_COUNT],
    pub(crate) total_production: u64,
    pub(crate) rejected_products: u64,
    pub(crate) supplier_busy_time: Duration,
    /// Virtual time of the last completion anywhere on the line; zero until
    /// the first completion.
    pub(crate) last_product_time: Duration,
    pub(crate) product_metrics: BTreeMap<u64, ProductRecord>,
}

/// One manufacturing line bound to a simulation world.
#[derive(Debug)]
pub struct Facility {
    world: WeakSimWorld,
    config: FacilityConfig,
    stations: Vec<Resource>,
    supplier: Resource,
    pub(crate) state: RefCell<FacilityState>,
}

impl Facility {
    /// Builds a fresh line over the given world.
    ///
    /// The config must already be validated.
    pub fn new(world: &SimWorld, config: FacilityConfig) -> Rc<Self> {
        let stations = (0..STATION_COUNT)
            .map(|i| Resource::new(format!("station-{i}"), 1))
            .collect();
        let supplier = Resource::new("supplier", config.supplier_capacity);
        let bins = [config.bin_capacity; STATION_COUNT];

        Rc::new(Self {
            world: world.downgrade(),
            config,
            stations,
            supplier,
            state: RefCell::new(FacilityState {
                bins,
                metrics: std::array::from_fn(|_| StationMetrics::default()),
                total_production: 0,
                rejected_products: 0,
                supplier_busy_time: Duration::ZERO,
                last_product_time: Duration::ZERO,
                product_metrics: BTreeMap::new(),
            }),
        })
    }

    /// The line configuration in effect for this run.
    pub fn config(&self) -> &FacilityConfig {
        &self.config
    }

    /// The station resource at `station_id`.
    pub fn station(&self, station_id: usize) -> &Resource {
        &self.stations[station_id]
    }

    /// The shared supplier pool.
    pub fn supplier(&self) -> &Resource {
        &self.supplier
    }

    /// Current material stock of the given station's bin.
    pub fn bin_level(&self, station_id: usize) -> i32 {
        self.state.borrow().bins[station_id]
    }

    fn now(&self) -> SimulationResult<Duration> {
        self.world.now()
    }

    async fn sleep_secs(&self, secs: f64) -> SimulationResult<()> {
        self.world.sleep(Duration::from_secs_f64(secs))?.await
    }

    fn with_record(&self, product_id: u64, update: impl FnOnce(&mut ProductRecord)) {
        if let Some(record) = self.state.borrow_mut().product_metrics.get_mut(&product_id) {
            update(record);
        }
    }

    /// Refills one station's bin via the shared supplier pool.
    ///
    /// Acquires a supplier slot (FIFO, capacity-limited), waits out a random
    /// delay, and sets the bin back to full. The whole elapsed span of this
    /// process, queueing included, counts toward supplier busy time.
    pub async fn resupply_bin(&self, station_id: usize) -> SimulationResult<()> {
        let start_time = self.now()?;
        let _slot = self.supplier.acquire().await;

        let delay = sim_normal_abs(
            self.config.resupply_delay_mean,
            self.config.resupply_delay_std_dev,
        );
        self.sleep_secs(delay).await?;

        let now = self.now()?;
        let mut state = self.state.borrow_mut();
        state.bins[station_id] = self.config.bin_capacity;
        state.supplier_busy_time += now - start_time;
        tracing::debug!(station_id, delay_secs = delay, "bin resupplied");
        Ok(())
    }

    /// One station visit's service phase: wait bookkeeping, processing,
    /// breakdown check, bottleneck tracking, and the rejection roll.
    ///
    /// Caller must already hold the station resource.
    async fn process_station(
        &self,
        product_id: u64,
        station_id: usize,
        start_queue: Duration,
        is_final_station: bool,
    ) -> SimulationResult<StationOutcome> {
        let wait_time = self.now()? - start_queue;
        self.state.borrow_mut().metrics[station_id]
            .waiting_times
            .push(wait_time);

        let process_secs = sim_normal_abs(
            self.config.process_time_mean,
            self.config.process_time_std_dev,
        );
        let process_time = Duration::from_secs_f64(process_secs);
        self.sleep_secs(process_secs).await?;

        let breakdown_due = {
            let mut state = self.state.borrow_mut();
            let metrics = &mut state.metrics[station_id];
            metrics.processed_items += 1;
            metrics.busy_time += process_time;
            metrics.processed_items % self.config.breakdown_check_interval == 0
        };

        if breakdown_due && sim_random::<f64>() < self.config.failure_probs[station_id] {
            let fixing_secs = sim_exponential(self.config.repair_time_mean);
            let fixing_time = Duration::from_secs_f64(fixing_secs);
            tracing::debug!(station_id, fixing_secs, "station breakdown");
            self.sleep_secs(fixing_secs).await?;

            let mut state = self.state.borrow_mut();
            let metrics = &mut state.metrics[station_id];
            metrics.downtime += fixing_time;
            metrics.fixing_times.push(fixing_time);
        }

        let now = self.now()?;
        {
            let mut state = self.state.borrow_mut();
            if state.last_product_time > Duration::ZERO {
                // A gap beyond our own processing span means we sat starved
                // behind the rest of the line.
                let expected = state.last_product_time + process_time;
                if now > expected {
                    state.metrics[station_id]
                        .bottleneck_delays
                        .push(now - expected);
                }
            }
            state.last_product_time = now;
        }

        let rejection_probability = self.config.rejection.probability_at(is_final_station);
        if sim_random::<f64>() < rejection_probability {
            self.state.borrow_mut().metrics[station_id].rejected_products += 1;
            tracing::debug!(product_id, station_id, "product rejected");
            return Ok(StationOutcome::Rejected { station_id });
        }

        Ok(StationOutcome::Completed)
    }

    /// Full station stop: resupply if the bin is empty, consume material,
    /// queue for the station, and run the service phase.
    async fn visit_station(
        &self,
        product_id: u64,
        station_id: usize,
        is_final_station: bool,
    ) -> SimulationResult<StationOutcome> {
        let entry_time = self.now()?;

        // Re-check after each resupply suspension: another product may have
        // drained the bin again while we were suspended.
        while self.state.borrow().bins[station_id] <= 0 {
            self.resupply_bin(station_id).await?;
        }
        self.state.borrow_mut().bins[station_id] -= 1;

        let start_queue = self.now()?;
        let _station = self.stations[station_id].acquire().await;

        let wait_time = self.now()? - start_queue;
        self.with_record(product_id, |record| record.total_wait_time += wait_time);

        let process_start = self.now()?;
        let outcome = self
            .process_station(product_id, station_id, start_queue, is_final_station)
            .await?;

        if outcome == StationOutcome::Completed {
            let exit_time = self.now()?;
            let process_time = exit_time - process_start;
            self.with_record(product_id, |record| {
                record.stations_visit.push(StationVisit {
                    station_id,
                    entry_time,
                    exit_time,
                    wait_time,
                    process_time,
                });
                record.total_process_time += process_time;
            });
        }
        Ok(outcome)
    }

    fn finish_rejected(&self, product_id: u64, station_id: usize, now: Duration) {
        let mut state = self.state.borrow_mut();
        state.rejected_products += 1;
        state.metrics[station_id].rejected_products += 1;
        if let Some(record) = state.product_metrics.get_mut(&product_id) {
            record.quality = Quality::Rejected;
            record.end_time = Some(now);
        }
    }

    /// Picks the parallel-stage visiting order by current queue length.
    ///
    /// The shorter queue of stations 4 and 5 goes first, ties favoring 4;
    /// the second is always the complementary index.
    pub fn parallel_order(&self) -> (usize, usize) {
        let first = if self.stations[4].queue_length() <= self.stations[5].queue_length() {
            4
        } else {
            5
        };
        (first, 9 - first)
    }

    /// Spacing until the next product admission.
    ///
    /// Arrivals self-throttle once station 0's queue builds up past the
    /// configured threshold.
    pub fn arrival_interval(&self) -> Duration {
        if self.stations[0].queue_length() > self.config.queue_threshold {
            self.config.slow_arrival_interval
        } else {
            self.config.base_arrival_interval
        }
    }

    /// Drives one product through the whole route.
    ///
    /// Four sequential stations, then the two parallel stations in
    /// queue-chosen order. A rejection anywhere terminates the journey with
    /// its bookkeeping done; the product is never re-queued.
    pub(crate) async fn process_product(self: Rc<Self>, product_id: u64) -> SimulationResult<()> {
        let start_time = self.now()?;
        if self.config.record_products {
            self.state
                .borrow_mut()
                .product_metrics
                .insert(product_id, ProductRecord::new(start_time));
        }
        tracing::trace!(product_id, "product entered the line");

        for station_id in 0..SEQUENTIAL_STATIONS {
            if let StationOutcome::Rejected { station_id } =
                self.visit_station(product_id, station_id, false).await?
            {
                self.finish_rejected(product_id, station_id, self.now()?);
                return Ok(());
            }
        }

        let (first, second) = self.parallel_order();
        if let StationOutcome::Rejected { station_id } =
            self.visit_station(product_id, first, false).await?
        {
            self.finish_rejected(product_id, station_id, self.now()?);
            return Ok(());
        }
        if let StationOutcome::Rejected { station_id } =
            self.visit_station(product_id, second, true).await?
        {
            self.finish_rejected(product_id, station_id, self.now()?);
            return Ok(());
        }

        let now = self.now()?;
        let mut state = self.state.borrow_mut();
        state.total_production += 1;
        state.metrics[second].good_products += 1;
        if let Some(record) = state.product_metrics.get_mut(&product_id) {
            record.quality = Quality::Good;
            record.end_time = Some(now);
        }
        tracing::trace!(product_id, "product completed the line");
        Ok(())
    }

    /// Top-level arrival loop for the whole run.
    ///
    /// Spawns a product at a variable cadence until the time budget is
    /// reached, or a rare accident stops admissions early. Products already
    /// on the line keep running either way.
    pub(crate) async fn run_production(self: Rc<Self>, duration: Duration) -> SimulationResult<()> {
        if duration.is_zero() {
            return Ok(());
        }
        // Longer runs get proportionally rarer per-tick accident rolls, so
        // the chance of an accident-free run is roughly duration-independent.
        let accident_probability =
            self.config.accident_probability / (duration.as_secs_f64() / 24.0);

        let mut product_id: u64 = 0;
        while self.now()? < duration {
            if sim_random::<f64>() < accident_probability {
                let accident_station = sim_random_range(0..STATION_COUNT);
                self.state.borrow_mut().metrics[accident_station].accident_count += 1;
                tracing::warn!(
                    accident_station,
                    at_secs = self.now()?.as_secs_f64(),
                    "facility accident, stopping admissions"
                );
                break;
            }

            let facility = Rc::clone(&self);
            tokio::task::spawn_local(async move {
                if let Err(error) = facility.process_product(product_id).await {
                    tracing::trace!(product_id, %error, "product abandoned");
                }
            });
            product_id += 1;

            let interval = self.arrival_interval();
            self.world.sleep(interval)?.await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facility() -> (SimWorld, Rc<Facility>) {
        let sim = SimWorld::new_with_seed(1);
        let facility = Facility::new(&sim, FacilityConfig::default());
        (sim, facility)
    }

    #[test]
    fn bins_start_full() {
        let (_sim, facility) = facility();
        for station_id in 0..STATION_COUNT {
            assert_eq!(facility.bin_level(station_id), 25);
        }
    }

    #[test]
    fn stations_are_single_capacity() {
        let (_sim, facility) = facility();
        for station_id in 0..STATION_COUNT {
            assert_eq!(facility.station(station_id).capacity(), 1);
        }
        assert_eq!(facility.supplier().capacity(), 3);
    }

    #[test]
    fn parallel_order_defaults_to_station_four() {
        let (_sim, facility) = facility();
        // Both queues empty, tie favors station 4.
        assert_eq!(facility.parallel_order(), (4, 5));
    }

    #[test]
    fn arrival_interval_base_when_queue_short() {
        let (_sim, facility) = facility();
        assert_eq!(facility.arrival_interval(), Duration::from_secs(1));
    }

    #[test]
    fn bins_stay_within_bounds_under_resupply_pressure() {
        use crate::facility::config::RejectionPolicy;

        let mut sim = SimWorld::new_with_seed(9);
        let config = FacilityConfig {
            // Single-unit bins force a resupply before nearly every
            // consumption.
            bin_capacity: 1,
            failure_probs: [0.0; STATION_COUNT],
            rejection: RejectionPolicy::PerStation { probability: 0.0 },
            ..FacilityConfig::default()
        };
        let facility = Facility::new(&sim, config);

        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("failed to build current-thread runtime");
        let local = tokio::task::LocalSet::new();
        for product_id in 0..8u64 {
            let facility = Rc::clone(&facility);
            local.spawn_local(async move {
                facility
                    .process_product(product_id)
                    .await
                    .expect("product resolves");
            });
        }

        local.block_on(&rt, async {
            let mut idle_rounds = 0;
            while idle_rounds <= 8 {
                tokio::task::yield_now().await;
                if sim.has_pending_events() {
                    sim.step();
                    idle_rounds = 0;
                } else {
                    idle_rounds += 1;
                }
                // Consumption is gated on a completed resupply, so no bin is
                // ever observed negative or above capacity.
                for station_id in 0..STATION_COUNT {
                    let level = facility.bin_level(station_id);
                    assert!(
                        (0..=1).contains(&level),
                        "bin {station_id} out of bounds at {level}"
                    );
                }
            }
        });

        // No horizon and no rejections: every product drains to completion.
        assert_eq!(facility.state.borrow().total_production, 8);
    }
}
