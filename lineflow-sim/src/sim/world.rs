//! Core virtual clock and event processing.
//!
//! [`SimWorld`] owns the virtual clock, the pending-event set, and the wakers
//! of suspended processes. It uses a centralized ownership model with
//! handle-based access: the world is held by the run driver, while processes
//! hold [`WeakSimWorld`] handles that fail cleanly once the run is torn down.

use std::{
    cell::RefCell,
    collections::HashSet,
    rc::{Rc, Weak},
    task::Waker,
    time::Duration,
};

use crate::error::{SimulationError, SimulationResult};
use crate::sim::{
    events::{Event, EventQueue, ScheduledEvent},
    rng::{reset_sim_rng, set_sim_seed},
    sleep::SleepFuture,
    wakers::WakerRegistry,
};

/// Internal simulation state holder.
#[derive(Debug)]
pub(crate) struct SimInner {
    pub(crate) current_time: Duration,
    pub(crate) event_queue: EventQueue,
    pub(crate) next_sequence: u64,

    // Async coordination for sleeping processes
    pub(crate) wakers: WakerRegistry,
    pub(crate) next_task_id: u64,
    pub(crate) awakened_tasks: HashSet<u64>,

    pub(crate) events_processed: u64,
}

impl SimInner {
    fn new() -> Self {
        Self {
            current_time: Duration::ZERO,
            event_queue: EventQueue::new(),
            next_sequence: 0,
            wakers: WakerRegistry::default(),
            next_task_id: 0,
            awakened_tasks: HashSet::new(),
            events_processed: 0,
        }
    }
}

/// The central simulation coordinator managing virtual time and events.
///
/// Exists for the lifetime of exactly one run; a new run constructs a fresh
/// world. Time is monotonically non-decreasing and has no coupling to the
/// wall clock.
#[derive(Debug)]
pub struct SimWorld {
    pub(crate) inner: Rc<RefCell<SimInner>>,
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SimWorld {
    /// Creates a new simulation world with the default seed (0).
    pub fn new() -> Self {
        Self::new_with_seed(0)
    }

    /// Creates a new simulation world seeded for deterministic randomness.
    ///
    /// Resets the thread-local RNG before seeding, so consecutive runs on
    /// the same thread are independent.
    pub fn new_with_seed(seed: u64) -> Self {
        reset_sim_rng();
        set_sim_seed(seed);
        Self {
            inner: Rc::new(RefCell::new(SimInner::new())),
        }
    }

    /// Processes the next scheduled event and advances time to it.
    ///
    /// Returns `true` if more events remain after this one.
    pub fn step(&mut self) -> bool {
        let mut inner = self.inner.borrow_mut();

        if let Some(scheduled_event) = inner.event_queue.pop_earliest() {
            inner.current_time = scheduled_event.time();
            Self::process_event_with_inner(&mut inner, scheduled_event.into_event());
            !inner.event_queue.is_empty()
        } else {
            false
        }
    }

    /// Processes all scheduled events until the queue is empty.
    pub fn run_until_empty(&mut self) {
        while self.step() {}
    }

    /// Processes events up to and including `end`, abandoning anything later.
    ///
    /// Events scheduled past `end` are never dispatched, so processes waiting
    /// on them are simply never resumed. The clock is left at `end`.
    pub fn run_until(&mut self, end: Duration) {
        while let Some(t) = self.next_event_time() {
            if t > end {
                break;
            }
            self.step();
        }
        self.advance_to(end);
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> Duration {
        self.inner.borrow().current_time
    }

    /// Returns the timestamp of the earliest pending event, if any.
    pub fn next_event_time(&self) -> Option<Duration> {
        self.inner
            .borrow()
            .event_queue
            .peek_earliest()
            .map(|e| e.time())
    }

    /// Advances the clock to `time` without processing events.
    ///
    /// The clock never moves backwards; an earlier `time` is a no-op.
    pub fn advance_to(&mut self, time: Duration) {
        let mut inner = self.inner.borrow_mut();
        if time > inner.current_time {
            inner.current_time = time;
        }
    }

    /// Schedules an event to execute after `delay` from the current time.
    pub fn schedule_event(&self, event: Event, delay: Duration) {
        let mut inner = self.inner.borrow_mut();
        let scheduled_time = inner.current_time + delay;
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        inner
            .event_queue
            .schedule(ScheduledEvent::new(scheduled_time, event, sequence));
    }

    /// Suspends the caller for `duration` of virtual time.
    ///
    /// Returns a future that completes once the clock has advanced by the
    /// requested amount. Ties at the same instant resolve in schedule order.
    pub fn sleep(&self, duration: Duration) -> SleepFuture {
        let task_id = self.generate_task_id();
        self.schedule_event(Event::Timer { task_id }, duration);
        SleepFuture::new(self.downgrade(), task_id)
    }

    /// Creates a weak handle to this simulation world.
    pub fn downgrade(&self) -> WeakSimWorld {
        WeakSimWorld {
            inner: Rc::downgrade(&self.inner),
        }
    }

    /// Returns `true` if events are waiting to be processed.
    pub fn has_pending_events(&self) -> bool {
        !self.inner.borrow().event_queue.is_empty()
    }

    /// Returns the number of events waiting to be processed.
    pub fn pending_event_count(&self) -> usize {
        self.inner.borrow().event_queue.len()
    }

    /// Returns the number of events processed so far in this run.
    pub fn events_processed(&self) -> u64 {
        self.inner.borrow().events_processed
    }

    fn generate_task_id(&self) -> u64 {
        let mut inner = self.inner.borrow_mut();
        let task_id = inner.next_task_id;
        inner.next_task_id += 1;
        task_id
    }

    pub(crate) fn is_task_awake(&self, task_id: u64) -> bool {
        self.inner.borrow().awakened_tasks.contains(&task_id)
    }

    pub(crate) fn register_task_waker(&self, task_id: u64, waker: Waker) {
        let mut inner = self.inner.borrow_mut();
        inner.wakers.task_wakers.insert(task_id, waker);
    }

    fn process_event_with_inner(inner: &mut SimInner, event: Event) {
        inner.events_processed += 1;

        match event {
            Event::Timer { task_id } => {
                inner.awakened_tasks.insert(task_id);
                if let Some(waker) = inner.wakers.task_wakers.remove(&task_id) {
                    waker.wake();
                }
            }
        }
    }
}

/// A weak handle onto a [`SimWorld`].
///
/// Processes hold weak handles so a run can be torn down while futures are
/// still in flight; an upgrade after teardown yields
/// [`SimulationError::SimulationShutdown`].
#[derive(Debug, Clone)]
pub struct WeakSimWorld {
    pub(crate) inner: Weak<RefCell<SimInner>>,
}

impl WeakSimWorld {
    /// Upgrades to a strong [`SimWorld`] handle.
    pub fn upgrade(&self) -> SimulationResult<SimWorld> {
        self.inner
            .upgrade()
            .map(|inner| SimWorld { inner })
            .ok_or(SimulationError::SimulationShutdown)
    }

    /// Returns the current virtual time.
    pub fn now(&self) -> SimulationResult<Duration> {
        Ok(self.upgrade()?.now())
    }

    /// Suspends the caller for `duration` of virtual time.
    pub fn sleep(&self, duration: Duration) -> SimulationResult<SleepFuture> {
        Ok(self.upgrade()?.sleep(duration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_starts_at_zero() {
        let sim = SimWorld::new();
        assert_eq!(sim.now(), Duration::ZERO);
        assert!(!sim.has_pending_events());
    }

    #[test]
    fn step_advances_to_event_time() {
        let mut sim = SimWorld::new();
        sim.schedule_event(Event::Timer { task_id: 0 }, Duration::from_secs(5));
        sim.schedule_event(Event::Timer { task_id: 1 }, Duration::from_secs(2));

        assert!(sim.step());
        assert_eq!(sim.now(), Duration::from_secs(2));
        assert!(!sim.step());
        assert_eq!(sim.now(), Duration::from_secs(5));
    }

    #[test]
    fn run_until_abandons_later_events() {
        let mut sim = SimWorld::new();
        sim.schedule_event(Event::Timer { task_id: 0 }, Duration::from_secs(1));
        sim.schedule_event(Event::Timer { task_id: 1 }, Duration::from_secs(10));

        sim.run_until(Duration::from_secs(3));

        // Clock clamps to the horizon; the later event is still queued but
        // will never be dispatched in this run.
        assert_eq!(sim.now(), Duration::from_secs(3));
        assert_eq!(sim.pending_event_count(), 1);
        assert!(sim.is_task_awake(0));
        assert!(!sim.is_task_awake(1));
    }

    #[test]
    fn advance_to_never_goes_backwards() {
        let mut sim = SimWorld::new();
        sim.advance_to(Duration::from_secs(4));
        sim.advance_to(Duration::from_secs(2));
        assert_eq!(sim.now(), Duration::from_secs(4));
    }

    #[test]
    fn upgrade_after_teardown_fails() {
        let sim = SimWorld::new();
        let weak = sim.downgrade();
        drop(sim);
        assert!(matches!(
            weak.upgrade(),
            Err(SimulationError::SimulationShutdown)
        ));
    }
}
