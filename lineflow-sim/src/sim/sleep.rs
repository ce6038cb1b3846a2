//! Sleeping in virtual time.
//!
//! A sleep is a future wired into the event system: scheduling it enqueues a
//! timer event, and the future completes once the clock has advanced past the
//! event and processed it.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::SimulationResult;
use crate::sim::world::WeakSimWorld;

/// Future that completes after a specified virtual-time duration.
///
/// Created by [`SimWorld::sleep`](crate::sim::SimWorld::sleep). Completes
/// with `Ok(())` once the scheduled timer event has been processed; errors
/// only if the simulation world was torn down underneath it.
pub struct SleepFuture {
    sim: WeakSimWorld,
    task_id: u64,
    completed: bool,
}

impl SleepFuture {
    pub(crate) fn new(sim: WeakSimWorld, task_id: u64) -> Self {
        Self {
            sim,
            task_id,
            completed: false,
        }
    }
}

impl Future for SleepFuture {
    type Output = SimulationResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.completed {
            return Poll::Ready(Ok(()));
        }

        let sim = match self.sim.upgrade() {
            Ok(sim) => sim,
            Err(e) => return Poll::Ready(Err(e)),
        };

        if sim.is_task_awake(self.task_id) {
            self.completed = true;
            Poll::Ready(Ok(()))
        } else {
            // Not woken yet; re-register the waker on every poll.
            sim.register_task_waker(self.task_id, cx.waker().clone());
            Poll::Pending
        }
    }
}
