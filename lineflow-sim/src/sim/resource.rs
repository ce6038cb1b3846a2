//! Capacity-limited resources with FIFO waiting.
//!
//! A [`Resource`] is the only contention point in the simulation: a station
//! is a capacity-1 resource, the supplier pool a capacity-3 one. Acquisition
//! suspends the caller when the resource is full; release hands the freed
//! slot directly to the longest-waiting requester, so a later arrival can
//! never overtake an earlier one.

use std::{
    cell::RefCell,
    collections::{HashSet, VecDeque},
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
};

/// A waiting acquisition, queued in FIFO order.
#[derive(Debug)]
struct Waiter {
    ticket: u64,
    waker: Option<Waker>,
}

#[derive(Debug)]
struct ResourceInner {
    name: String,
    capacity: usize,
    holders: usize,
    waiters: VecDeque<Waiter>,
    /// Tickets whose slot has been handed over but not yet claimed by a poll.
    granted: HashSet<u64>,
    next_ticket: u64,
}

impl ResourceInner {
    /// Releases one slot: hand it to the head waiter if any, otherwise free it.
    fn release_slot(&mut self) {
        debug_assert!(self.holders <= self.capacity, "resource {} over capacity", self.name);
        if let Some(mut waiter) = self.waiters.pop_front() {
            // Direct handoff: holder count is unchanged, the slot now belongs
            // to the granted ticket.
            self.granted.insert(waiter.ticket);
            if let Some(waker) = waiter.waker.take() {
                waker.wake();
            }
        } else {
            self.holders -= 1;
        }
    }
}

/// A capacity-limited, FIFO-queued lock abstraction.
///
/// Clones share the same underlying state.
#[derive(Debug, Clone)]
pub struct Resource {
    inner: Rc<RefCell<ResourceInner>>,
}

impl Resource {
    /// Creates a resource with the given name and positive capacity.
    pub fn new(name: impl Into<String>, capacity: usize) -> Self {
        debug_assert!(capacity > 0, "resource capacity must be positive");
        Self {
            inner: Rc::new(RefCell::new(ResourceInner {
                name: name.into(),
                capacity,
                holders: 0,
                waiters: VecDeque::new(),
                granted: HashSet::new(),
                next_ticket: 0,
            })),
        }
    }

    /// Acquires one slot, suspending the caller while the resource is full.
    ///
    /// Waiting is strictly FIFO: among two processes waiting on the same
    /// resource, the one that requested first is granted first. The returned
    /// guard releases the slot when dropped, on every exit path.
    pub fn acquire(&self) -> AcquireFuture {
        AcquireFuture {
            resource: Rc::clone(&self.inner),
            ticket: None,
            done: false,
        }
    }

    /// Number of processes currently waiting to acquire.
    pub fn queue_length(&self) -> usize {
        self.inner.borrow().waiters.len()
    }

    /// Number of slots currently held.
    pub fn holders(&self) -> usize {
        self.inner.borrow().holders
    }

    /// The configured capacity.
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    /// The resource name, for logging.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }
}

/// Future returned by [`Resource::acquire`].
pub struct AcquireFuture {
    resource: Rc<RefCell<ResourceInner>>,
    ticket: Option<u64>,
    done: bool,
}

impl Future for AcquireFuture {
    type Output = ResourceGuard;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let resource = Rc::clone(&self.resource);
        let mut inner = resource.borrow_mut();

        match self.ticket {
            None => {
                if inner.holders < inner.capacity {
                    inner.holders += 1;
                    self.done = true;
                    drop(inner);
                    Poll::Ready(ResourceGuard { resource })
                } else {
                    let ticket = inner.next_ticket;
                    inner.next_ticket += 1;
                    inner.waiters.push_back(Waiter {
                        ticket,
                        waker: Some(cx.waker().clone()),
                    });
                    self.ticket = Some(ticket);
                    tracing::trace!(resource = %inner.name, ticket, "waiting for resource");
                    Poll::Pending
                }
            }
            Some(ticket) => {
                if inner.granted.remove(&ticket) {
                    self.done = true;
                    drop(inner);
                    Poll::Ready(ResourceGuard { resource })
                } else {
                    // Refresh the stored waker; the executor may poll us with
                    // a different one than last time.
                    if let Some(waiter) = inner.waiters.iter_mut().find(|w| w.ticket == ticket) {
                        waiter.waker = Some(cx.waker().clone());
                    }
                    Poll::Pending
                }
            }
        }
    }
}

impl Drop for AcquireFuture {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        if let Some(ticket) = self.ticket {
            let mut inner = self.resource.borrow_mut();
            if inner.granted.remove(&ticket) {
                // Granted but never claimed: pass the slot along.
                inner.release_slot();
            } else {
                inner.waiters.retain(|w| w.ticket != ticket);
            }
        }
    }
}

/// Holds one slot of a [`Resource`]; releases it on drop.
///
/// Release wakes the longest-waiting requester if capacity becomes
/// available.
pub struct ResourceGuard {
    resource: Rc<RefCell<ResourceInner>>,
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.resource.borrow_mut().release_slot();
    }
}
