//! Engine-level tests: virtual-time sleeps and resource contention driven
//! through the same cooperative loop the runner uses.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use lineflow_sim::sim::{Resource, SimWorld};

fn test_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("failed to build current-thread runtime")
}

/// Alternates task progress and event stepping until nothing is runnable.
fn drive_until_idle(sim: &mut SimWorld, rt: &tokio::runtime::Runtime, local: &tokio::task::LocalSet) {
    local.block_on(rt, async {
        let mut idle_rounds = 0;
        while idle_rounds <= 8 {
            tokio::task::yield_now().await;
            if sim.has_pending_events() {
                sim.step();
                idle_rounds = 0;
            } else {
                idle_rounds += 1;
            }
        }
    });
}

#[test]
fn sleep_wakes_at_exact_virtual_time() {
    let mut sim = SimWorld::new_with_seed(0);
    let rt = test_runtime();
    let local = tokio::task::LocalSet::new();

    let observed = Rc::new(RefCell::new(None));
    {
        let observed = Rc::clone(&observed);
        let world = sim.downgrade();
        local.spawn_local(async move {
            world
                .sleep(Duration::from_secs(5))
                .expect("world alive")
                .await
                .expect("sleep completes");
            *observed.borrow_mut() = Some(world.now().expect("world alive"));
        });
    }

    drive_until_idle(&mut sim, &rt, &local);
    assert_eq!(*observed.borrow(), Some(Duration::from_secs(5)));
}

#[test]
fn sleeps_complete_in_duration_order() {
    let mut sim = SimWorld::new_with_seed(0);
    let rt = test_runtime();
    let local = tokio::task::LocalSet::new();

    let order = Rc::new(RefCell::new(Vec::new()));
    for (label, secs) in [("slow", 9), ("fast", 2), ("medium", 4)] {
        let order = Rc::clone(&order);
        let world = sim.downgrade();
        local.spawn_local(async move {
            world
                .sleep(Duration::from_secs(secs))
                .expect("world alive")
                .await
                .expect("sleep completes");
            order.borrow_mut().push(label);
        });
    }

    drive_until_idle(&mut sim, &rt, &local);
    assert_eq!(*order.borrow(), vec!["fast", "medium", "slow"]);
}

#[test]
fn same_instant_sleeps_resolve_in_schedule_order() {
    let mut sim = SimWorld::new_with_seed(0);
    let rt = test_runtime();
    let local = tokio::task::LocalSet::new();

    let order = Rc::new(RefCell::new(Vec::new()));
    for label in ["first", "second", "third"] {
        let order = Rc::clone(&order);
        let world = sim.downgrade();
        local.spawn_local(async move {
            world
                .sleep(Duration::from_secs(3))
                .expect("world alive")
                .await
                .expect("sleep completes");
            order.borrow_mut().push(label);
        });
    }

    drive_until_idle(&mut sim, &rt, &local);
    assert_eq!(*order.borrow(), vec!["first", "second", "third"]);
}

#[test]
fn contended_resource_serializes_holders_in_virtual_time() {
    let mut sim = SimWorld::new_with_seed(0);
    let rt = test_runtime();
    let local = tokio::task::LocalSet::new();

    let station = Resource::new("station", 1);
    let completions = Rc::new(RefCell::new(Vec::new()));

    for id in 0..3u32 {
        let station = station.clone();
        let completions = Rc::clone(&completions);
        let world = sim.downgrade();
        local.spawn_local(async move {
            let _slot = station.acquire().await;
            world
                .sleep(Duration::from_secs(5))
                .expect("world alive")
                .await
                .expect("sleep completes");
            completions
                .borrow_mut()
                .push((id, world.now().expect("world alive")));
        });
    }

    drive_until_idle(&mut sim, &rt, &local);

    // Capacity 1 and 5s of holding each: strict FIFO back-to-back service.
    assert_eq!(
        *completions.borrow(),
        vec![
            (0, Duration::from_secs(5)),
            (1, Duration::from_secs(10)),
            (2, Duration::from_secs(15)),
        ]
    );
    assert_eq!(station.holders(), 0);
    assert_eq!(station.queue_length(), 0);
}
