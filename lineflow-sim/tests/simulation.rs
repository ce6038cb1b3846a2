//! Full-run tests over the public `run_simulation` entry point.

use std::time::Duration;

use lineflow_sim::facility::config::{FacilityConfig, RejectionPolicy, RunConfig};
use lineflow_sim::facility::metrics::Quality;
use lineflow_sim::{SimulationError, run_simulation};

/// A line with no stochastic failures: no breakdowns, no rejections, no
/// accidents. Only processing and resupply delays remain random.
fn clean_line() -> FacilityConfig {
    FacilityConfig {
        failure_probs: [0.0; 6],
        rejection: RejectionPolicy::PerStation { probability: 0.0 },
        accident_probability: 0.0,
        ..FacilityConfig::default()
    }
}

#[test]
fn zero_duration_yields_empty_result() {
    let config = RunConfig::new(1, "zero", Duration::ZERO);
    let result = run_simulation(&config).expect("zero-duration run succeeds");

    assert_eq!(result.production, 0);
    assert_eq!(result.rejected, 0);
    assert_eq!(result.supplier_occupancy, 0.0);
    assert_eq!(result.stations.len(), 6);
    for report in result.stations.values() {
        assert_eq!(report.occupancy, 0.0);
        assert_eq!(report.good_products, 0);
        assert_eq!(report.rejected_products, 0);
    }
}

#[test]
fn invalid_config_fails_before_running() {
    let mut config = RunConfig::new(1, "bad", Duration::from_secs(10));
    config.facility.failure_probs[0] = 2.0;
    assert!(matches!(
        run_simulation(&config),
        Err(SimulationError::InvalidConfig(_))
    ));
}

#[test]
fn identical_seeds_produce_identical_results() {
    let mut config = RunConfig::new(42, "twin", Duration::from_secs(100));
    config.facility.record_products = true;

    let first = run_simulation(&config).expect("run succeeds");
    let second = run_simulation(&config).expect("run succeeds");

    assert_eq!(first, second);
    let first_json = serde_json::to_string(&first).expect("serializes");
    let second_json = serde_json::to_string(&second).expect("serializes");
    assert_eq!(first_json, second_json);
}

#[test]
fn different_seeds_diverge() {
    let duration = Duration::from_secs(200);
    let mut config_a = RunConfig::new(1, "a", duration);
    config_a.facility.record_products = true;
    let mut config_b = RunConfig::new(2, "b", duration);
    config_b.facility.record_products = true;

    let a = run_simulation(&config_a).expect("run succeeds");
    let b = run_simulation(&config_b).expect("run succeeds");

    assert_ne!(a.products, b.products);
}

#[test]
fn no_rejections_when_probabilities_are_zero() {
    let mut config = RunConfig::new(7, "clean", Duration::from_secs(100));
    config.facility = clean_line();

    let result = run_simulation(&config).expect("run succeeds");

    assert_eq!(result.rejected, 0);
    for report in result.stations.values() {
        assert_eq!(report.rejected_products, 0);
        assert_eq!(report.accidents, 0);
    }
    assert!(result.production > 0, "100s run should complete products");
    // Good completions are attributed to the final station of each route.
    let good_total: u64 = result.stations.values().map(|s| s.good_products).sum();
    assert_eq!(good_total, result.production);
}

#[test]
fn every_terminated_product_is_accounted() {
    let mut config = RunConfig::new(11, "accounting", Duration::from_secs(150));
    config.facility = clean_line();
    config.facility.rejection = RejectionPolicy::PerStation { probability: 0.05 };
    config.facility.record_products = true;

    let result = run_simulation(&config).expect("run succeeds");
    let products = result.products.as_ref().expect("recording enabled");

    let good = products
        .values()
        .filter(|p| p.quality == Quality::Good)
        .count() as u64;
    let rejected = products
        .values()
        .filter(|p| p.quality == Quality::Rejected)
        .count() as u64;
    let resolved = products.values().filter(|p| p.end_time.is_some()).count() as u64;

    assert_eq!(good, result.production);
    assert_eq!(rejected, result.rejected);
    assert_eq!(good + rejected, resolved);
    // In-flight products at the horizon stay unknown with no end time.
    for record in products.values().filter(|p| p.quality == Quality::Unknown) {
        assert!(record.end_time.is_none());
    }
}

#[test]
fn end_of_route_policy_rejects_only_at_parallel_stations() {
    let mut config = RunConfig::new(5, "end-of-route", Duration::from_secs(100));
    config.facility = clean_line();
    config.facility.rejection = RejectionPolicy::EndOfRoute { probability: 1.0 };

    let result = run_simulation(&config).expect("run succeeds");

    // A certain end-of-route rejection means nothing ever completes.
    assert_eq!(result.production, 0);
    assert!(result.rejected > 0, "products should reach the final station");
    for station_id in 0..4 {
        assert_eq!(result.stations[&station_id].rejected_products, 0);
    }
    let parallel_rejections: u64 = [4, 5]
        .iter()
        .map(|id| result.stations[id].rejected_products)
        .sum();
    assert!(parallel_rejections > 0);
}

#[test]
fn accident_stops_admissions_early() {
    let duration = Duration::from_secs(240);
    let mut baseline = RunConfig::new(3, "no-accident", duration);
    baseline.facility.accident_probability = 0.0;
    baseline.facility.record_products = true;
    let mut config = RunConfig::new(3, "accident", duration);
    config.facility.accident_probability = 1.0;
    config.facility.record_products = true;

    let baseline_result = run_simulation(&baseline).expect("run succeeds");
    let result = run_simulation(&config).expect("run succeeds");

    // The arrival loop stops at the first accident, so at most one is ever
    // recorded per run.
    let accidents: u64 = result.stations.values().map(|s| s.accidents).sum();
    assert_eq!(accidents, 1);
    let baseline_accidents: u64 = baseline_result.stations.values().map(|s| s.accidents).sum();
    assert_eq!(baseline_accidents, 0);

    // Same seed, so both runs admit identically until the accident tick;
    // after it only the baseline keeps admitting.
    let admitted = result.products.as_ref().expect("recording enabled").len();
    let baseline_admitted = baseline_result
        .products
        .as_ref()
        .expect("recording enabled")
        .len();
    assert!(
        admitted < baseline_admitted,
        "admissions must stop early ({admitted} vs {baseline_admitted})"
    );

    // Products already on the line are not cancelled by the accident.
    assert!(result.production + result.rejected > 0);
}

#[test]
fn single_unit_bins_force_constant_resupply() {
    let mut config = RunConfig::new(9, "tight-bins", Duration::from_secs(60));
    config.facility = clean_line();
    // One unit per refill forces a resupply before nearly every consumption.
    config.facility.bin_capacity = 1;

    let result = run_simulation(&config).expect("run succeeds");
    assert!(result.supplier_occupancy > 0.0, "resupply must have run");
    assert_eq!(result.rejected, 0);
}

#[test]
fn occupancies_stay_in_range() {
    let config = RunConfig::new(13, "ranges", Duration::from_secs(120));
    let result = run_simulation(&config).expect("run succeeds");

    assert!((0.0..=1.0).contains(&result.supplier_occupancy));
    for report in result.stations.values() {
        assert!(report.occupancy >= 0.0);
        assert!(report.occupancy <= 1.0);
        assert!(report.avg_waiting_time >= 0.0);
        assert!(report.avg_fixing_time >= 0.0);
    }
}
