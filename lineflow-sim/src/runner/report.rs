//! The result record built once at run end.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::facility::Facility;
use crate::facility::metrics::ProductRecord;

/// Per-station summary derived from its accumulated metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReport {
    /// Fraction of the run the station spent actively processing.
    pub occupancy: f64,
    /// Total repair time in seconds.
    pub downtime: f64,
    /// Mean repair duration in seconds.
    pub avg_fixing_time: f64,
    /// Mean queue wait in seconds.
    pub avg_waiting_time: f64,
    /// Mean positive gap behind the previous line-wide completion, seconds.
    pub avg_bottleneck_delay: f64,
    /// Products whose good completion happened at this station.
    pub good_products: u64,
    /// Products rejected at this station.
    pub rejected_products: u64,
    /// Accidents attributed to this station.
    pub accidents: u64,
}

/// Aggregate snapshot of one completed run.
///
/// Immutable after construction; this is the sole artifact handed to
/// external consumers. Keys are ordered so serialization is byte-stable
/// across identical runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Opaque label the run was configured with.
    pub run_id: String,
    /// Products that completed the full route.
    pub production: u64,
    /// Products rejected anywhere on the line.
    pub rejected: u64,
    /// Supplier busy time as a fraction of the run duration.
    pub supplier_occupancy: f64,
    /// Per-station summaries, keyed by station index.
    pub stations: BTreeMap<usize, StationReport>,
    /// Per-product journey records, present only when configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub products: Option<BTreeMap<u64, ProductRecord>>,
}

impl RunResult {
    /// Snapshots the facility's state into an immutable record.
    pub(crate) fn build(facility: &Facility, run_id: &str, duration: Duration) -> Self {
        let state = facility.state.borrow();
        let duration_secs = duration.as_secs_f64();
        let ratio = |busy: Duration| {
            if duration_secs > 0.0 {
                busy.as_secs_f64() / duration_secs
            } else {
                0.0
            }
        };

        let stations = state
            .metrics
            .iter()
            .enumerate()
            .map(|(station_id, metrics)| {
                (
                    station_id,
                    StationReport {
                        occupancy: ratio(metrics.busy_time),
                        downtime: metrics.downtime.as_secs_f64(),
                        avg_fixing_time: metrics.avg_fixing_time(),
                        avg_waiting_time: metrics.avg_waiting_time(),
                        avg_bottleneck_delay: metrics.avg_bottleneck_delay(),
                        good_products: metrics.good_products,
                        rejected_products: metrics.rejected_products,
                        accidents: metrics.accident_count,
                    },
                )
            })
            .collect();

        let products = if facility.config().record_products {
            Some(state.product_metrics.clone())
        } else {
            None
        };

        Self {
            run_id: run_id.to_string(),
            production: state.total_production,
            rejected: state.rejected_products,
            supplier_occupancy: ratio(state.supplier_busy_time),
            stations,
            products,
        }
    }
}
