//! Per-station and per-product bookkeeping.
//!
//! Metrics are mutated only between suspension points by the owning process,
//! so plain fields suffice; nothing here is read concurrently. All durations
//! serialize as fractional seconds of virtual time.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Serde adapter: `Duration` as `f64` seconds.
pub(crate) mod duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        value.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::from_secs_f64(secs))
    }
}

/// Serde adapter: `Option<Duration>` as nullable `f64` seconds.
pub(crate) mod opt_duration_secs {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(|d| d.as_secs_f64()).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        let secs = Option::<f64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs_f64))
    }
}

/// Serde adapter: `Vec<Duration>` as `f64` seconds.
pub(crate) mod duration_secs_vec {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &[Duration],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value
            .iter()
            .map(Duration::as_secs_f64)
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Duration>, D::Error> {
        let secs = Vec::<f64>::deserialize(deserializer)?;
        Ok(secs.into_iter().map(Duration::from_secs_f64).collect())
    }
}

/// Accumulated counters and time series for one station.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StationMetrics {
    /// Items that finished processing here, including later-rejected ones.
    pub processed_items: u64,
    /// Total time spent actively processing.
    #[serde(with = "duration_secs")]
    pub busy_time: Duration,
    /// Total time spent under repair after breakdowns.
    #[serde(with = "duration_secs")]
    pub downtime: Duration,
    /// Repair durations, in breakdown order.
    #[serde(with = "duration_secs_vec")]
    pub fixing_times: Vec<Duration>,
    /// Queue wait per served product, in service order.
    #[serde(with = "duration_secs_vec")]
    pub waiting_times: Vec<Duration>,
    /// Positive gaps between this station's completions and the previous
    /// line-wide completion.
    #[serde(with = "duration_secs_vec")]
    pub bottleneck_delays: Vec<Duration>,
    /// Products whose final (good) completion happened here.
    pub good_products: u64,
    /// Products rejected at this station.
    pub rejected_products: u64,
    /// Accidents attributed to this station.
    pub accident_count: u64,
}

impl StationMetrics {
    /// Mean repair duration in seconds, zero when no breakdown occurred.
    pub fn avg_fixing_time(&self) -> f64 {
        mean_secs(&self.fixing_times)
    }

    /// Mean queue wait in seconds, zero when nothing was served.
    pub fn avg_waiting_time(&self) -> f64 {
        mean_secs(&self.waiting_times)
    }

    /// Mean bottleneck delay in seconds, zero when none was observed.
    pub fn avg_bottleneck_delay(&self) -> f64 {
        mean_secs(&self.bottleneck_delays)
    }
}

fn mean_secs(values: &[Duration]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(Duration::as_secs_f64).sum::<f64>() / values.len() as f64
}

/// Terminal quality of one product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    /// Still traversing the line when the run ended.
    Unknown,
    /// Completed the full route.
    Good,
    /// Rejected at some station.
    Rejected,
}

/// One completed station visit within a product's journey.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationVisit {
    /// Station that served the visit.
    pub station_id: usize,
    /// Virtual time the product turned to this station, before any resupply.
    #[serde(with = "duration_secs")]
    pub entry_time: Duration,
    /// Virtual time the visit finished.
    #[serde(with = "duration_secs")]
    pub exit_time: Duration,
    /// Time spent queued for the station resource.
    #[serde(with = "duration_secs")]
    pub wait_time: Duration,
    /// Time spent in processing, including any repair delay.
    #[serde(with = "duration_secs")]
    pub process_time: Duration,
}

/// The full journey of one product through the line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Virtual time the product entered the line.
    #[serde(with = "duration_secs")]
    pub start_time: Duration,
    /// Virtual time the journey terminated; `None` while in flight.
    #[serde(with = "opt_duration_secs")]
    pub end_time: Option<Duration>,
    /// Completed station visits, in route order.
    pub stations_visit: Vec<StationVisit>,
    /// Terminal quality.
    pub quality: Quality,
    /// Sum of queue waits across all visits.
    #[serde(with = "duration_secs")]
    pub total_wait_time: Duration,
    /// Sum of processing time across all visits.
    #[serde(with = "duration_secs")]
    pub total_process_time: Duration,
}

impl ProductRecord {
    /// A fresh in-flight record starting now.
    pub fn new(start_time: Duration) -> Self {
        Self {
            start_time,
            end_time: None,
            stations_visit: Vec::new(),
            quality: Quality::Unknown,
            total_wait_time: Duration::ZERO,
            total_process_time: Duration::ZERO,
        }
    }
}
