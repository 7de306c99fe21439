//! Bridge voltage differences and their uncertainties.

use crate::stats::{finite_or_nan, mean, sample_std_dev};
use crate::window::Cycle;
use serde::{Deserialize, Serialize};

/// Outlier threshold in standard deviations.
const OUTLIER_SIGMA: f64 = 3.0;

/// Per-cycle bridge voltage difference.
///
/// `v1 = B2 - A1` pairs the outer sub-windows of the cycle and
/// `v2 = B1 - A2` the inner ones.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BvdRecord {
    pub index: usize,
    pub v1: f64,
    pub v2: f64,
    pub bvd: f64,
    pub std_bvd: f64,
}

impl BvdRecord {
    pub fn from_cycle(cycle: &Cycle) -> Self {
        let v1 = cycle.b2.mean - cycle.a1.mean;
        let v2 = cycle.b1.mean - cycle.a2.mean;
        let std_v1 = cycle.a1.std_err.hypot(cycle.b2.std_err);
        let std_v2 = cycle.a2.std_err.hypot(cycle.b1.std_err);

        Self {
            index: cycle.index,
            v1: finite_or_nan(v1),
            v2: finite_or_nan(v2),
            bvd: finite_or_nan((v1 + v2) / 2.0),
            std_bvd: finite_or_nan(std_v1.hypot(std_v2) / 2.0),
        }
    }
}

pub fn build_bvd(cycles: &[Cycle]) -> Vec<BvdRecord> {
    cycles.iter().map(BvdRecord::from_cycle).collect()
}

/// Result of the 3-sigma outlier filter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutlierFilter {
    pub kept: Vec<BvdRecord>,
    /// Positions, in the filtered input, of the records that were removed.
    pub removed: Vec<usize>,
    pub mean: f64,
    pub std_dev: f64,
}

/// Keeps the records whose BVD lies within three sample standard deviations
/// of the mean. Non-finite records take no part in the statistics and are
/// never classified as outliers.
pub fn remove_outliers(records: &[BvdRecord]) -> OutlierFilter {
    let finite: Vec<f64> = records
        .iter()
        .map(|r| r.bvd)
        .filter(|v| v.is_finite())
        .collect();

    let mean = if finite.is_empty() {
        f64::NAN
    } else {
        mean(&finite)
    };
    let std_dev = sample_std_dev(&finite);

    if !std_dev.is_finite() || std_dev == 0.0 {
        return OutlierFilter {
            kept: records.to_vec(),
            removed: vec![],
            mean,
            std_dev,
        };
    }

    let limit = OUTLIER_SIGMA * std_dev;
    let mut kept = Vec::with_capacity(records.len());
    let mut removed = Vec::new();
    for (position, record) in records.iter().enumerate() {
        if record.bvd.is_finite() && (record.bvd - mean).abs() > limit {
            removed.push(position);
        } else {
            kept.push(*record);
        }
    }

    OutlierFilter {
        kept,
        removed,
        mean,
        std_dev,
    }
}

/// Drops the entries at `removed` positions from a series paired with the
/// filtered one, keeping the two index-aligned.
pub fn excise<T: Clone>(paired: &[T], removed: &[usize]) -> Vec<T> {
    paired
        .iter()
        .enumerate()
        .filter(|(position, _)| removed.binary_search(position).is_err())
        .map(|(_, v)| v.clone())
        .collect()
}
