use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the bridge excitation when a sample was taken.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseTag {
    Zero,
    RampUp,
    RampDown,
    Top,
    Bottom,
}

/// One voltage reading from the nanovoltmeter.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub index: usize,
    pub value: f64,
    pub phase: PhaseTag,
}

impl RawSample {
    pub fn new(index: usize, value: f64, phase: PhaseTag) -> Self {
        Self {
            index,
            value,
            phase,
        }
    }
}

/// The raw sample stream of one measurement together with its timing and
/// the default trim counts configured on the instrument.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawAcquisition {
    pub samples: Vec<RawSample>,
    pub samples_per_half_cycle: usize,
    #[serde(default)]
    pub ignored_first: usize,
    #[serde(default)]
    pub ignored_last: usize,
    /// Duration of one full A-B-B-A cycle in seconds.
    pub full_cycle_period: f64,
    /// Sample rate of the raw voltmeter channel in Hz.
    pub raw_sample_rate: f64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl RawAcquisition {
    /// Rate at which BVD values are produced, one per full cycle.
    ///
    /// Falls back to one cycle per second when the period is not usable so
    /// that tau values remain expressed in cycles.
    pub fn cycle_rate(&self) -> f64 {
        if self.full_cycle_period.is_finite() && self.full_cycle_period > 0.0 {
            1.0 / self.full_cycle_period
        } else {
            1.0
        }
    }

    /// Midpoint of the acquisition, used when looking up calibration data.
    pub fn midpoint(&self) -> DateTime<Utc> {
        self.start + (self.end - self.start) / 2
    }
}
