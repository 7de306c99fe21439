//! Conversion of BVD values into calibrated resistance ratios.
//!
//! The bridge balances `R1/R2` against the winding ratio, so each cycle gives
//!
//! ```text
//! ratio = N1/N2 * (1 + k * NA/N1) * (1 + bvd / deltaI2R2)
//! ```
//!
//! The standard resistor's value comes from its calibration (predicted drift
//! plus temperature and pressure corrections) and the unknown resistor is
//! obtained by inverting the ratio around it.

use crate::bvd::BvdRecord;
use crate::error::Warning;
use crate::stats::{finite_or_nan, AggregateStats};
use ccc_instrument::{Calibration, Environment, InstrumentRecord, Resistor, STANDARD_PRESSURE};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Replacement STP predictions in ppm, taking precedence over the
/// calibration's predicted drift.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StpOverride {
    pub r1: Option<f64>,
    pub r2: Option<f64>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResistorRole {
    R1,
    #[default]
    R2,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrectionOptions {
    /// Which resistor is the calibrated standard.
    pub standard: ResistorRole,
    pub stp_override: StpOverride,
    /// Replaces the instrument's reference voltage.
    pub delta_i2_r2: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RatioRecord {
    pub index: usize,
    pub ratio: f64,
    pub std_ratio: f64,
}

/// Per-cycle resistance deviations from nominal, in ppm.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResistanceRecord {
    pub index: usize,
    pub standard_ppm: f64,
    pub unknown_ppm: f64,
    /// Unknown resistor deviation computed from V1 alone.
    pub c1_ppm: f64,
    /// Unknown resistor deviation computed from V2 alone.
    pub c2_ppm: f64,
}

/// A resistor's value at the measurement conditions as predicted by its
/// calibration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedResistor {
    pub serial: String,
    pub nominal: f64,
    pub temperature: f64,
    pub pressure: f64,
    /// Environmental correction in ppm.
    pub correction_ppm: f64,
    /// STP prediction in ppm (override or predicted drift).
    pub stp_ppm: f64,
    pub ppm: f64,
    /// Resistance in ohms.
    pub value: f64,
}

impl ResolvedResistor {
    fn resolve(
        resistor: &Resistor,
        temperature: f64,
        pressure: f64,
        stp_override: Option<f64>,
    ) -> Self {
        let correction_ppm =
            environmental_correction(&resistor.calibration, temperature, pressure);
        let stp_ppm = stp_override.unwrap_or(resistor.calibration.predicted_drift_ppm);
        let ppm = correction_ppm + stp_ppm;

        Self {
            serial: resistor.serial.clone(),
            nominal: resistor.nominal,
            temperature,
            pressure,
            correction_ppm,
            stp_ppm,
            ppm,
            value: (ppm / 1e6 + 1.0) * resistor.nominal,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub compensation: f64,
    pub coupling: f64,
    pub reference_voltage: f64,
    pub standard: ResistorRole,
    pub r1: ResolvedResistor,
    pub r2: ResolvedResistor,
    pub bvd: AggregateStats,
    pub ratio: AggregateStats,
    pub unknown_ppm: AggregateStats,
    pub c1_ppm: AggregateStats,
    pub c2_ppm: AggregateStats,
    /// Ratio computed from the mean BVD.
    pub mean_bvd_ratio: f64,
    /// Unknown resistor deviation computed from the mean BVD.
    pub mean_bvd_unknown_ppm: f64,
    /// Unknown resistor value in ohms computed from the mean BVD.
    pub mean_bvd_unknown_value: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub ratio: Vec<RatioRecord>,
    pub resistance: Vec<ResistanceRecord>,
    pub summary: Summary,
    pub warnings: Vec<Warning>,
}

/// Winding compensation factor and the coupling constant it was built from.
#[derive(Clone, Debug, PartialEq)]
pub struct Compensation {
    pub factor: f64,
    pub coupling: f64,
    pub warning: Option<Warning>,
}

pub fn compensation(instrument: &InstrumentRecord) -> Compensation {
    let (coupling, warning) = match instrument.delta_na_over_n1 {
        None => (0.0, Some(Warning::CompensationDisabled)),
        Some(_) if instrument.na == 0.0 => (0.0, Some(Warning::ZeroCouplingTurns)),
        Some(delta) => (delta / instrument.na, None),
    };

    let factor = instrument.n1 / instrument.n2 * (1.0 + coupling * instrument.na / instrument.n1);

    Compensation {
        factor,
        coupling,
        warning,
    }
}

/// Temperature and pressure correction in ppm relative to the calibration's
/// reference conditions.
pub fn environmental_correction(calibration: &Calibration, temperature: f64, pressure: f64) -> f64 {
    let dt = temperature - calibration.std_temp;
    calibration.alpha * dt
        + calibration.beta * dt * dt
        + calibration.pcr * (pressure - STANDARD_PRESSURE) / 1000.0
}

struct Bridge {
    compensation: f64,
    reference: f64,
    standard: ResistorRole,
    standard_value: f64,
    unknown_nominal: f64,
}

impl Bridge {
    fn ratio(&self, voltage: f64) -> f64 {
        if self.reference == 0.0 {
            return 0.0;
        }
        finite_or_nan(self.compensation * (1.0 + voltage / self.reference))
    }

    fn std_ratio(&self, std_voltage: f64) -> f64 {
        if self.reference == 0.0 {
            return 0.0;
        }
        finite_or_nan(self.compensation * std_voltage / self.reference.abs())
    }

    /// Unknown resistor value in ohms for a measured ratio `R1/R2`.
    fn unknown_value(&self, ratio: f64) -> f64 {
        match self.standard {
            ResistorRole::R2 => ratio * self.standard_value,
            ResistorRole::R1 => self.standard_value / ratio,
        }
    }

    fn unknown_ppm(&self, ratio: f64) -> f64 {
        finite_or_nan((self.unknown_value(ratio) / self.unknown_nominal - 1.0) * 1e6)
    }
}

/// Converts BVD records into ratio and resistance records.
///
/// Without an environment reading each resistor is taken to be at its own
/// calibration temperature and standard pressure.
pub fn correct(
    records: &[BvdRecord],
    instrument: &InstrumentRecord,
    environment: Option<&Environment>,
    options: &CorrectionOptions,
) -> Correction {
    let mut warnings = Vec::new();

    let compensation = compensation(instrument);
    warnings.extend(compensation.warning.clone());

    let reference = options.delta_i2_r2.unwrap_or(instrument.delta_i2_r2);
    if reference == 0.0 {
        warnings.push(Warning::ZeroReferenceVoltage);
    }

    for resistor in [&instrument.r1, &instrument.r2] {
        if resistor.calibration.is_neutral() {
            warnings.push(Warning::MissingCalibration(resistor.serial.clone()));
        }
    }

    let environment = match environment {
        Some(env) => *env,
        None => {
            warnings.push(Warning::EnvironmentFallback);
            Environment {
                t1: instrument.r1.calibration.std_temp,
                t2: instrument.r2.calibration.std_temp,
                p1: STANDARD_PRESSURE,
                p2: STANDARD_PRESSURE,
            }
        }
    };

    let r1 = ResolvedResistor::resolve(
        &instrument.r1,
        environment.t1,
        environment.p1,
        options.stp_override.r1,
    );
    let r2 = ResolvedResistor::resolve(
        &instrument.r2,
        environment.t2,
        environment.p2,
        options.stp_override.r2,
    );

    let (standard, unknown) = match options.standard {
        ResistorRole::R1 => (&r1, &r2),
        ResistorRole::R2 => (&r2, &r1),
    };

    let bridge = Bridge {
        compensation: compensation.factor,
        reference,
        standard: options.standard,
        standard_value: standard.value,
        unknown_nominal: unknown.nominal,
    };

    let ratio: Vec<RatioRecord> = records
        .iter()
        .map(|r| RatioRecord {
            index: r.index,
            ratio: bridge.ratio(r.bvd),
            std_ratio: bridge.std_ratio(r.std_bvd),
        })
        .collect();

    let resistance: Vec<ResistanceRecord> = records
        .iter()
        .zip(ratio.iter())
        .map(|(record, ratio)| ResistanceRecord {
            index: record.index,
            standard_ppm: standard.ppm,
            unknown_ppm: bridge.unknown_ppm(ratio.ratio),
            c1_ppm: bridge.unknown_ppm(bridge.ratio(record.v1)),
            c2_ppm: bridge.unknown_ppm(bridge.ratio(record.v2)),
        })
        .collect();

    let bvd_stats = AggregateStats::of(records.iter().map(|r| r.bvd));
    let ratio_stats = AggregateStats::of(ratio.iter().map(|r| r.ratio));
    let unknown_stats = AggregateStats::of(resistance.iter().map(|r| r.unknown_ppm));
    let c1_stats = AggregateStats::of(resistance.iter().map(|r| r.c1_ppm));
    let c2_stats = AggregateStats::of(resistance.iter().map(|r| r.c2_ppm));

    for (series, stats) in [
        ("bvd", &bvd_stats),
        ("ratio", &ratio_stats),
        ("resistance", &unknown_stats),
    ] {
        if stats.excluded > 0 {
            warnings.push(Warning::NonFinite {
                series: series.to_string(),
                count: stats.excluded,
            });
        }
    }

    let mean_bvd_ratio = bridge.ratio(bvd_stats.mean);
    let summary = Summary {
        compensation: compensation.factor,
        coupling: compensation.coupling,
        reference_voltage: reference,
        standard: options.standard,
        bvd: bvd_stats,
        ratio: ratio_stats,
        unknown_ppm: unknown_stats,
        c1_ppm: c1_stats,
        c2_ppm: c2_stats,
        mean_bvd_ratio,
        mean_bvd_unknown_ppm: bridge.unknown_ppm(mean_bvd_ratio),
        mean_bvd_unknown_value: finite_or_nan(bridge.unknown_value(mean_bvd_ratio)),
        r1,
        r2,
    };

    debug!(
        "corrected {} records: ratio {:.12} unknown {:.4} ppm",
        records.len(),
        summary.ratio.mean,
        summary.mean_bvd_unknown_ppm
    );

    Correction {
        ratio,
        resistance,
        summary,
        warnings,
    }
}
