use crate::{Calibration, CalibrationLookup, Environment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One arm of the bridge.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Resistor {
    pub serial: String,
    /// Nominal value in ohms.
    pub nominal: f64,
    #[serde(default)]
    pub calibration: Calibration,
}

/// Bridge configuration for one measurement file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InstrumentRecord {
    /// Primary winding turns.
    pub n1: f64,
    /// Secondary winding turns.
    pub n2: f64,
    /// Auxiliary (coupling) winding turns.
    pub na: f64,
    /// Coupling constant source; absent when the bridge ran uncompensated.
    #[serde(default)]
    pub delta_na_over_n1: Option<f64>,
    /// Reference voltage in volts.
    pub delta_i2_r2: f64,
    pub r1: Resistor,
    pub r2: Resistor,
    /// Averaged temperature and pressure, when a sensor log was available.
    #[serde(default)]
    pub environment: Option<Environment>,
}

impl InstrumentRecord {
    /// Fills neutral resistor calibrations from `lookup`. Calibrations already
    /// present in the record take precedence.
    pub fn resolve_calibrations(&mut self, lookup: &dyn CalibrationLookup, at: DateTime<Utc>) {
        for resistor in [&mut self.r1, &mut self.r2] {
            if resistor.calibration.is_neutral() {
                resistor.calibration = lookup.lookup(&resistor.serial, at);
            }
        }
    }
}
