use crate::LoadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Environmental coefficients and predicted drift for one resistor.
///
/// The all-zero value is the neutral record returned for unknown serials:
/// it yields no correction at all.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Linear temperature coefficient in ppm/°C.
    pub alpha: f64,
    /// Quadratic temperature coefficient in ppm/°C².
    pub beta: f64,
    /// Pressure coefficient in ppm/kPa.
    pub pcr: f64,
    /// Temperature the coefficients are referred to, in °C.
    pub std_temp: f64,
    /// Predicted deviation from nominal at standard conditions, in ppm.
    pub predicted_drift_ppm: f64,
}

impl Calibration {
    pub fn neutral() -> Self {
        Self::default()
    }

    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }
}

/// Source of calibration records, keyed by resistor serial number.
pub trait CalibrationLookup {
    /// Returns the calibration in force at `at`, or the neutral record when
    /// the serial is unknown.
    fn lookup(&self, serial: &str, at: DateTime<Utc>) -> Calibration;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    pub valid_from: DateTime<Utc>,
    #[serde(flatten)]
    pub calibration: Calibration,
}

/// In-memory calibration table: for every serial, a list of entries each
/// valid from its timestamp until superseded.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CalibrationTable {
    entries: HashMap<String, Vec<CalibrationEntry>>,
}

impl CalibrationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn insert(&mut self, serial: impl Into<String>, entry: CalibrationEntry) {
        let entries = self.entries.entry(serial.into()).or_default();
        entries.push(entry);
        entries.sort_by_key(|e| e.valid_from);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl CalibrationLookup for CalibrationTable {
    fn lookup(&self, serial: &str, at: DateTime<Utc>) -> Calibration {
        self.entries
            .get(serial)
            .and_then(|entries| {
                entries
                    .iter()
                    .filter(|e| e.valid_from <= at)
                    .max_by_key(|e| e.valid_from)
            })
            .map(|e| e.calibration)
            .unwrap_or_else(Calibration::neutral)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn entry(year: i32, drift: f64) -> CalibrationEntry {
        CalibrationEntry {
            valid_from: Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).unwrap(),
            calibration: Calibration {
                alpha: 0.5,
                beta: -0.02,
                pcr: 0.001,
                std_temp: 23.0,
                predicted_drift_ppm: drift,
            },
        }
    }

    #[test]
    fn lookup_uses_latest_entry_in_force() {
        let mut table = CalibrationTable::new();
        table.insert("HR9102", entry(2022, 1.5));
        table.insert("HR9102", entry(2020, 1.0));
        table.insert("HR9102", entry(2025, 2.0));

        let at = Utc.with_ymd_and_hms(2023, 6, 1, 0, 0, 0).unwrap();
        assert_eq!(table.lookup("HR9102", at).predicted_drift_ppm, 1.5);
    }

    #[test]
    fn unknown_serial_is_neutral() {
        let table = CalibrationTable::new();
        let cal = table.lookup("missing", Utc::now());
        assert!(cal.is_neutral());
    }

    #[test]
    fn lookup_before_first_entry_is_neutral() {
        let mut table = CalibrationTable::new();
        table.insert("HR9102", entry(2022, 1.5));
        let at = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert!(table.lookup("HR9102", at).is_neutral());
    }

    #[test]
    fn parse_table() {
        let table = CalibrationTable::from_json(
            r#"{
                "HR9102": [
                    {"valid_from": "2023-01-01T00:00:00Z", "alpha": 0.4, "std_temp": 25.0,
                     "predicted_drift_ppm": -0.8}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(table.len(), 1);
        let cal = table.lookup("HR9102", Utc::now());
        assert_eq!(cal.alpha, 0.4);
        assert_eq!(cal.beta, 0.0);
        assert_eq!(cal.predicted_drift_ppm, -0.8);
    }
}
