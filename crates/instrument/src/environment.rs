use crate::LoadError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Temperature (°C) and pressure (Pa) at each resistor during a measurement.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Environment {
    pub t1: f64,
    pub t2: f64,
    pub p1: f64,
    pub p2: f64,
}

/// Source of environment readings averaged over a time window.
pub trait EnvironmentSource {
    /// Average over `[start, end]`, or `None` if there are no readings.
    fn average(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Environment>;
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentReading {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub environment: Environment,
}

/// Timestamped readings already loaded from the sensor logs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Readings(pub Vec<EnvironmentReading>);

impl Readings {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(content)?)
    }
}

impl EnvironmentSource for Readings {
    fn average(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Environment> {
        let window: Vec<&Environment> = self
            .0
            .iter()
            .filter(|r| r.at >= start && r.at <= end)
            .map(|r| &r.environment)
            .collect();

        if window.is_empty() {
            return None;
        }

        let n = window.len() as f64;
        Some(Environment {
            t1: window.iter().map(|e| e.t1).sum::<f64>() / n,
            t2: window.iter().map(|e| e.t2).sum::<f64>() / n,
            p1: window.iter().map(|e| e.p1).sum::<f64>() / n,
            p2: window.iter().map(|e| e.p2).sum::<f64>() / n,
        })
    }
}
