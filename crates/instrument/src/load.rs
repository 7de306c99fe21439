use crate::{InstrumentRecord, RawAcquisition};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("unable to read file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed document: {0}")]
    Json(#[from] serde_json::Error),
}

/// An already-parsed measurement: the raw acquisition plus the bridge
/// configuration it was taken with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub acquisition: RawAcquisition,
    pub instrument: InstrumentRecord,
}

impl Measurement {
    pub fn load(path: &dyn AsRef<Path>) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(content)?)
    }
}
