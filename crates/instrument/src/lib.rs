//! Input records for the CCC bridge reduction pipeline.
//!
//! Everything in this crate is produced outside of the reduction core: the
//! raw acquisition and bridge constants come from the instrument file
//! loader, resistor coefficients from the calibration database and
//! temperature/pressure from the environment averager. The core only reads
//! these records.

mod calibration;
mod environment;
mod load;
mod record;
mod sample;

pub use calibration::{Calibration, CalibrationEntry, CalibrationLookup, CalibrationTable};
pub use environment::{Environment, EnvironmentReading, EnvironmentSource, Readings};
pub use load::{LoadError, Measurement};
pub use record::{InstrumentRecord, Resistor};
pub use sample::{PhaseTag, RawAcquisition, RawSample};

/// Standard atmospheric pressure in Pa, the reference for pressure
/// coefficients.
pub const STANDARD_PRESSURE: f64 = 101_325.0;
