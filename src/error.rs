use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failures that abort a reduction pass. The previous pass's results stay in
/// place when one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReductionError {
    #[error("sample stream contains no RAMP_DOWN tag marking the start of the measurement")]
    MissingStartMarker,
    #[error("samples per half cycle must be at least 2")]
    InvalidHalfCycle,
    #[error("trimming {first} leading and {last} trailing samples leaves nothing of a {samples} sample half cycle")]
    InvalidTrim {
        first: usize,
        last: usize,
        samples: usize,
    },
    #[error("no BVD record at position {0}")]
    UnknownPosition(usize),
    #[error("no deleted record to restore")]
    NothingToRestore,
}

/// Category of a non-fatal condition raised during a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningKind {
    /// Too few samples, cycles or tau points for an estimate.
    InsufficientData,
    /// Bridge constants that make a term meaningless.
    DegenerateConfiguration,
    /// Non-finite intermediate values.
    NumericInstability,
    /// Informational: a fallback or filter was applied.
    Advisory,
}

/// Non-fatal condition raised during a pass. Warnings accumulate and are
/// surfaced once per pass.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Warning {
    #[error("no complete measurement cycle in the sample stream")]
    NoCycles,
    #[error("{0} incomplete half-cycle blocks dropped")]
    DroppedBlocks(usize),
    #[error("no coupling constant available, compensation disabled")]
    CompensationDisabled,
    #[error("auxiliary winding has zero turns, compensation disabled")]
    ZeroCouplingTurns,
    #[error("reference voltage is zero, ratios set to 0")]
    ZeroReferenceVoltage,
    #[error("{count} {series} records excluded as non-finite")]
    NonFinite { series: String, count: usize },
    #[error("{0} BVD records removed as outliers")]
    OutliersRemoved(usize),
    #[error("no calibration for resistor {0}, correction disabled")]
    MissingCalibration(String),
    #[error("no environment reading, using standard temperature and pressure")]
    EnvironmentFallback,
    #[error("{0} series too short for stability analysis")]
    ShortSeries(String),
}

impl Warning {
    pub fn kind(&self) -> WarningKind {
        match self {
            Self::NoCycles | Self::DroppedBlocks(_) | Self::ShortSeries(_) => {
                WarningKind::InsufficientData
            }
            Self::CompensationDisabled | Self::ZeroCouplingTurns | Self::ZeroReferenceVoltage => {
                WarningKind::DegenerateConfiguration
            }
            Self::NonFinite { .. } => WarningKind::NumericInstability,
            Self::OutliersRemoved(_) | Self::MissingCalibration(_) | Self::EnvironmentFallback => {
                WarningKind::Advisory
            }
        }
    }
}

/// Joins the warnings of one pass into a single advisory message.
pub fn advisory(warnings: &[Warning]) -> Option<String> {
    if warnings.is_empty() {
        return None;
    }

    Some(
        warnings
            .iter()
            .map(|w| w.to_string())
            .collect::<Vec<_>>()
            .join("; "),
    )
}
