//! Reduction of cryogenic current comparator bridge measurements.
//!
//! A pass runs the raw phase-tagged sample stream through four stages:
//! demultiplexing into A-B-B-A cycles ([`window`]), bridge voltage
//! differences ([`bvd`]), calibrated ratios and resistances ([`correct`]) and
//! the stability analysis of the resulting series ([`stability`]).
//! [`pipeline::reduce`] runs one pass and [`Session`] keeps the last good
//! one while parameters change.

pub mod bvd;
pub mod config;
pub mod correct;
pub mod error;
pub mod pipeline;
pub mod session;
pub mod stability;
pub mod window;

mod stats;

pub use config::Config;
pub use error::{ReductionError, Warning, WarningKind};
pub use pipeline::{recompute_stability, reduce, Reduction, ReductionParams};
pub use session::Session;
pub use stats::AggregateStats;
