//! Demultiplexing of the raw sample stream into measurement cycles.
//!
//! The bridge current alternates between a bottom and a top plateau, each
//! reached through a ramp. Samples are grouped into half-cycle blocks of a
//! fixed size, every block is trimmed of its settling samples and split into
//! two equal halves, and each bottom block and the top block after it form
//! one cycle:
//!
//! ```text
//!    bottom block k      top block k
//! [  A1  |  A2  ]   [  B1  |  B2  ]   [  A1' | A2' ] ...
//! ```
//!
//! The ramp-down marker opens the first A (bottom) half-cycle. No sub-window
//! is shared between cycles.

use crate::error::ReductionError;
use crate::stats::{mean, sample_std_dev};
use ccc_instrument::{PhaseTag, RawSample};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Mean and standard error of one sub-window.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubWindowStat {
    pub mean: f64,
    pub std_err: f64,
    pub count: usize,
}

impl SubWindowStat {
    pub fn from_samples(values: &[f64]) -> Self {
        let count = values.len();
        Self {
            mean: mean(values),
            std_err: sample_std_dev(values) / (count as f64).sqrt(),
            count,
        }
    }
}

/// One full A-B-B-A measurement cycle.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cycle {
    pub index: usize,
    pub a1: SubWindowStat,
    pub b1: SubWindowStat,
    pub b2: SubWindowStat,
    pub a2: SubWindowStat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    Top,
    Bottom,
}

/// Everything the demultiplexer extracts from one sample stream.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Segmentation {
    /// Cycles built from the trimmed half-cycle blocks.
    pub cycles: Vec<Cycle>,
    /// Cycles built from the same blocks without settle trimming. Index
    /// aligned with `cycles`.
    pub reference: Vec<Cycle>,
    /// Retained samples of every valid top block, in time order.
    pub top: Vec<f64>,
    /// Retained samples of every valid bottom block, in time order.
    pub bottom: Vec<f64>,
    /// Blocks discarded as incomplete or too short.
    pub dropped_blocks: usize,
}

/// Splits `samples` into measurement cycles.
pub fn segment(
    samples: &[RawSample],
    samples_per_half_cycle: usize,
    ignored_first: usize,
    ignored_last: usize,
) -> Result<Vec<Cycle>, ReductionError> {
    demultiplex(samples, samples_per_half_cycle, ignored_first, ignored_last).map(|s| s.cycles)
}

/// Splits `samples` into measurement cycles, also returning the untrimmed
/// comparison cycles and the raw polarity channels.
pub fn demultiplex(
    samples: &[RawSample],
    samples_per_half_cycle: usize,
    ignored_first: usize,
    ignored_last: usize,
) -> Result<Segmentation, ReductionError> {
    if samples_per_half_cycle < 2 {
        return Err(ReductionError::InvalidHalfCycle);
    }
    if ignored_first + ignored_last >= samples_per_half_cycle {
        return Err(ReductionError::InvalidTrim {
            first: ignored_first,
            last: ignored_last,
            samples: samples_per_half_cycle,
        });
    }
    if samples.is_empty() {
        return Ok(Segmentation::default());
    }

    let mut demux = Demultiplexer::new(samples_per_half_cycle, ignored_first, ignored_last);
    for sample in samples {
        demux.push(sample);
    }

    if matches!(demux.rotation, Rotation::SeekStart) {
        return Err(ReductionError::MissingStartMarker);
    }

    let segmentation = demux.finish();
    debug!(
        "segmented {} samples into {} cycles ({} blocks dropped)",
        samples.len(),
        segmentation.cycles.len(),
        segmentation.dropped_blocks
    );
    Ok(segmentation)
}

/// Trimmed and untrimmed statistics of the same half block.
#[derive(Clone, Copy, Debug)]
struct Window {
    trimmed: SubWindowStat,
    reference: SubWindowStat,
}

#[derive(Clone, Copy, Debug)]
enum Rotation {
    SeekStart,
    CollectA1,
    CollectA2 { a1: Window },
    CollectB { a1: Window, a2: Window, b1: Option<Window> },
}

struct Demultiplexer {
    samples_per_half_cycle: usize,
    ignored_first: usize,
    ignored_last: usize,
    rotation: Rotation,
    last_ramp: Polarity,
    block: Vec<f64>,
    block_polarity: Polarity,
    out: Segmentation,
}

impl Demultiplexer {
    fn new(samples_per_half_cycle: usize, ignored_first: usize, ignored_last: usize) -> Self {
        Self {
            samples_per_half_cycle,
            ignored_first,
            ignored_last,
            rotation: Rotation::SeekStart,
            last_ramp: Polarity::Bottom,
            block: Vec::with_capacity(samples_per_half_cycle),
            block_polarity: Polarity::Bottom,
            out: Segmentation::default(),
        }
    }

    fn push(&mut self, sample: &RawSample) {
        if matches!(self.rotation, Rotation::SeekStart) {
            if sample.phase != PhaseTag::RampDown {
                return;
            }
            trace!("measurement starts at sample {}", sample.index);
            self.rotation = Rotation::CollectA1;
        }

        let polarity = self.classify(sample.phase);
        if !self.block.is_empty() && polarity != self.block_polarity {
            self.close_block();
        }

        self.block_polarity = polarity;
        self.block.push(sample.value);
        if self.block.len() == self.samples_per_half_cycle {
            self.close_block();
        }
    }

    fn classify(&mut self, phase: PhaseTag) -> Polarity {
        match phase {
            PhaseTag::Top => Polarity::Top,
            PhaseTag::Bottom => Polarity::Bottom,
            PhaseTag::RampUp => {
                self.last_ramp = Polarity::Top;
                Polarity::Top
            }
            PhaseTag::RampDown => {
                self.last_ramp = Polarity::Bottom;
                Polarity::Bottom
            }
            PhaseTag::Zero => self.last_ramp,
        }
    }

    fn close_block(&mut self) {
        let values = std::mem::take(&mut self.block);
        match self.halves(&values) {
            Some((first, second)) => {
                let end = values.len() - self.ignored_last;
                let retained = &values[self.ignored_first..end];
                match self.block_polarity {
                    Polarity::Top => self.out.top.extend_from_slice(retained),
                    Polarity::Bottom => self.out.bottom.extend_from_slice(retained),
                }
                self.advance(self.block_polarity, first);
                self.advance(self.block_polarity, second);
            }
            None => {
                trace!(
                    "dropping {:?} block of {} samples",
                    self.block_polarity,
                    values.len()
                );
                self.out.dropped_blocks += 1;
                self.rotation = Rotation::CollectA1;
            }
        }
        self.block = values;
        self.block.clear();
    }

    /// Splits a complete block into its two half windows, or `None` when the
    /// block is incomplete or too short after trimming.
    fn halves(&self, values: &[f64]) -> Option<(Window, Window)> {
        if values.len() != self.samples_per_half_cycle {
            return None;
        }

        let end = values.len() - self.ignored_last;
        let retained = &values[self.ignored_first..end];
        if retained.len() <= self.ignored_first + self.ignored_last || retained.len() < 2 {
            return None;
        }

        let (trimmed_first, trimmed_second) = split(retained);
        let (reference_first, reference_second) = split(values);

        Some((
            Window {
                trimmed: SubWindowStat::from_samples(trimmed_first),
                reference: SubWindowStat::from_samples(reference_first),
            },
            Window {
                trimmed: SubWindowStat::from_samples(trimmed_second),
                reference: SubWindowStat::from_samples(reference_second),
            },
        ))
    }

    /// Feeds the next half window to the rotation. Halves arrive in pairs,
    /// so an A pair always comes from a single bottom block.
    fn advance(&mut self, polarity: Polarity, window: Window) {
        self.rotation = match (self.rotation, polarity) {
            (Rotation::SeekStart, _) => Rotation::SeekStart,
            (Rotation::CollectA1, Polarity::Bottom) => Rotation::CollectA2 { a1: window },
            (Rotation::CollectA1, Polarity::Top) => Rotation::CollectA1,
            (Rotation::CollectA2 { a1 }, Polarity::Bottom) => Rotation::CollectB {
                a1,
                a2: window,
                b1: None,
            },
            (Rotation::CollectA2 { .. }, Polarity::Top) => Rotation::CollectA1,
            (Rotation::CollectB { a1, a2, b1: None }, Polarity::Top) => Rotation::CollectB {
                a1,
                a2,
                b1: Some(window),
            },
            (Rotation::CollectB { a1, a2, b1: Some(b1) }, Polarity::Top) => {
                self.emit(a1, b1, window, a2);
                Rotation::CollectA1
            }
            // the B half cycle went missing; restart from this A block
            (Rotation::CollectB { .. }, Polarity::Bottom) => Rotation::CollectA2 { a1: window },
        };
    }

    fn emit(&mut self, a1: Window, b1: Window, b2: Window, a2: Window) {
        let index = self.out.cycles.len();
        self.out.cycles.push(Cycle {
            index,
            a1: a1.trimmed,
            b1: b1.trimmed,
            b2: b2.trimmed,
            a2: a2.trimmed,
        });
        self.out.reference.push(Cycle {
            index,
            a1: a1.reference,
            b1: b1.reference,
            b2: b2.reference,
            a2: a2.reference,
        });
    }

    fn finish(mut self) -> Segmentation {
        if !self.block.is_empty() {
            self.close_block();
        }
        self.out
    }
}

/// Splits into two equal halves; the middle sample of an odd-length slice
/// belongs to neither.
fn split(values: &[f64]) -> (&[f64], &[f64]) {
    let half = values.len() / 2;
    (&values[..half], &values[values.len() - half..])
}
