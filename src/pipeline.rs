//! One full reduction pass: raw samples to corrected ratios and stability.

use crate::bvd::{build_bvd, excise, remove_outliers, BvdRecord};
use crate::correct::{
    correct, CorrectionOptions, RatioRecord, ResistanceRecord, ResistorRole, StpOverride, Summary,
};
use crate::error::{advisory, ReductionError, Warning};
use crate::stability::{
    analyze, analyze_channel, StabilityParams, StabilityReport, StabilityResult,
};
use crate::window::{demultiplex, Cycle};
use ccc_instrument::{InstrumentRecord, RawAcquisition};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// User-adjustable inputs of a pass. Trim counts left unset fall back to the
/// values recorded with the acquisition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReductionParams {
    pub ignored_first: Option<usize>,
    pub ignored_last: Option<usize>,
    pub remove_outliers: bool,
    pub standard: ResistorRole,
    pub stp_override: StpOverride,
    /// Reference voltage override.
    pub delta_i2_r2: Option<f64>,
    pub stability: StabilityParams,
    /// Cycle indices deleted by the user, most recent last.
    pub deleted: Vec<usize>,
}

impl ReductionParams {
    fn correction_options(&self) -> CorrectionOptions {
        CorrectionOptions {
            standard: self.standard,
            stp_override: self.stp_override,
            delta_i2_r2: self.delta_i2_r2,
        }
    }
}

/// Output of one reduction pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reduction {
    /// Every cycle found in the sample stream.
    pub cycles: Vec<Cycle>,
    /// BVD records after outlier removal and user deletions.
    pub bvd: Vec<BvdRecord>,
    /// Untrimmed comparison channel, index-aligned with `bvd`.
    pub reference: Vec<BvdRecord>,
    /// Cycle indices removed by the outlier filter.
    pub removed_outliers: Vec<usize>,
    pub ratio: Vec<RatioRecord>,
    pub resistance: Vec<ResistanceRecord>,
    pub summary: Summary,
    pub stability: StabilityReport,
    pub warnings: Vec<Warning>,
}

impl Reduction {
    /// All warnings of the pass as one message.
    pub fn advisory(&self) -> Option<String> {
        advisory(&self.warnings)
    }
}

/// Reduces a raw acquisition. Every derived record is rebuilt from scratch.
pub fn reduce(
    acquisition: &RawAcquisition,
    instrument: &InstrumentRecord,
    params: &ReductionParams,
) -> Result<Reduction, ReductionError> {
    let ignored_first = params.ignored_first.unwrap_or(acquisition.ignored_first);
    let ignored_last = params.ignored_last.unwrap_or(acquisition.ignored_last);

    let segmentation = demultiplex(
        &acquisition.samples,
        acquisition.samples_per_half_cycle,
        ignored_first,
        ignored_last,
    )?;

    let mut warnings = Vec::new();
    if segmentation.dropped_blocks > 0 {
        warnings.push(Warning::DroppedBlocks(segmentation.dropped_blocks));
    }
    if segmentation.cycles.is_empty() {
        warnings.push(Warning::NoCycles);
    }

    let mut bvd = build_bvd(&segmentation.cycles);
    let mut reference = build_bvd(&segmentation.reference);

    let mut removed_outliers = Vec::new();
    if params.remove_outliers {
        let filter = remove_outliers(&bvd);
        removed_outliers = filter.removed.iter().map(|&p| bvd[p].index).collect();
        reference = excise(&reference, &filter.removed);
        bvd = filter.kept;
        if !removed_outliers.is_empty() {
            debug!("outlier filter removed cycles {:?}", removed_outliers);
            warnings.push(Warning::OutliersRemoved(removed_outliers.len()));
        }
    }

    if !params.deleted.is_empty() {
        let positions: Vec<usize> = bvd
            .iter()
            .enumerate()
            .filter(|(_, r)| params.deleted.contains(&r.index))
            .map(|(p, _)| p)
            .collect();
        reference = excise(&reference, &positions);
        bvd = excise(&bvd, &positions);
    }

    let correction = correct(
        &bvd,
        instrument,
        instrument.environment.as_ref(),
        &params.correction_options(),
    );
    warnings.extend(correction.warnings);

    let stability = stability_report(
        &bvd,
        &segmentation.top,
        &segmentation.bottom,
        acquisition,
        &params.stability,
    );
    if !bvd.is_empty() && stability.bvd.allan.is_empty() {
        warnings.push(Warning::ShortSeries("bvd".to_string()));
    }

    let reduction = Reduction {
        cycles: segmentation.cycles,
        bvd,
        reference,
        removed_outliers,
        ratio: correction.ratio,
        resistance: correction.resistance,
        summary: correction.summary,
        stability,
        warnings,
    };

    info!(
        "reduced {} cycles to {} BVD records, mean ratio {:.12}",
        reduction.cycles.len(),
        reduction.bvd.len(),
        reduction.summary.ratio.mean
    );
    if let Some(message) = reduction.advisory() {
        warn!("{message}");
    }

    Ok(reduction)
}

fn stability_report(
    bvd: &[BvdRecord],
    top: &[f64],
    bottom: &[f64],
    acquisition: &RawAcquisition,
    params: &StabilityParams,
) -> StabilityReport {
    let cycle_rate = acquisition.cycle_rate();
    let series = |f: fn(&BvdRecord) -> f64| bvd.iter().map(f).collect::<Vec<f64>>();

    StabilityReport {
        bvd: analyze(&series(|r| r.bvd), cycle_rate, params),
        v1: analyze_channel(&series(|r| r.v1), cycle_rate, params),
        v2: analyze_channel(&series(|r| r.v2), cycle_rate, params),
        top: analyze_channel(top, acquisition.raw_sample_rate, params),
        bottom: analyze_channel(bottom, acquisition.raw_sample_rate, params),
    }
}

/// Reruns the stability analysis on an arbitrary series.
pub fn recompute_stability(
    series: &[f64],
    sampling_rate: f64,
    params: &StabilityParams,
) -> StabilityResult {
    analyze(series, sampling_rate, params)
}


#[cfg(test)]
mod tests {
    use super::fixtures::{acquisition, instrument, HALF_CYCLE, LEVEL};
    use super::*;
    use crate::error::WarningKind;

    #[test]
    fn series_stay_aligned() {
        let reduction = reduce(&acquisition(40, &[]), &instrument(), &ReductionParams::default())
            .unwrap();
        assert_eq!(reduction.cycles.len(), 40);
        assert_eq!(reduction.bvd.len(), 40);
        assert_eq!(reduction.ratio.len(), reduction.bvd.len());
        assert_eq!(reduction.resistance.len(), reduction.bvd.len());
        assert_eq!(reduction.reference.len(), reduction.bvd.len());
        assert!(reduction.warnings.is_empty(), "{:?}", reduction.warnings);

        for record in &reduction.bvd {
            assert!((record.bvd - LEVEL).abs() < 1e-5);
        }
        assert!(!reduction.stability.bvd.allan.is_empty());
        assert!(!reduction.stability.top.allan.is_empty());
        assert!(!reduction.stability.bottom.psd.is_empty());
    }

    #[test]
    fn reduction_is_idempotent() {
        let acquisition = acquisition(32, &[3]);
        let params = ReductionParams {
            remove_outliers: true,
            ..Default::default()
        };
        let first = reduce(&acquisition, &instrument(), &params).unwrap();
        let second = reduce(&acquisition, &instrument(), &params).unwrap();
        assert_eq!(first.bvd, second.bvd);
        assert_eq!(first.ratio, second.ratio);
        assert_eq!(first.resistance, second.resistance);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn zero_reference_voltage() {
        let params = ReductionParams {
            delta_i2_r2: Some(0.0),
            ..Default::default()
        };
        let reduction = reduce(&acquisition(10, &[]), &instrument(), &params).unwrap();
        assert!(reduction.ratio.iter().all(|r| r.ratio == 0.0));
        assert!(reduction
            .warnings
            .iter()
            .any(|w| *w == Warning::ZeroReferenceVoltage
                && w.kind() == WarningKind::DegenerateConfiguration));
    }

    #[test]
    fn outliers_leave_series_aligned() {
        let params = ReductionParams {
            remove_outliers: true,
            ..Default::default()
        };
        let reduction = reduce(&acquisition(40, &[17]), &instrument(), &params).unwrap();
        assert_eq!(reduction.removed_outliers, vec![17]);
        assert_eq!(reduction.cycles.len(), 40);
        assert_eq!(reduction.bvd.len(), 39);
        assert_eq!(reduction.ratio.len(), 39);
        assert!(reduction
            .bvd
            .iter()
            .zip(&reduction.reference)
            .all(|(b, r)| b.index == r.index));
        assert!(reduction.warnings.contains(&Warning::OutliersRemoved(1)));
    }

    #[test]
    fn deleted_cycles_are_excluded() {
        let params = ReductionParams {
            deleted: vec![5, 2],
            ..Default::default()
        };
        let reduction = reduce(&acquisition(10, &[]), &instrument(), &params).unwrap();
        let indices: Vec<usize> = reduction.bvd.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 3, 4, 6, 7, 8, 9]);
        let reference: Vec<usize> = reduction.reference.iter().map(|r| r.index).collect();
        assert_eq!(reference, indices);
    }

    #[test]
    fn trim_override() {
        let acquisition = acquisition(4, &[]);
        let default = reduce(&acquisition, &instrument(), &ReductionParams::default()).unwrap();
        assert_eq!(default.cycles[0].a1.count, 3);

        let params = ReductionParams {
            ignored_first: Some(0),
            ignored_last: Some(0),
            ..Default::default()
        };
        let untrimmed = reduce(&acquisition, &instrument(), &params).unwrap();
        assert_eq!(untrimmed.cycles[0].a1.count, HALF_CYCLE / 2);

        let params = ReductionParams {
            ignored_first: Some(HALF_CYCLE),
            ..Default::default()
        };
        assert!(matches!(
            reduce(&acquisition, &instrument(), &params),
            Err(ReductionError::InvalidTrim { .. })
        ));
    }

    #[test]
    fn no_cycles_is_not_an_error() {
        // a single partial bottom block
        let mut acquisition = acquisition(1, &[]);
        acquisition.samples.truncate(8);
        let reduction = reduce(&acquisition, &instrument(), &ReductionParams::default()).unwrap();
        assert!(reduction.bvd.is_empty());
        assert!(reduction.ratio.is_empty());
        assert!(reduction.warnings.contains(&Warning::NoCycles));
        assert!(reduction.stability.bvd.allan.is_empty());
    }

    #[test]
    fn recompute_matches_pass() {
        let acquisition = acquisition(24, &[]);
        let params = ReductionParams::default();
        let reduction = reduce(&acquisition, &instrument(), &params).unwrap();
        let series: Vec<f64> = reduction.bvd.iter().map(|r| r.bvd).collect();
        let recomputed = recompute_stability(&series, acquisition.cycle_rate(), &params.stability);
        assert_eq!(recomputed, reduction.stability.bvd);
    }
}
