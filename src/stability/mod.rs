//! Time-domain and frequency-domain stability of a measurement series.

use serde::{Deserialize, Serialize};
use tracing::debug;

mod acf;
mod allan;
mod noise;
mod psd;

pub use acf::{autocorrelation, autocorrelation_variance, variance_of_mean, Autocorrelation};
pub use allan::{analyze_allan, tau_grid, AllanDeviation, TauSet, VarianceType};
pub use noise::{classify, NoiseClassification, NoiseType};
pub use psd::{welch, white_reference, PowerSpectrum};

/// Estimator selection for the Allan plot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StabilityParams {
    pub variance: VarianceType,
    pub overlapping: bool,
    pub taus: TauSet,
}

/// Full analysis of a primary series.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityResult {
    pub allan: AllanDeviation,
    /// White-noise reference line at each Allan tau, empty without a noise
    /// floor.
    pub white_reference: Vec<f64>,
    pub psd: PowerSpectrum,
    pub h0: Option<f64>,
    pub acf: Autocorrelation,
    pub variance_of_mean: f64,
    pub autocorr_variance: f64,
    pub noise: NoiseClassification,
}

/// Reduced analysis for secondary channels.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelStability {
    pub allan: AllanDeviation,
    pub psd: PowerSpectrum,
    pub h0: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityReport {
    pub bvd: StabilityResult,
    pub v1: ChannelStability,
    pub v2: ChannelStability,
    pub top: ChannelStability,
    pub bottom: ChannelStability,
}

fn finite(series: &[f64]) -> Vec<f64> {
    let values: Vec<f64> = series.iter().copied().filter(|v| v.is_finite()).collect();
    if values.len() != series.len() {
        debug!(
            "skipping {} non-finite values in stability input",
            series.len() - values.len()
        );
    }
    values
}

/// Runs every estimator over the finite values of `series`, sampled at
/// `sampling_rate` Hz.
pub fn analyze(series: &[f64], sampling_rate: f64, params: &StabilityParams) -> StabilityResult {
    let series = finite(series);

    let allan = analyze_allan(
        &series,
        sampling_rate,
        params.variance,
        params.overlapping,
        params.taus,
    );
    let psd = welch(&series, sampling_rate);
    let h0 = psd.noise_floor();
    let white_reference = h0
        .map(|h0| white_reference(h0, &allan.taus))
        .unwrap_or_default();
    let acf = autocorrelation(&series);
    let variance_of_mean = variance_of_mean(&series);
    let autocorr_variance = autocorrelation_variance(&series, &acf);
    let noise = classify(&psd);

    debug!(
        "stability: {} points, {} taus, {} psd bins, cutoff lag {}, noise {:?}",
        series.len(),
        allan.len(),
        psd.len(),
        acf.cutoff_lag,
        noise.noise_type
    );

    StabilityResult {
        allan,
        white_reference,
        psd,
        h0,
        acf,
        variance_of_mean,
        autocorr_variance,
        noise,
    }
}

/// Allan deviation on the octave grid and PSD of a secondary channel.
pub fn analyze_channel(
    series: &[f64],
    sampling_rate: f64,
    params: &StabilityParams,
) -> ChannelStability {
    let series = finite(series);

    let allan = analyze_allan(
        &series,
        sampling_rate,
        params.variance,
        params.overlapping,
        TauSet::Octave,
    );
    let psd = welch(&series, sampling_rate);
    let h0 = psd.noise_floor();

    ChannelStability { allan, psd, h0 }
}
