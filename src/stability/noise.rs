use super::psd::PowerSpectrum;
use serde::{Deserialize, Serialize};

/// Colored-noise family, identified from the power-law exponent `alpha` of
/// the spectral density `S(f) ~ f^alpha`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseType {
    /// alpha near 0
    White,
    /// alpha near -1
    Flicker,
    /// alpha near -2
    RandomWalk,
    #[default]
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NoiseClassification {
    /// Fitted spectral exponent, NaN when it could not be estimated.
    pub exponent: f64,
    pub noise_type: NoiseType,
}

impl Default for NoiseClassification {
    fn default() -> Self {
        Self {
            exponent: f64::NAN,
            noise_type: NoiseType::Unknown,
        }
    }
}

impl NoiseType {
    pub fn from_exponent(alpha: f64) -> Self {
        match alpha {
            a if a.is_nan() => Self::Unknown,
            a if a > -0.5 => Self::White,
            a if a > -1.5 => Self::Flicker,
            _ => Self::RandomWalk,
        }
    }
}

/// Fits the spectral exponent over octave-wide frequency bands, DC excluded.
/// Each band contributes its mean density at the geometric-mean frequency,
/// weighted by the number of bins it spans.
pub fn classify(spectrum: &PowerSpectrum) -> NoiseClassification {
    let mut points = Vec::new();

    let bins = spectrum.power.len().min(spectrum.frequencies.len());
    let mut lo = 1;
    while lo < bins {
        let hi = (2 * lo).min(bins);
        let band = lo..hi;
        lo = hi;

        let frequencies = &spectrum.frequencies[band.clone()];
        let power = &spectrum.power[band];
        if frequencies.iter().any(|f| *f <= 0.0) {
            continue;
        }

        let width = power.len() as f64;
        let density = power.iter().sum::<f64>() / width;
        if !(density.is_finite() && density > 0.0) {
            continue;
        }
        let log_frequency = frequencies.iter().map(|f| f.ln()).sum::<f64>() / width;
        points.push((log_frequency, density.ln(), width));
    }

    if points.len() < 3 {
        return NoiseClassification::default();
    }

    let exponent = weighted_slope(&points);
    NoiseClassification {
        exponent,
        noise_type: NoiseType::from_exponent(exponent),
    }
}

/// Least-squares slope of `(x, y, weight)` points.
fn weighted_slope(points: &[(f64, f64, f64)]) -> f64 {
    let mut sum_w = 0.0;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    for &(x, y, w) in points {
        sum_w += w;
        sum_x += w * x;
        sum_y += w * y;
    }
    let mean_x = sum_x / sum_w;
    let mean_y = sum_y / sum_w;

    let mut sum_xx = 0.0;
    let mut sum_xy = 0.0;
    for &(x, y, w) in points {
        sum_xx += w * (x - mean_x) * (x - mean_x);
        sum_xy += w * (x - mean_x) * (y - mean_y);
    }

    if sum_xx == 0.0 {
        return f64::NAN;
    }
    sum_xy / sum_xx
}
