use rustfft::{num_complex::Complex, FftPlanner};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One-sided power spectral density.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerSpectrum {
    /// Bin frequencies in Hz, starting at DC.
    pub frequencies: Vec<f64>,
    /// Density in units²/Hz.
    pub power: Vec<f64>,
}

impl PowerSpectrum {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    /// Mean density excluding the DC bin.
    pub fn noise_floor(&self) -> Option<f64> {
        let power = self.power.get(1..)?;
        if power.is_empty() {
            return None;
        }
        Some(power.iter().sum::<f64>() / power.len() as f64)
    }
}

/// Welch estimate with a single segment spanning the series: periodic Hann
/// window, mean removed, density scaling.
pub fn welch(series: &[f64], sampling_rate: f64) -> PowerSpectrum {
    let n = series.len();
    if n < 4 || !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return PowerSpectrum::default();
    }

    let mean = series.iter().sum::<f64>() / n as f64;
    let window: Vec<f64> = (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n as f64).cos())
        .collect();
    let scale = 1.0 / (sampling_rate * window.iter().map(|w| w * w).sum::<f64>());

    let mut buffer: Vec<Complex<f64>> = series
        .iter()
        .zip(&window)
        .map(|(v, w)| Complex::new((v - mean) * w, 0.0))
        .collect();

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let bins = n / 2 + 1;
    let resolution = sampling_rate / n as f64;
    let mut spectrum = PowerSpectrum {
        frequencies: Vec::with_capacity(bins),
        power: Vec::with_capacity(bins),
    };

    for (k, v) in buffer.iter().take(bins).enumerate() {
        let mut power = v.norm_sqr() * scale;
        // fold negative frequencies, DC and Nyquist have no mirror
        let nyquist = n % 2 == 0 && k == n / 2;
        if k != 0 && !nyquist {
            power *= 2.0;
        }
        spectrum.frequencies.push(k as f64 * resolution);
        spectrum.power.push(power);
    }

    spectrum
}

/// White frequency noise reference for the Allan plot, `sqrt(h0 / 2 tau)`.
pub fn white_reference(h0: f64, taus: &[f64]) -> Vec<f64> {
    taus.iter().map(|tau| (h0 / (2.0 * tau)).sqrt()).collect()
}
