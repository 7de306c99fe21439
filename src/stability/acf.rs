use crate::stats::{mean, sample_std_dev};
use serde::{Deserialize, Serialize};

/// Two-sided 95% quantile of the normal distribution.
const Z_95: f64 = 1.96;

/// Sample autocorrelation with a Bartlett 95% confidence band.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Autocorrelation {
    pub lags: Vec<usize>,
    pub acf: Vec<f64>,
    pub upper: Vec<f64>,
    pub lower: Vec<f64>,
    /// Last lag whose coefficient lies outside the band, 0 when none does.
    pub cutoff_lag: usize,
}

impl Autocorrelation {
    pub fn is_empty(&self) -> bool {
        self.lags.is_empty()
    }
}

/// Biased autocorrelation estimate for lags `0..=N/4`.
pub fn autocorrelation(series: &[f64]) -> Autocorrelation {
    let n = series.len();
    if n < 4 {
        return Autocorrelation::default();
    }

    let m = mean(series);
    let centered: Vec<f64> = series.iter().map(|v| v - m).collect();
    let denominator: f64 = centered.iter().map(|d| d * d).sum();
    if !(denominator.is_finite() && denominator > 0.0) {
        return Autocorrelation::default();
    }

    let max_lag = n / 4;
    let mut result = Autocorrelation {
        lags: Vec::with_capacity(max_lag + 1),
        acf: Vec::with_capacity(max_lag + 1),
        upper: Vec::with_capacity(max_lag + 1),
        lower: Vec::with_capacity(max_lag + 1),
        cutoff_lag: 0,
    };

    let mut squares = 0.0;
    for lag in 0..=max_lag {
        let numerator: f64 = centered
            .iter()
            .zip(&centered[lag..])
            .map(|(a, b)| a * b)
            .sum();
        let r = numerator / denominator;

        if lag > 0 {
            squares += r * r;
        }
        let band = Z_95 * ((1.0 + 2.0 * squares) / n as f64).sqrt();
        if lag > 0 && r.abs() > band {
            result.cutoff_lag = lag;
        }

        result.lags.push(lag);
        result.acf.push(r);
        result.upper.push(band);
        result.lower.push(-band);
    }

    result
}

/// Variance of the mean, `s^2 / N`.
pub fn variance_of_mean(series: &[f64]) -> f64 {
    let sd = sample_std_dev(series);
    sd * sd / series.len() as f64
}

/// Variance of the mean inflated by the correlated lags up to the cutoff.
/// The inflation factor never drops below one.
pub fn autocorrelation_variance(series: &[f64], acf: &Autocorrelation) -> f64 {
    let correlated: f64 = acf
        .acf
        .iter()
        .skip(1)
        .take(acf.cutoff_lag)
        .sum();
    let factor = (1.0 + 2.0 * correlated).max(1.0);
    variance_of_mean(series) * factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn ramp_matches_hand_computation() {
        let series: Vec<f64> = (1..=8).map(f64::from).collect();
        let acf = autocorrelation(&series);
        assert_eq!(acf.lags, vec![0, 1, 2]);
        assert_eq!(acf.acf[0], 1.0);
        assert!((acf.acf[1] - 26.25 / 42.0).abs() < 1e-12);
        assert!((acf.upper[0] - 1.96 / 8.0_f64.sqrt()).abs() < 1e-12);
        assert!(acf.lower.iter().zip(&acf.upper).all(|(l, u)| *l == -*u));
    }

    #[test]
    fn band_widens_with_lag() {
        let series: Vec<f64> = (0..40).map(|i| ((i * 7) % 11) as f64).collect();
        let acf = autocorrelation(&series);
        assert!(acf.upper.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn degenerate_input_is_empty() {
        assert!(autocorrelation(&[1.0, 2.0, 3.0]).is_empty());
        assert!(autocorrelation(&[5.0; 32]).is_empty());
    }

    #[test]
    fn random_walk_is_correlated() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut level = 0.0;
        let series: Vec<f64> = (0..512)
            .map(|_| {
                level += rng.gen::<f64>() - 0.5;
                level
            })
            .collect();
        let acf = autocorrelation(&series);
        assert!(acf.cutoff_lag > 0);
        assert!(acf.acf[1] > 0.5);
        assert!(autocorrelation_variance(&series, &acf) > variance_of_mean(&series));
    }

    #[test]
    fn inflation_factor_is_clamped() {
        let series = [1.0, -1.0, 1.0, -1.0, 1.0, -1.0, 1.0, -1.0];
        let acf = Autocorrelation {
            lags: vec![0, 1],
            acf: vec![1.0, -0.9],
            upper: vec![0.0, 0.0],
            lower: vec![0.0, 0.0],
            cutoff_lag: 1,
        };
        assert_eq!(
            autocorrelation_variance(&series, &acf),
            variance_of_mean(&series)
        );

        let positive = Autocorrelation {
            acf: vec![1.0, 0.5],
            ..acf
        };
        assert!(
            (autocorrelation_variance(&series, &positive) - 2.0 * variance_of_mean(&series)).abs()
                < 1e-12
        );
    }
}
