use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceType {
    #[default]
    Allan,
    Hadamard,
}

impl VarianceType {
    /// Number of averaging intervals spanned by one difference term.
    fn span(self) -> usize {
        match self {
            Self::Allan => 2,
            Self::Hadamard => 3,
        }
    }

    fn normalization(self) -> f64 {
        match self {
            Self::Allan => 2.0,
            Self::Hadamard => 6.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TauSet {
    /// Every integer averaging factor up to N/2.
    #[default]
    All,
    /// Powers of two.
    Octave,
}

/// Allan or Hadamard deviation of a series over a set of averaging times.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AllanDeviation {
    /// Averaging times in seconds.
    pub taus: Vec<f64>,
    pub deviations: Vec<f64>,
    pub errors: Vec<f64>,
}

impl AllanDeviation {
    pub fn len(&self) -> usize {
        self.taus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taus.is_empty()
    }
}

/// Averaging factors, in samples, for a series of `len` values.
///
/// The octave set holds `floor(log2(len / 2))` points: 1, 2, 4, ...
pub fn tau_grid(len: usize, set: TauSet) -> Vec<usize> {
    let half = len / 2;
    match set {
        TauSet::All => (1..=half).collect(),
        TauSet::Octave => {
            if half == 0 {
                return vec![];
            }
            (0..half.ilog2()).map(|i| 1usize << i).collect()
        }
    }
}

/// Computes the deviation at every averaging factor of `taus` that leaves at
/// least two difference terms. Points that cannot be estimated are skipped.
pub fn analyze_allan(
    series: &[f64],
    sampling_rate: f64,
    variance: VarianceType,
    overlapping: bool,
    taus: TauSet,
) -> AllanDeviation {
    let mut result = AllanDeviation::default();
    if !(sampling_rate.is_finite() && sampling_rate > 0.0) {
        return result;
    }

    // phase representation for the overlapping estimator
    let phase: Vec<f64> = if overlapping {
        std::iter::once(0.0)
            .chain(series.iter().scan(0.0, |sum, v| {
                *sum += v;
                Some(*sum)
            }))
            .collect()
    } else {
        Vec::new()
    };

    for m in tau_grid(series.len(), taus) {
        let estimate = if overlapping {
            overlapping_variance(&phase, m, variance)
        } else {
            block_variance(series, m, variance)
        };

        let Some((var, terms)) = estimate else {
            continue;
        };
        if !var.is_finite() || var < 0.0 {
            continue;
        }

        let var_error = var * (2.0 / terms as f64).sqrt();
        let deviation = var.sqrt();
        let error = if var > 0.0 {
            0.5 / deviation * var_error
        } else {
            0.0
        };

        result.taus.push(m as f64 / sampling_rate);
        result.deviations.push(deviation);
        result.errors.push(error);
    }

    result
}

/// Non-overlapping estimator over block means of length `m`. Returns the
/// variance and the number of difference terms it was built from.
fn block_variance(series: &[f64], m: usize, variance: VarianceType) -> Option<(f64, usize)> {
    if m == 0 {
        return None;
    }

    let means: Vec<f64> = series
        .chunks_exact(m)
        .map(|block| block.iter().sum::<f64>() / m as f64)
        .collect();

    let terms = (means.len() + 1).checked_sub(variance.span())?;
    if terms < 2 {
        return None;
    }

    let sum: f64 = match variance {
        VarianceType::Allan => means.windows(2).map(|w| (w[1] - w[0]).powi(2)).sum(),
        VarianceType::Hadamard => means
            .windows(3)
            .map(|w| (w[2] - 2.0 * w[1] + w[0]).powi(2))
            .sum(),
    };

    Some((sum / (variance.normalization() * terms as f64), terms))
}

/// Overlapping estimator with stride 1 over the cumulative sum.
fn overlapping_variance(phase: &[f64], m: usize, variance: VarianceType) -> Option<(f64, usize)> {
    if m == 0 || phase.is_empty() {
        return None;
    }

    let terms = phase.len().checked_sub(variance.span() * m)?;
    if terms < 2 {
        return None;
    }

    let sum: f64 = (0..terms)
        .map(|k| match variance {
            VarianceType::Allan => phase[k + 2 * m] - 2.0 * phase[k + m] + phase[k],
            VarianceType::Hadamard => {
                phase[k + 3 * m] - 3.0 * phase[k + 2 * m] + 3.0 * phase[k + m] - phase[k]
            }
        })
        .map(|d| d * d)
        .sum();

    let m = m as f64;
    Some((sum / (variance.normalization() * m * m * terms as f64), terms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn white_noise(seed: u64, len: usize) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen::<f64>() - 0.5).collect()
    }

    #[test]
    fn octave_grid() {
        for len in [3, 4, 10, 64, 1000, 1024, 4097] {
            let grid = tau_grid(len, TauSet::Octave);
            let expected = ((len / 2) as f64).log2().floor() as usize;
            assert_eq!(grid.len(), expected, "len {len}");
            assert!(grid.iter().all(|t| t.is_power_of_two()));
            assert!(grid.windows(2).all(|w| w[1] == 2 * w[0]));
        }
        assert!(tau_grid(1, TauSet::Octave).is_empty());
    }

    #[test]
    fn all_grid() {
        assert_eq!(tau_grid(9, TauSet::All), vec![1, 2, 3, 4]);
        assert!(tau_grid(1, TauSet::All).is_empty());
    }

    #[test]
    fn overlapping_matches_hand_computation() {
        // phase [0, 1, 3, 6, 10]: three second differences of 1 each
        let series = [1.0, 2.0, 3.0, 4.0];
        let phase = [0.0, 1.0, 3.0, 6.0, 10.0];
        assert_eq!(
            overlapping_variance(&phase, 1, VarianceType::Allan),
            Some((0.5, 3))
        );
        assert_eq!(
            block_variance(&series, 1, VarianceType::Allan),
            Some((0.5, 3))
        );
    }

    #[test]
    fn hadamard_matches_hand_computation() {
        // cubic frequency: second differences 6, 12, 18, 24
        let series: Vec<f64> = (0..8).map(|k| (k * k * k) as f64).collect();
        assert_eq!(
            block_variance(&series[..6], 1, VarianceType::Hadamard),
            Some((1080.0 / 24.0, 4))
        );
        // block means [0.5, 17.5, 94.5, 279.5]: second differences 60, 108
        assert_eq!(
            block_variance(&series, 2, VarianceType::Hadamard),
            Some((15264.0 / 12.0, 2))
        );

        let phase = [0.0, 0.0, 1.0, 9.0, 36.0, 100.0, 225.0, 441.0, 784.0];
        assert_eq!(
            overlapping_variance(&phase[..7], 1, VarianceType::Hadamard),
            Some((45.0, 4))
        );
        // third differences at m = 2: 120, 168, 216
        assert_eq!(
            overlapping_variance(&phase, 2, VarianceType::Hadamard),
            Some((89280.0 / 72.0, 3))
        );

        let result = analyze_allan(&series, 1.0, VarianceType::Hadamard, true, TauSet::All);
        assert_eq!(result.taus, vec![1.0, 2.0]);
        // six second differences 6..=36 at tau 1
        assert_eq!(result.deviations, vec![91.0_f64.sqrt(), 1240.0_f64.sqrt()]);
    }

    #[test]
    fn non_overlapping_needs_two_differences() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        // m = 2: three blocks, two differences
        assert!(block_variance(&series, 2, VarianceType::Allan).is_some());
        // m = 3: two blocks, one difference
        assert!(block_variance(&series, 3, VarianceType::Allan).is_none());
        // Hadamard at m = 2: three blocks, one third difference
        assert!(block_variance(&series, 2, VarianceType::Hadamard).is_none());
        assert_eq!(
            block_variance(&series, 1, VarianceType::Hadamard),
            Some((0.0, 4))
        );
    }

    #[test]
    fn hadamard_rejects_overruns() {
        let series: Vec<f64> = white_noise(3, 30);
        let result = analyze_allan(&series, 1.0, VarianceType::Hadamard, true, TauSet::All);
        assert!(!result.is_empty());
        assert!(result.taus.iter().all(|&t| 3.0 * t <= 30.0 - 1.0));
    }

    #[test]
    fn constant_series_has_zero_deviation() {
        let series = vec![2.5; 64];
        for overlapping in [false, true] {
            for variance in [VarianceType::Allan, VarianceType::Hadamard] {
                let result = analyze_allan(&series, 1.0, variance, overlapping, TauSet::Octave);
                assert!(!result.is_empty());
                assert!(result.deviations.iter().all(|&d| d == 0.0));
                assert!(result.errors.iter().all(|&e| e == 0.0));
            }
        }
    }

    #[test]
    fn taus_scale_with_sampling_rate() {
        let series = white_noise(5, 64);
        let result = analyze_allan(&series, 0.5, VarianceType::Allan, false, TauSet::Octave);
        assert_eq!(result.taus[..3], [2.0, 4.0, 8.0]);
    }

    #[test]
    fn short_or_degenerate_input_is_empty() {
        assert!(analyze_allan(&[], 1.0, VarianceType::Allan, false, TauSet::All).is_empty());
        assert!(analyze_allan(&[1.0, 2.0], 1.0, VarianceType::Allan, true, TauSet::All).is_empty());
        let series = white_noise(1, 32);
        assert!(analyze_allan(&series, 0.0, VarianceType::Allan, false, TauSet::All).is_empty());
    }

    #[test]
    fn white_noise_deviation_decreases_with_tau() {
        let series = white_noise(23, 16384);
        let result = analyze_allan(&series, 1.0, VarianceType::Allan, false, TauSet::All);

        // octave points up to N/256, each backed by at least 255 differences
        let deviations: Vec<f64> = (0..=6)
            .map(|i| {
                let tau = (1 << i) as f64;
                let i = result.taus.iter().position(|&t| t == tau).unwrap();
                result.deviations[i]
            })
            .collect();
        assert!(
            deviations.windows(2).all(|w| w[1] < w[0]),
            "{deviations:?}"
        );
    }

    #[test]
    fn mean_white_noise_deviation_decreases_up_to_quarter_length() {
        // a single realization leaves only three differences at N/4, so the
        // ordering is checked on the variance averaged over many seeds
        let len = 1024;
        let seeds = 32;
        let mut sum = vec![0.0; len / 2];
        let mut taus = Vec::new();

        for seed in 0..seeds {
            let result = analyze_allan(
                &white_noise(seed, len),
                1.0,
                VarianceType::Allan,
                false,
                TauSet::All,
            );
            taus = result.taus.clone();
            for (i, d) in result.deviations.iter().enumerate() {
                sum[i] += d * d;
            }
        }

        // octave points up to N/4
        let mut previous = f64::INFINITY;
        let mut tau = 1.0;
        while tau <= (len / 4) as f64 {
            let i = taus.iter().position(|&t| t == tau).unwrap();
            let adev = (sum[i] / seeds as f64).sqrt();
            assert!(adev < previous, "tau {tau}: {adev} >= {previous}");
            previous = adev;
            tau *= 2.0;
        }
    }

    #[test]
    fn white_noise_follows_inverse_sqrt_tau() {
        let series = white_noise(11, 8192);
        let sigma = (1.0_f64 / 12.0).sqrt();
        let result = analyze_allan(&series, 1.0, VarianceType::Allan, true, TauSet::Octave);
        // tau = 1 and tau = 16 are well determined
        assert!((result.deviations[0] / sigma - 1.0).abs() < 0.05);
        assert!((result.deviations[4] / (sigma / 4.0) - 1.0).abs() < 0.15);
        assert!(result.errors[0] < result.deviations[0] * 0.05);
    }
}
