use serde::{Deserialize, Serialize};

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation with n-1 normalization. NaN for fewer than two
/// values.
pub(crate) fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }

    let mean = mean(values);
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

pub(crate) fn finite_or_nan(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        f64::NAN
    }
}

/// Mean, spread and standard error of a series, computed over its finite
/// values only.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub mean: f64,
    pub std_dev: f64,
    pub std_err: f64,
    /// Number of finite values aggregated.
    pub count: usize,
    /// Number of non-finite values left out.
    pub excluded: usize,
}

impl AggregateStats {
    pub fn of(values: impl IntoIterator<Item = f64>) -> Self {
        let mut finite = Vec::new();
        let mut excluded = 0;
        for v in values {
            if v.is_finite() {
                finite.push(v);
            } else {
                excluded += 1;
            }
        }

        let count = finite.len();
        let mean = if count == 0 { f64::NAN } else { mean(&finite) };
        let (std_dev, std_err) = if count < 2 {
            (0.0, 0.0)
        } else {
            let sd = sample_std_dev(&finite);
            (sd, sd / (count as f64).sqrt())
        };

        Self {
            mean,
            std_dev,
            std_err,
            count,
            excluded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_over_finite_subset() {
        let stats = AggregateStats::of([1.0, 2.0, f64::NAN, 3.0, f64::INFINITY]);
        assert_eq!(stats.count, 3);
        assert_eq!(stats.excluded, 2);
        assert_eq!(stats.mean, 2.0);
        assert_eq!(stats.std_dev, 1.0);
        assert!((stats.std_err - 1.0 / 3.0_f64.sqrt()).abs() < 1e-15);
    }

    #[test]
    fn aggregate_single_value() {
        let stats = AggregateStats::of([4.0]);
        assert_eq!(stats.mean, 4.0);
        assert_eq!(stats.std_dev, 0.0);
        assert_eq!(stats.std_err, 0.0);
    }

    #[test]
    fn aggregate_empty() {
        let stats = AggregateStats::of(std::iter::empty());
        assert!(stats.mean.is_nan());
        assert_eq!(stats.count, 0);
    }

    #[test]
    fn std_dev_needs_two_values() {
        assert!(sample_std_dev(&[1.0]).is_nan());
        assert_eq!(sample_std_dev(&[1.0, 3.0]), 2.0_f64.sqrt());
    }
}
