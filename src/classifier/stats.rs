//! Small statistics helpers used by the adaptive classifier.

use std::f64::consts::PI;

/// Median of the values; 0.0 for an empty slice.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Median absolute deviation around `center`.
pub fn median_absolute_deviation(values: &[f64], center: f64) -> f64 {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Mean weighted towards the newest values.
///
/// Weights are `e^t` for `t` evenly spaced over `[0, 1]` from oldest to
/// newest, normalized to sum to one.
pub fn recency_weighted_mean<'a>(values: impl ExactSizeIterator<Item = &'a f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    let step = if n > 1 { 1.0 / (n - 1) as f64 } else { 0.0 };
    let mut weighted = 0.0;
    let mut total = 0.0;
    for (i, value) in values.enumerate() {
        let weight = (i as f64 * step).exp();
        weighted += weight * value;
        total += weight;
    }
    weighted / total
}

/// Gaussian density with a fixed mean and spread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normal {
    pub mean: f64,
    pub std_dev: f64,
}

impl Normal {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    /// Probability density at `x`. Zero when the spread is not positive.
    pub fn pdf(&self, x: f64) -> f64 {
        if self.std_dev <= 0.0 || !self.std_dev.is_finite() {
            return 0.0;
        }
        let z = (x - self.mean) / self.std_dev;
        (-0.5 * z * z).exp() / (self.std_dev * (2.0 * PI).sqrt())
    }
}
