//! Goodness-of-fit statistics and probability histograms.

use serde::{Deserialize, Serialize};

/// Number of histogram buckets over [0, 1].
pub const HISTOGRAM_BINS: usize = 20;

/// An `(actual, predicted)` turnout pair for one scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationPoint {
    pub scenario: String,
    pub actual: f64,
    pub predicted: f64,
}

impl CalibrationPoint {
    pub fn residual(&self) -> f64 {
        self.predicted - self.actual
    }
}

/// Root-mean-square error over the points. Zero for an empty slice.
pub fn rmse(points: &[CalibrationPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let sse: f64 = points.iter().map(|p| p.residual().powi(2)).sum();
    (sse / points.len() as f64).sqrt()
}

/// Mean absolute error over the points. Zero for an empty slice.
pub fn mae(points: &[CalibrationPoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.residual().abs()).sum::<f64>() / points.len() as f64
}

/// Residual RMSE below which a fit against constant targets counts as exact.
pub const EXACT_FIT_RMSE: f64 = 1e-9;

/// Coefficient of determination against the mean-target baseline.
///
/// When every target is identical the baseline explains nothing and R² is 0,
/// except for an exact fit, which scores 1.
pub fn r_squared(points: &[CalibrationPoint]) -> f64 {
    r_squared_with_tolerance(points, EXACT_FIT_RMSE)
}

/// R² with a noise floor for constant targets.
///
/// With target variance the usual `1 − SS_res/SS_tot` is returned. When every
/// target is identical there is no variance to explain, so the fit is scored
/// against `tolerance` instead: `max(0, 1 − (rmse / tolerance)²)`. A residual
/// at the tolerance scores 0 and an exact fit scores 1.
pub fn r_squared_with_tolerance(points: &[CalibrationPoint], tolerance: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let n = points.len() as f64;
    let mean = points.iter().map(|p| p.actual).sum::<f64>() / n;
    let ss_tot: f64 = points.iter().map(|p| (p.actual - mean).powi(2)).sum();
    let ss_res: f64 = points.iter().map(|p| p.residual().powi(2)).sum();

    if ss_tot <= f64::EPSILON {
        let error = rmse(points);
        if error == 0.0 {
            return 1.0;
        }
        let tolerance = tolerance.max(EXACT_FIT_RMSE);
        return (1.0 - (error / tolerance).powi(2)).max(0.0);
    }
    1.0 - ss_res / ss_tot
}

/// Standard error of a turnout share estimated from `n` Bernoulli votes.
pub fn turnout_standard_error(turnout: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = turnout.clamp(0.0, 1.0);
    (p * (1.0 - p) / n as f64).sqrt()
}

/// Mean and population variance.
pub fn mean_and_variance(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, var)
}

/// Fixed-width histogram of probabilities over [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityHistogram {
    pub bin_width: f64,
    pub counts: Vec<usize>,
    /// Share of the population in each bin
    pub density: Vec<f64>,
}

impl ProbabilityHistogram {
    pub fn from_probabilities(probabilities: impl IntoIterator<Item = f64>, bins: usize) -> Self {
        let bins = bins.max(1);
        let mut counts = vec![0usize; bins];
        let mut total = 0usize;

        for p in probabilities {
            let idx = ((p.clamp(0.0, 1.0) * bins as f64) as usize).min(bins - 1);
            counts[idx] += 1;
            total += 1;
        }

        let density = counts
            .iter()
            .map(|&c| if total == 0 { 0.0 } else { c as f64 / total as f64 })
            .collect();

        Self { bin_width: 1.0 / bins as f64, counts, density }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(actual: f64, predicted: f64) -> CalibrationPoint {
        CalibrationPoint { scenario: "s".to_string(), actual, predicted }
    }

    #[test]
    fn test_error_metrics() {
        let points = vec![point(0.5, 0.6), point(0.7, 0.6)];
        assert_relative_eq!(rmse(&points), 0.1, epsilon = 1e-12);
        assert_relative_eq!(mae(&points), 0.1, epsilon = 1e-12);
    }

    #[test]
    fn test_r_squared_perfect_and_baseline() {
        let perfect = vec![point(0.4, 0.4), point(0.6, 0.6), point(0.8, 0.8)];
        assert_relative_eq!(r_squared(&perfect), 1.0, epsilon = 1e-12);

        // Predicting the mean everywhere explains nothing
        let mean_only = vec![point(0.4, 0.6), point(0.6, 0.6), point(0.8, 0.6)];
        assert_relative_eq!(r_squared(&mean_only), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_r_squared_zero_target_variance() {
        assert_eq!(r_squared(&[point(0.6, 0.65)]), 0.0);
        assert_eq!(r_squared(&[point(0.6, 0.6), point(0.6, 0.6)]), 1.0);
    }

    #[test]
    fn test_r_squared_tolerance_degrades_smoothly() {
        let tol = 0.04;
        assert_eq!(r_squared_with_tolerance(&[point(0.6, 0.6)], tol), 1.0);
        assert_relative_eq!(r_squared_with_tolerance(&[point(0.6, 0.62)], tol), 0.75, epsilon = 1e-9);
        assert_relative_eq!(r_squared_with_tolerance(&[point(0.6, 0.58)], tol), 0.75, epsilon = 1e-9);
        assert_eq!(r_squared_with_tolerance(&[point(0.6, 0.65)], tol), 0.0);

        // Tolerance is ignored once the targets vary
        let varied = vec![point(0.4, 0.4), point(0.6, 0.6)];
        assert_eq!(r_squared_with_tolerance(&varied, tol), r_squared(&varied));
    }

    #[test]
    fn test_turnout_standard_error() {
        assert_relative_eq!(turnout_standard_error(0.5, 100), 0.05, epsilon = 1e-12);
        assert_eq!(turnout_standard_error(1.0, 100), 0.0);
        assert_eq!(turnout_standard_error(0.5, 0), 0.0);
    }

    #[test]
    fn test_histogram_bins() {
        let hist = ProbabilityHistogram::from_probabilities(vec![0.0, 0.04, 0.51, 1.0, 1.0], 10);
        assert_eq!(hist.counts.len(), 10);
        assert_eq!(hist.counts[0], 2);
        assert_eq!(hist.counts[5], 1);
        assert_eq!(hist.counts[9], 2);
        assert_eq!(hist.total(), 5);
        assert_relative_eq!(hist.density.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mean_and_variance() {
        let (m, v) = mean_and_variance(&[1.0, 2.0, 3.0]);
        assert_relative_eq!(m, 2.0);
        assert_relative_eq!(v, 2.0 / 3.0, epsilon = 1e-12);
    }
}
