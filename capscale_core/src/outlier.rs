//! Residual-based outlier trimming.

use crate::model::Curve;
use crate::sample::TrainingPoint;

/// Below this residual spread the data is treated as too uniform to trim.
pub const MIN_RESIDUAL_STD: f64 = 1e-12;

/// Keep the points whose residual lies within `sigma` population standard
/// deviations of the mean residual. Returns every point unchanged when the
/// spread is below `MIN_RESIDUAL_STD` or there is nothing to filter.
pub fn filter_outliers(
    curve: &Curve,
    points: &[TrainingPoint],
    sigma: f64,
    inverse: bool,
) -> Vec<TrainingPoint> {
    if points.is_empty() {
        return Vec::new();
    }
    let residuals: Vec<f64> = points
        .iter()
        .map(|p| curve.predict(p.feature, inverse) - p.target)
        .collect();
    let n = residuals.len() as f64;
    let mean = residuals.iter().sum::<f64>() / n;
    let variance = residuals.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt();
    if std < MIN_RESIDUAL_STD {
        return points.to_vec();
    }

    let threshold = sigma * std;
    points
        .iter()
        .zip(&residuals)
        .filter(|(_, r)| (*r - mean).abs() <= threshold)
        .map(|(p, _)| *p)
        .collect()
}
