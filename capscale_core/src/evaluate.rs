//! Fit-quality metrics.

use crate::model::Curve;
use crate::sample::TrainingPoint;

/// Threshold under which `tss` and `mse` count as zero for R^2.
const R2_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitMetrics {
    pub mae: f64,
    pub mse: f64,
    pub rmse: f64,
    pub max_abs_error: f64,
    pub r2: f64,
}

/// Score `curve` against `points` (residual = predicted - target).
///
/// With a degenerate target set (`tss <= 1e-12`) R^2 is 1 for a perfect fit
/// and 0 otherwise. An empty set scores NaN errors.
pub fn evaluate(curve: &Curve, points: &[TrainingPoint], inverse: bool) -> FitMetrics {
    let n = points.len() as f64;
    let y_mean = if points.is_empty() {
        0.0
    } else {
        points.iter().map(|p| p.target).sum::<f64>() / n
    };

    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut max_abs_error = 0.0f64;
    let mut tss = 0.0;
    for p in points {
        let err = curve.predict(p.feature, inverse) - p.target;
        abs_sum += err.abs();
        sq_sum += err * err;
        max_abs_error = max_abs_error.max(err.abs());
        tss += (p.target - y_mean).powi(2);
    }

    let mae = abs_sum / n;
    let mse = sq_sum / n;
    let r2 = if tss > R2_EPSILON {
        1.0 - mse / tss
    } else if mse <= R2_EPSILON {
        1.0
    } else {
        0.0
    };

    FitMetrics {
        mae,
        mse,
        rmse: mse.sqrt(),
        max_abs_error,
        r2,
    }
}
