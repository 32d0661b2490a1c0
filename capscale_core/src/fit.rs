//! Model fitters: ridge-regularized normal equations for the polynomial
//! families, gradient descent for the exponential family.

use crate::error::FitError;
use crate::linalg;
use crate::model::{Curve, ModelFamily, transform};
use crate::sample::TrainingPoint;

/// Iteration cap for the exponential fitter.
pub const EXP_MAX_ITERATIONS: usize = 1200;
const EXP_INITIAL_RATE: f64 = 1e-3;
const EXP_RATE_GROWTH: f64 = 1.03;
const EXP_RATE_CAP: f64 = 1e-1;
const EXP_RATE_FLOOR: f64 = 1e-10;
/// Loss charged when a prediction is not finite.
const NON_FINITE_PENALTY: f64 = 1e30;

/// Fit `family` to `points`. Each point's feature is passed through
/// `transform(_, inverse)` first.
///
/// A curve with a non-finite coefficient (overflowing targets) is rejected
/// with `FitError::NonFiniteLoss`.
pub fn fit_curve(
    family: ModelFamily,
    points: &[TrainingPoint],
    inverse: bool,
    ridge_lambda: f64,
) -> Result<Curve, FitError> {
    let curve = match family {
        ModelFamily::Linear => {
            let [slope] = fit_ridge(family, points, inverse, ridge_lambda, |u| [u])?;
            Curve::Linear { slope }
        }
        ModelFamily::Quadratic => {
            let [a, b] = fit_ridge(family, points, inverse, ridge_lambda, |u| [u * u, u])?;
            Curve::Quadratic { a, b }
        }
        ModelFamily::Exponential => fit_exponential(points, inverse)?,
    };
    if curve.is_finite() {
        Ok(curve)
    } else {
        Err(FitError::NonFiniteLoss)
    }
}

/// Solve `(X^T X + lambda I) c = X^T y` for the design row produced by `row`.
#[allow(clippy::needless_range_loop)]
fn fit_ridge<const N: usize>(
    family: ModelFamily,
    points: &[TrainingPoint],
    inverse: bool,
    ridge_lambda: f64,
    row: impl Fn(f64) -> [f64; N],
) -> Result<[f64; N], FitError> {
    if points.len() < N {
        return Err(FitError::InsufficientSamples {
            family,
            needed: N,
            got: points.len(),
        });
    }

    let mut normal = [[0.0f64; N]; N];
    let mut rhs = [0.0f64; N];
    for p in points {
        let x = row(transform(p.feature, inverse));
        for i in 0..N {
            rhs[i] += x[i] * p.target;
            for j in 0..N {
                normal[i][j] += x[i] * x[j];
            }
        }
    }
    for (i, r) in normal.iter_mut().enumerate() {
        r[i] += ridge_lambda;
    }

    linalg::solve(normal, rhs).ok_or(FitError::SingularSystem)
}

fn exp_loss(params: [f64; 2], points: &[(f64, f64)]) -> f64 {
    let mut sse = 0.0;
    for &(u, y) in points {
        let y_hat = params[0] * (params[1] * u).exp();
        if !y_hat.is_finite() {
            return NON_FINITE_PENALTY;
        }
        let err = y_hat - y;
        sse += err * err;
    }
    sse / points.len() as f64
}

/// Central-difference gradient; falls back to a one-sided difference when
/// only one neighbour has a finite loss, and to 0 when neither does.
fn exp_gradient(params: [f64; 2], points: &[(f64, f64)]) -> [f64; 2] {
    let base = exp_loss(params, points);
    let mut grad = [0.0; 2];
    for (i, g) in grad.iter_mut().enumerate() {
        let step = params[i].abs() * 1e-4 + 1e-7;
        let mut plus = params;
        let mut minus = params;
        plus[i] += step;
        minus[i] -= step;
        let lp = exp_loss(plus, points);
        let lm = exp_loss(minus, points);
        *g = match (lp.is_finite(), lm.is_finite()) {
            (true, true) => (lp - lm) / (2.0 * step),
            (true, false) => (lp - base) / step,
            (false, true) => (base - lm) / step,
            (false, false) => 0.0,
        };
    }
    grad
}

/// Fit `scale * exp(rate * u)` by adaptive-step gradient descent on the MSE.
///
/// Starts from `[max(span_y, 1e-3), 1 / span_x]` (spans floored at `1e-6`).
/// A step is kept when its loss is finite and not worse than the best so far,
/// which also grows the rate by 3% up to 0.1; otherwise the rate halves and the
/// loop stops once it drops below `1e-10`. Deterministic for a given input.
pub fn fit_exponential(points: &[TrainingPoint], inverse: bool) -> Result<Curve, FitError> {
    let family = ModelFamily::Exponential;
    if points.len() < family.min_samples() {
        return Err(FitError::InsufficientSamples {
            family,
            needed: family.min_samples(),
            got: points.len(),
        });
    }

    let data: Vec<(f64, f64)> = points
        .iter()
        .map(|p| (transform(p.feature, inverse), p.target))
        .collect();

    let (mut min_x, mut max_x) = (data[0].0, data[0].0);
    let (mut min_y, mut max_y) = (data[0].1, data[0].1);
    for &(x, y) in &data {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let span_x = (max_x - min_x).max(1e-6);
    let span_y = (max_y - min_y).max(1e-6);

    let mut params = [span_y.max(1e-3), 1.0 / span_x];
    let mut best = params;
    let mut best_loss = exp_loss(best, &data);
    let mut rate = EXP_INITIAL_RATE;
    let mut iterations = 0;

    while iterations < EXP_MAX_ITERATIONS {
        iterations += 1;
        let grad = exp_gradient(params, &data);
        let candidate = [params[0] - rate * grad[0], params[1] - rate * grad[1]];
        let loss = exp_loss(candidate, &data);

        if loss.is_finite() && loss <= best_loss {
            params = candidate;
            best = candidate;
            best_loss = loss;
            rate = (rate * EXP_RATE_GROWTH).min(EXP_RATE_CAP);
        } else {
            rate *= 0.5;
            if rate < EXP_RATE_FLOOR {
                break;
            }
        }
    }

    tracing::trace!(iterations, best_loss, "exponential fit finished");

    // Only penalized steps seen: no parameter set produced finite predictions.
    if !best_loss.is_finite() || best_loss >= NON_FINITE_PENALTY {
        return Err(FitError::NonFiniteLoss);
    }
    Ok(Curve::Exponential {
        scale: best[0],
        rate: best[1],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(xy: &[(f64, f64)]) -> Vec<TrainingPoint> {
        xy.iter().map(|&(x, y)| TrainingPoint::new(x, y)).collect()
    }

    #[test]
    fn linear_recovers_slope() {
        let c = fit_curve(
            ModelFamily::Linear,
            &pts(&[(1.0, 3.0), (2.0, 6.0), (4.0, 12.0)]),
            false,
            0.0,
        )
        .unwrap();
        match c {
            Curve::Linear { slope } => assert!((slope - 3.0).abs() < 1e-12),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn quadratic_recovers_coefficients() {
        let data: Vec<(f64, f64)> = (1..=5)
            .map(|i| {
                let x = i as f64;
                (x, 0.5 * x * x - 2.0 * x)
            })
            .collect();
        let c = fit_curve(ModelFamily::Quadratic, &pts(&data), false, 0.0).unwrap();
        let coeffs = c.coefficients();
        assert!((coeffs[0] - 0.5).abs() < 1e-9);
        assert!((coeffs[1] + 2.0).abs() < 1e-9);
    }

    #[test]
    fn too_few_points_is_insufficient() {
        let err = fit_curve(ModelFamily::Quadratic, &pts(&[(1.0, 1.0)]), false, 0.0).unwrap_err();
        assert_eq!(
            err,
            FitError::InsufficientSamples {
                family: ModelFamily::Quadratic,
                needed: 2,
                got: 1
            }
        );
        let err = fit_curve(ModelFamily::Linear, &[], false, 0.0).unwrap_err();
        assert!(matches!(err, FitError::InsufficientSamples { needed: 1, got: 0, .. }));
    }

    #[test]
    fn exponential_needs_three_points() {
        let err = fit_exponential(&pts(&[(0.0, 1.0), (1.0, 2.0)]), false).unwrap_err();
        assert!(matches!(err, FitError::InsufficientSamples { needed: 3, got: 2, .. }));
    }

    #[test]
    fn exponential_loss_penalises_overflow() {
        assert_eq!(exp_loss([1.0, 1000.0], &[(10.0, 0.0)]), NON_FINITE_PENALTY);
    }

    #[test]
    fn exponential_improves_on_its_starting_point() {
        let data: Vec<(f64, f64)> = (0..5)
            .map(|i| {
                let x = i as f64;
                (x, 3.0 * (0.5 * x).exp())
            })
            .collect();
        let points = pts(&data);
        let start = exp_loss([data[4].1 - data[0].1, 0.25], &data);
        let c = fit_exponential(&points, false).unwrap();
        let coeffs = c.coefficients();
        assert!(exp_loss([coeffs[0], coeffs[1]], &data) <= start);
    }
}
