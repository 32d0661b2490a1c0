//! Dense linear solve for the (tiny) ridge normal equations.

/// Smallest pivot magnitude accepted before the system is declared singular.
pub const PIVOT_EPSILON: f64 = 1e-12;

/// Solve `a * x = b` by Gauss-Jordan elimination with partial (row) pivoting.
///
/// At each column the row with the largest absolute entry is swapped into place.
/// Returns `None` when that pivot is below `PIVOT_EPSILON`.
#[allow(clippy::needless_range_loop)]
pub fn solve<const N: usize>(mut a: [[f64; N]; N], mut b: [f64; N]) -> Option<[f64; N]> {
    for i in 0..N {
        let mut pivot = i;
        let mut pivot_abs = a[i][i].abs();
        for r in (i + 1)..N {
            let v = a[r][i].abs();
            if v > pivot_abs {
                pivot_abs = v;
                pivot = r;
            }
        }

        if pivot_abs.is_nan() || pivot_abs < PIVOT_EPSILON {
            return None;
        }

        if pivot != i {
            a.swap(i, pivot);
            b.swap(i, pivot);
        }

        let diag = a[i][i];
        for c in i..N {
            a[i][c] /= diag;
        }
        b[i] /= diag;

        for r in 0..N {
            if r == i {
                continue;
            }
            let factor = a[r][i];
            for c in i..N {
                a[r][c] -= factor * a[i][c];
            }
            b[r] -= factor * b[i];
        }
    }
    Some(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_two_by_two() {
        // 2x + y = 5, x + 3y = 10 -> x = 1, y = 3
        let x = solve([[2.0, 1.0], [1.0, 3.0]], [5.0, 10.0]).unwrap();
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert!((x[1] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn pivots_past_a_zero_diagonal() {
        let x = solve([[0.0, 1.0], [1.0, 0.0]], [2.0, 3.0]).unwrap();
        assert_eq!(x, [3.0, 2.0]);
    }

    #[test]
    fn singular_system_is_none() {
        assert!(solve([[1.0, 2.0], [2.0, 4.0]], [1.0, 2.0]).is_none());
        assert!(solve([[0.0]], [1.0]).is_none());
        assert!(solve([[1e-13]], [1.0]).is_none());
    }

    #[test]
    fn nan_pivot_is_none() {
        assert!(solve([[f64::NAN]], [1.0]).is_none());
    }

    #[test]
    fn three_by_three() {
        let a = [[3.0, 2.0, -1.0], [2.0, -2.0, 4.0], [-1.0, 0.5, -1.0]];
        let x = solve(a, [1.0, -2.0, 0.0]).unwrap();
        let expected = [1.0, -2.0, -2.0];
        for (got, want) in x.iter().zip(expected) {
            assert!((got - want).abs() < 1e-10);
        }
    }
}
