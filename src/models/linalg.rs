//! Small dense solvers for model readouts

use ndarray::{Array1, Array2};

/// Smallest pivot accepted before a system is treated as singular
const PIVOT_EPS: f64 = 1e-12;

/// Penalised least squares: minimise `|Xw - y|^2 + sum_j penalty_j * w_j^2`.
///
/// Solves the normal equations `(X^T X + diag(penalty)) w = X^T y`.
/// Returns `None` when the system is singular.
pub fn ridge_fit(x: &Array2<f64>, y: &Array1<f64>, penalty: &Array1<f64>) -> Option<Array1<f64>> {
    if x.nrows() != y.len() || x.ncols() != penalty.len() {
        return None;
    }

    let mut a = x.t().dot(x);
    for (j, &p) in penalty.iter().enumerate() {
        a[[j, j]] += p;
    }
    let b = x.t().dot(y);

    solve(a, b)
}

/// Gaussian elimination with partial pivoting
pub fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if a.ncols() != n || b.len() != n {
        return None;
    }

    for col in 0..n {
        let pivot_row = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot_row, col]].abs() < PIVOT_EPS {
            return None;
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap([col, k], [pivot_row, k]);
            }
            b.swap(col, pivot_row);
        }

        for row in (col + 1)..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[[row, k]] -= factor * a[[col, k]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut w = Array1::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[[row, k]] * w[k]).sum();
        w[row] = (b[row] - tail) / a[[row, row]];
    }

    if w.iter().all(|v: &f64| v.is_finite()) {
        Some(w)
    } else {
        None
    }
}
