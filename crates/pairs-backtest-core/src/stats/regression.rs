use serde::{Deserialize, Serialize};

use crate::error::PairsError;
use crate::PairsResult;

/// Coefficients of `y = intercept + slope * x` fitted by ordinary least squares.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OlsFit {
    pub intercept: f64,
    pub slope: f64,
    /// NaN when `y` is constant.
    pub r_squared: f64,
    pub observations: usize,
}

impl OlsFit {
    /// True when `y` is an affine function of `x` up to rounding, including a
    /// constant `y`. The residuals then carry no information.
    pub fn is_exact_fit(&self) -> bool {
        !(self.r_squared < EXACT_FIT_R_SQUARED)
    }
}

/// R² at or above which a fit counts as exact: `1 - 100 * sqrt(eps)`.
pub const EXACT_FIT_R_SQUARED: f64 = 1.0 - 100.0 * 1.490_116_119_384_765_6e-8;

/// Simple regression of `y` on `x` with an intercept.
pub fn simple_ols(y: &[f64], x: &[f64]) -> PairsResult<OlsFit> {
    let n = y.len();
    if x.len() != n {
        return Err(PairsError::InputMismatch(format!(
            "regression needs equal lengths, got y={} x={}",
            n,
            x.len()
        )));
    }
    if n < 3 {
        return Err(PairsError::InsufficientData(format!(
            "OLS requires at least 3 observations, got {n}"
        )));
    }

    let n_f = n as f64;
    let mean_x = x.iter().sum::<f64>() / n_f;
    let mean_y = y.iter().sum::<f64>() / n_f;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 {
        return Err(PairsError::DivisionByZero {
            context: "OLS slope: regressor has zero variance".into(),
        });
    }

    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| {
            let e = yi - intercept - slope * xi;
            e * e
        })
        .sum();
    let r_squared = if syy == 0.0 { f64::NAN } else { 1.0 - sse / syy };

    Ok(OlsFit {
        intercept,
        slope,
        r_squared,
        observations: n,
    })
}

/// Result of a multiple regression without an implicit intercept.
#[derive(Debug, Clone)]
pub struct LeastSquares {
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    /// Sum of squared residuals.
    pub ssr: f64,
    pub observations: usize,
}

impl LeastSquares {
    pub fn t_stat(&self, j: usize) -> f64 {
        self.coefficients[j] / self.std_errors[j]
    }
}

/// Fit `y = X b` by solving the normal equations.
///
/// `rows` holds one regressor vector per observation; every row must have the
/// same width. Include a column of ones for an intercept.
pub fn least_squares(rows: &[Vec<f64>], y: &[f64]) -> PairsResult<LeastSquares> {
    let n = rows.len();
    if y.len() != n {
        return Err(PairsError::InputMismatch(format!(
            "design matrix has {n} rows but response has {}",
            y.len()
        )));
    }
    let k = rows.first().map(Vec::len).unwrap_or(0);
    if k == 0 {
        return Err(PairsError::InvalidInput {
            field: "rows".into(),
            reason: "design matrix has no columns".into(),
        });
    }
    if rows.iter().any(|r| r.len() != k) {
        return Err(PairsError::InvalidInput {
            field: "rows".into(),
            reason: "design matrix rows have different widths".into(),
        });
    }
    if n <= k {
        return Err(PairsError::InsufficientData(format!(
            "{n} observations cannot identify {k} coefficients"
        )));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, yi) in rows.iter().zip(y) {
        for a in 0..k {
            xty[a] += row[a] * yi;
            for b in a..k {
                xtx[a][b] += row[a] * row[b];
            }
        }
    }
    for a in 0..k {
        for b in 0..a {
            xtx[a][b] = xtx[b][a];
        }
    }

    let inverse = invert(xtx)?;
    let coefficients: Vec<f64> = (0..k)
        .map(|a| (0..k).map(|b| inverse[a][b] * xty[b]).sum())
        .collect();

    let ssr: f64 = rows
        .iter()
        .zip(y)
        .map(|(row, yi)| {
            let fitted: f64 = row.iter().zip(&coefficients).map(|(x, c)| x * c).sum();
            let e = yi - fitted;
            e * e
        })
        .sum();

    let sigma2 = ssr / (n - k) as f64;
    let std_errors = (0..k).map(|j| (sigma2 * inverse[j][j]).sqrt()).collect();

    Ok(LeastSquares {
        coefficients,
        std_errors,
        ssr,
        observations: n,
    })
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert(mut m: Vec<Vec<f64>>) -> PairsResult<Vec<Vec<f64>>> {
    let k = m.len();
    let mut inv: Vec<Vec<f64>> = (0..k)
        .map(|i| (0..k).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    let scale = m
        .iter()
        .flat_map(|r| r.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let tolerance = f64::EPSILON * scale.max(1.0) * k as f64;

    for col in 0..k {
        let pivot = (col..k)
            .max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() <= tolerance {
            return Err(PairsError::DivisionByZero {
                context: "least squares: design matrix is singular".into(),
            });
        }
        m.swap(col, pivot);
        inv.swap(col, pivot);

        let p = m[col][col];
        for j in 0..k {
            m[col][j] /= p;
            inv[col][j] /= p;
        }
        for row in 0..k {
            if row == col {
                continue;
            }
            let factor = m[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..k {
                m[row][j] -= factor * m[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }
    Ok(inv)
}
