//! Bayesian ridge regression with evidence-based hyperparameter updates.
//!
//! The noise and weight precisions are re-estimated from the data under weak
//! Gamma hyperpriors, so regularization strength does not need hand tuning.
//! Fitting is fully deterministic: the same design matrix and targets always
//! produce the same weights.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BayesianRidgeConfig {
    /// Gamma shape hyperprior on the noise precision.
    pub alpha_1: f64,
    /// Gamma rate hyperprior on the noise precision.
    pub alpha_2: f64,
    /// Gamma shape hyperprior on the weight precision.
    pub lambda_1: f64,
    /// Gamma rate hyperprior on the weight precision.
    pub lambda_2: f64,
    pub max_iter: usize,
    pub tol: f64,
}

impl Default for BayesianRidgeConfig {
    fn default() -> Self {
        Self {
            alpha_1: 1e-6,
            alpha_2: 1e-6,
            lambda_1: 1e-6,
            lambda_2: 1e-6,
            max_iter: 300,
            tol: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BayesianRidge {
    weights: Vec<f64>,
    intercept: f64,
    /// Estimated noise precision.
    alpha: f64,
    /// Estimated weight precision.
    lambda: f64,
}

impl BayesianRidge {
    pub fn fit(
        rows: &[Vec<f64>],
        targets: &[f64],
        config: &BayesianRidgeConfig,
    ) -> Result<Self, CoreError> {
        let n = rows.len();
        if n == 0 {
            return Err(CoreError::invalid_input(
                "training_set",
                "cannot fit regression on an empty set",
            ));
        }
        if targets.len() != n {
            return Err(CoreError::invalid_input(
                "training_set",
                format!("{} feature rows but {} targets", n, targets.len()),
            ));
        }
        let dim = rows[0].len();
        if dim == 0 || rows.iter().any(|row| row.len() != dim) {
            return Err(CoreError::invalid_input(
                "training_set",
                "inconsistent or empty feature rows",
            ));
        }

        // Center features and targets; the intercept is recovered afterwards.
        let mut x_mean = vec![0.0; dim];
        for row in rows {
            for (col, &value) in row.iter().enumerate() {
                x_mean[col] += value;
            }
        }
        for mean in &mut x_mean {
            *mean /= n as f64;
        }
        let y_mean = targets.iter().sum::<f64>() / n as f64;

        let centered: Vec<Vec<f64>> = rows
            .iter()
            .map(|row| row.iter().zip(&x_mean).map(|(&v, &m)| v - m).collect())
            .collect();
        let y_centered: Vec<f64> = targets.iter().map(|&t| t - y_mean).collect();

        let mut xtx = vec![0.0; dim * dim];
        let mut xty = vec![0.0; dim];
        for (row, &target) in centered.iter().zip(&y_centered) {
            for i in 0..dim {
                xty[i] += row[i] * target;
                for j in i..dim {
                    xtx[i * dim + j] += row[i] * row[j];
                }
            }
        }
        for i in 0..dim {
            for j in 0..i {
                xtx[i * dim + j] = xtx[j * dim + i];
            }
        }

        let y_var = y_centered.iter().map(|&y| y * y).sum::<f64>() / n as f64;
        let mut alpha = if y_var > f64::EPSILON { 1.0 / y_var } else { 1.0 };
        let mut lambda = 1.0;
        let mut weights = vec![0.0; dim];

        for iteration in 0..config.max_iter {
            let (new_weights, trace_inv) =
                solve_posterior(&xtx, &xty, dim, alpha, lambda)?;

            let gamma = dim as f64 - lambda * trace_inv;
            let weight_norm: f64 = new_weights.iter().map(|&w| w * w).sum();
            let rss: f64 = centered
                .iter()
                .zip(&y_centered)
                .map(|(row, &target)| {
                    let fitted: f64 = row.iter().zip(&new_weights).map(|(&x, &w)| x * w).sum();
                    (target - fitted) * (target - fitted)
                })
                .sum();

            lambda = (gamma + 2.0 * config.lambda_1) / (weight_norm + 2.0 * config.lambda_2);
            alpha = (n as f64 - gamma + 2.0 * config.alpha_1) / (rss + 2.0 * config.alpha_2);

            let change: f64 = weights
                .iter()
                .zip(&new_weights)
                .map(|(&old, &new)| (old - new).abs())
                .sum();
            weights = new_weights;
            if iteration > 0 && change < config.tol {
                break;
            }
        }

        // Final posterior mean under the converged precisions.
        let (final_weights, _) = solve_posterior(&xtx, &xty, dim, alpha, lambda)?;
        let intercept = y_mean
            - final_weights
                .iter()
                .zip(&x_mean)
                .map(|(&w, &m)| w * m)
                .sum::<f64>();

        Ok(Self {
            weights: final_weights,
            intercept,
            alpha,
            lambda,
        })
    }

    pub fn dim(&self) -> usize {
        self.weights.len()
    }

    pub fn noise_precision(&self) -> f64 {
        self.alpha
    }

    pub fn weight_precision(&self) -> f64 {
        self.lambda
    }

    pub fn predict_one(&self, x: &[f64]) -> Result<f64, CoreError> {
        if x.len() != self.weights.len() {
            return Err(CoreError::invalid_input(
                "features",
                format!("expected {} values, got {}", self.weights.len(), x.len()),
            ));
        }
        Ok(self
            .weights
            .iter()
            .zip(x)
            .map(|(&w, &v)| w * v)
            .sum::<f64>()
            + self.intercept)
    }
}

/// Solves (lambda I + alpha XtX) w = alpha Xty and returns the weights plus
/// the trace of the posterior covariance, both needed by the evidence update.
fn solve_posterior(
    xtx: &[f64],
    xty: &[f64],
    dim: usize,
    alpha: f64,
    lambda: f64,
) -> Result<(Vec<f64>, f64), CoreError> {
    let mut a = vec![0.0; dim * dim];
    for i in 0..dim {
        for j in 0..dim {
            a[i * dim + j] = alpha * xtx[i * dim + j];
        }
        a[i * dim + i] += lambda;
    }

    let l = cholesky(&a, dim).ok_or_else(|| {
        CoreError::invalid_input("training_set", "posterior normal equations are singular")
    })?;

    let scaled: Vec<f64> = xty.iter().map(|&v| alpha * v).collect();
    let weights = cholesky_solve(&l, dim, &scaled);

    let mut trace_inv = 0.0;
    let mut unit = vec![0.0; dim];
    for i in 0..dim {
        unit[i] = 1.0;
        trace_inv += cholesky_solve(&l, dim, &unit)[i];
        unit[i] = 0.0;
    }

    Ok((weights, trace_inv))
}

/// Lower-triangular Cholesky factor of a symmetric positive-definite matrix.
fn cholesky(a: &[f64], dim: usize) -> Option<Vec<f64>> {
    let mut l = vec![0.0; dim * dim];
    for i in 0..dim {
        for j in 0..=i {
            let mut sum = a[i * dim + j];
            for k in 0..j {
                sum -= l[i * dim + k] * l[j * dim + k];
            }
            if i == j {
                if sum <= 0.0 {
                    return None;
                }
                l[i * dim + i] = sum.sqrt();
            } else {
                l[i * dim + j] = sum / l[j * dim + j];
            }
        }
    }
    Some(l)
}

fn cholesky_solve(l: &[f64], dim: usize, b: &[f64]) -> Vec<f64> {
    let mut y = vec![0.0; dim];
    for i in 0..dim {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[i * dim + k] * y[k];
        }
        y[i] = sum / l[i * dim + i];
    }

    let mut x = vec![0.0; dim];
    for i in (0..dim).rev() {
        let mut sum = y[i];
        for k in i + 1..dim {
            sum -= l[k * dim + i] * x[k];
        }
        x[i] = sum / l[i * dim + i];
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear_data() -> (Vec<Vec<f64>>, Vec<f64>) {
        // y = 2*x0 - 1.5*x1 + 3 exactly; no noise.
        let mut rows = Vec::new();
        let mut targets = Vec::new();
        for i in 0..40 {
            let x0 = f64::from(i) * 0.25;
            let x1 = f64::from((i * 7) % 11) * 0.5;
            rows.push(vec![x0, x1]);
            targets.push(2.0 * x0 - 1.5 * x1 + 3.0);
        }
        (rows, targets)
    }

    #[test]
    fn recovers_a_linear_relationship() {
        let (rows, targets) = linear_data();
        let model =
            BayesianRidge::fit(&rows, &targets, &BayesianRidgeConfig::default()).expect("fit");

        let prediction = model.predict_one(&[4.0, 2.0]).expect("predict");
        assert!((prediction - (2.0 * 4.0 - 1.5 * 2.0 + 3.0)).abs() < 0.05);
    }

    #[test]
    fn fitting_is_deterministic() {
        let (rows, targets) = linear_data();
        let config = BayesianRidgeConfig::default();
        let first = BayesianRidge::fit(&rows, &targets, &config).expect("fit");
        let second = BayesianRidge::fit(&rows, &targets, &config).expect("fit");
        assert_eq!(first, second);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let (rows, targets) = linear_data();
        let model =
            BayesianRidge::fit(&rows, &targets, &BayesianRidgeConfig::default()).expect("fit");
        let err = model.predict_one(&[1.0]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }

    #[test]
    fn empty_training_set_is_rejected() {
        let err =
            BayesianRidge::fit(&[], &[], &BayesianRidgeConfig::default()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput { .. }));
    }

    #[test]
    fn cholesky_solves_a_known_system() {
        // A = [[4, 2], [2, 3]], b = [10, 8] -> x = [1.75, 1.5]
        let a = vec![4.0, 2.0, 2.0, 3.0];
        let l = cholesky(&a, 2).expect("spd");
        let x = cholesky_solve(&l, 2, &[10.0, 8.0]);
        assert!((x[0] - 1.75).abs() < 1e-12);
        assert!((x[1] - 1.5).abs() < 1e-12);
    }
}
