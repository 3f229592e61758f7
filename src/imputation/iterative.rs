//! Iterative imputation by chained equations
//!
//! Fills missing cells with an initial column statistic, then sweeps the
//! columns in turn, regressing each on all the others and re-estimating its
//! missing cells, until the total absolute change falls below a tolerance or
//! the sweep cap is reached.

use crate::error::Result;
use crate::imputation::{missing_mask, validate_input, Imputer, InitialStrategy};
use crate::regression::RandomForestRegressor;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Estimator used for the per-column regressions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Estimator {
    /// Centered least-squares regression per predictor
    Linear,
    /// Random forest regression
    Forest,
}

/// Chained-equations imputer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterativeImputer {
    /// Estimator type
    estimator: Estimator,
    /// Maximum sweeps
    max_iter: usize,
    /// Convergence tolerance on the total absolute change per sweep
    tol: f64,
    /// Initial fill strategy
    initial_strategy: InitialStrategy,
    /// Trees per forest (forest estimator only)
    n_estimators: usize,
    /// Seed for the forest's randomness
    seed: u64,
}

impl IterativeImputer {
    /// Create a new iterative imputer
    pub fn new(estimator: Estimator) -> Self {
        Self {
            estimator,
            max_iter: 10,
            tol: 1e-3,
            initial_strategy: InitialStrategy::Mean,
            n_estimators: 100,
            seed: 0,
        }
    }

    /// Set maximum sweeps
    pub fn with_max_iter(mut self, n: usize) -> Self {
        self.max_iter = n.max(1);
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tol = tol.max(1e-10);
        self
    }

    /// Set initial fill strategy
    pub fn with_initial_strategy(mut self, strategy: InitialStrategy) -> Self {
        self.initial_strategy = strategy;
        self
    }

    /// Set trees per forest
    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n.max(1);
        self
    }

    /// Set random seed
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Initial value for a column
    fn initial_value(&self, observed: &[f64]) -> f64 {
        match self.initial_strategy {
            InitialStrategy::Mean => observed.iter().sum::<f64>() / observed.len() as f64,
            InitialStrategy::Median => {
                let mut sorted = observed.to_vec();
                sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
                sorted[sorted.len() / 2]
            }
        }
    }

    /// Fit centered least squares per predictor and return (coefficients, intercept)
    fn fit_linear(x: &Array2<f64>, y: &Array1<f64>) -> (Vec<f64>, f64) {
        let n = x.nrows() as f64;
        let p = x.ncols();

        if n < 2.0 || p == 0 {
            return (vec![0.0; p], y.mean().unwrap_or(0.0));
        }

        let y_mean = y.mean().unwrap_or(0.0);
        let x_means: Vec<f64> = (0..p).map(|j| x.column(j).mean().unwrap_or(0.0)).collect();

        let y_centered: Vec<f64> = y.iter().map(|&yi| yi - y_mean).collect();

        let mut coefficients = vec![0.0; p];

        for j in 0..p {
            let x_centered: Vec<f64> = x.column(j).iter().map(|&xi| xi - x_means[j]).collect();

            let numerator: f64 = x_centered
                .iter()
                .zip(y_centered.iter())
                .map(|(&xi, &yi)| xi * yi)
                .sum();

            let denominator: f64 = x_centered.iter().map(|&xi| xi * xi).sum();

            coefficients[j] = if denominator > 1e-10 {
                numerator / denominator
            } else {
                0.0
            };
        }

        let intercept = y_mean
            - coefficients
                .iter()
                .zip(x_means.iter())
                .map(|(&c, &m)| c * m)
                .sum::<f64>();

        (coefficients, intercept)
    }

    fn predict_linear(x: &Array2<f64>, coefficients: &[f64], intercept: f64) -> Array1<f64> {
        let mut predictions = Array1::zeros(x.nrows());

        for i in 0..x.nrows() {
            let mut pred = intercept;
            for (j, &coef) in coefficients.iter().enumerate() {
                pred += coef * x[[i, j]];
            }
            predictions[i] = pred;
        }

        predictions
    }

    /// One sweep over all columns; returns the total absolute change.
    ///
    /// Rows are partitioned by the original missingness pattern, so observed
    /// cells are never re-estimated.
    fn sweep(&self, data: &mut Array2<f64>, mask: &Array2<bool>) -> Result<f64> {
        let (n_rows, n_cols) = data.dim();
        let mut total_change = 0.0;

        for target_col in 0..n_cols {
            let missing_rows: Vec<usize> =
                (0..n_rows).filter(|&r| mask[[r, target_col]]).collect();
            if missing_rows.is_empty() {
                continue;
            }

            let observed_rows: Vec<usize> =
                (0..n_rows).filter(|&r| !mask[[r, target_col]]).collect();
            let feature_cols: Vec<usize> = (0..n_cols).filter(|&c| c != target_col).collect();

            let mut x_train = Array2::zeros((observed_rows.len(), feature_cols.len()));
            let mut y_train = Array1::zeros(observed_rows.len());
            for (i, &r) in observed_rows.iter().enumerate() {
                for (j, &c) in feature_cols.iter().enumerate() {
                    x_train[[i, j]] = data[[r, c]];
                }
                y_train[i] = data[[r, target_col]];
            }

            let mut x_target = Array2::zeros((missing_rows.len(), feature_cols.len()));
            for (i, &r) in missing_rows.iter().enumerate() {
                for (j, &c) in feature_cols.iter().enumerate() {
                    x_target[[i, j]] = data[[r, c]];
                }
            }

            let predictions = match self.estimator {
                Estimator::Linear => {
                    let (coefficients, intercept) = Self::fit_linear(&x_train, &y_train);
                    Self::predict_linear(&x_target, &coefficients, intercept)
                }
                Estimator::Forest => {
                    let mut forest = RandomForestRegressor::new(self.n_estimators)
                        .with_random_state(self.seed);
                    forest.fit(&x_train, &y_train)?;
                    forest.predict(&x_target)?
                }
            };

            for (i, &r) in missing_rows.iter().enumerate() {
                let old_value = data[[r, target_col]];
                let new_value = predictions[i];
                data[[r, target_col]] = new_value;
                total_change += (new_value - old_value).abs();
            }
        }

        Ok(total_change)
    }
}

impl Imputer for IterativeImputer {
    fn impute(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        validate_input(x)?;

        let mask = missing_mask(x);
        let mut data = x.clone();

        for col_idx in 0..x.ncols() {
            let observed: Vec<f64> = x
                .column(col_idx)
                .iter()
                .filter(|v| !v.is_nan())
                .copied()
                .collect();
            let fill = self.initial_value(&observed);

            for row_idx in 0..x.nrows() {
                if mask[[row_idx, col_idx]] {
                    data[[row_idx, col_idx]] = fill;
                }
            }
        }

        for sweep_idx in 1..=self.max_iter {
            let change = self.sweep(&mut data, &mask)?;
            debug!(sweep_idx, change, "chained-equations sweep complete");
            if change < self.tol {
                break;
            }
        }

        Ok(data)
    }
}
