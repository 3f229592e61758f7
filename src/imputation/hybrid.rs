//! Hybrid KNN / random-forest iterative imputation
//!
//! The hybrid imputer alternates two estimators until the completed matrix
//! stops changing:
//!
//! 1. An initial KNN pass fills every missing cell from its nearest rows.
//! 2. Each iteration re-estimates the originally-missing cells column by
//!    column with a random forest trained on the rows where that column was
//!    observed, using all other columns of the current completed matrix as
//!    features, then runs a KNN pass over the result.
//! 3. Iteration stops when the mean absolute change between successive
//!    completed matrices falls below the convergence threshold, or at the
//!    iteration cap. Hitting the cap is a normal terminal state, reported
//!    through [`HybridOutcome::converged`].
//!
//! Originally-observed cells are re-asserted from the input after every
//! round, so the output preserves them exactly.

use crate::error::{ImputeError, Result};
use crate::imputation::{missing_mask, validate_input, Imputer, KnnImputer};
use crate::regression::RandomForestRegressor;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for the hybrid imputer
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HybridConfig {
    /// Neighbors used for distance-weighted averaging
    pub neighbor_count: usize,
    /// Trees in the per-column forest
    pub tree_count: usize,
    /// Iteration cap
    pub max_iterations: usize,
    /// Mean absolute change below which iteration stops
    pub convergence_threshold: f64,
    /// Seed for the forest's internal randomness
    pub random_seed: u64,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            neighbor_count: 5,
            tree_count: 100,
            max_iterations: 10,
            convergence_threshold: 1e-4,
            random_seed: 20,
        }
    }
}

impl HybridConfig {
    /// Set neighbor count
    pub fn with_neighbor_count(mut self, n: usize) -> Self {
        self.neighbor_count = n;
        self
    }

    /// Set tree count
    pub fn with_tree_count(mut self, n: usize) -> Self {
        self.tree_count = n;
        self
    }

    /// Set iteration cap
    pub fn with_max_iterations(mut self, n: usize) -> Self {
        self.max_iterations = n;
        self
    }

    /// Set convergence threshold
    pub fn with_convergence_threshold(mut self, threshold: f64) -> Self {
        self.convergence_threshold = threshold;
        self
    }

    /// Set random seed
    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.neighbor_count == 0 {
            return Err(ImputeError::InvalidParameter {
                name: "neighbor_count".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.tree_count == 0 {
            return Err(ImputeError::InvalidParameter {
                name: "tree_count".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_iterations == 0 {
            return Err(ImputeError::InvalidParameter {
                name: "max_iterations".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if !self.convergence_threshold.is_finite() || self.convergence_threshold < 0.0 {
            return Err(ImputeError::InvalidParameter {
                name: "convergence_threshold".to_string(),
                value: format!("{}", self.convergence_threshold),
                reason: "must be finite and non-negative".to_string(),
            });
        }
        Ok(())
    }
}

/// Result of a hybrid imputation run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridOutcome {
    /// Completed matrix, same shape as the input
    pub data: Array2<f64>,
    /// Whether the convergence threshold was met before the iteration cap
    pub converged: bool,
    /// Iterations actually run
    pub iterations: usize,
    /// Mean absolute change recorded at each iteration
    pub deltas: Vec<f64>,
}

/// Hybrid KNN / random-forest imputer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridImputer {
    config: HybridConfig,
}

impl Default for HybridImputer {
    fn default() -> Self {
        Self {
            config: HybridConfig::default(),
        }
    }
}

impl HybridImputer {
    /// Create a new hybrid imputer from a validated configuration
    pub fn new(config: HybridConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The active configuration
    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// Run the full imputation loop and report the outcome.
    ///
    /// The input is read-only; the returned matrix has the same shape, no
    /// missing entries, and carries every originally-observed value
    /// unchanged.
    pub fn fit_transform(&self, x: &Array2<f64>) -> Result<HybridOutcome> {
        validate_input(x)?;

        let mask = missing_mask(x);
        let knn = KnnImputer::new(self.config.neighbor_count);

        let mut working = knn.impute(x)?;
        restore_observed(&mut working, x, &mask);

        let mut previous = working.clone();
        let mut deltas = Vec::with_capacity(self.config.max_iterations);

        for iteration in 1..=self.config.max_iterations {
            let refined = self.ensemble_round(x, &working, &mask)?;

            // The refined matrix is already complete, so this pass leaves it
            // unchanged; it is kept as the point the convergence delta is
            // measured at.
            working = knn.impute(&refined)?;
            restore_observed(&mut working, x, &mask);

            let delta = mean_abs_delta(&working, &previous);
            deltas.push(delta);
            debug!(iteration, delta, "refinement pass complete");

            if delta < self.config.convergence_threshold {
                debug!(iteration, "convergence reached");
                return Ok(HybridOutcome {
                    data: working,
                    converged: true,
                    iterations: iteration,
                    deltas,
                });
            }

            previous.assign(&working);
        }

        debug!(
            iterations = self.config.max_iterations,
            "iteration cap reached without convergence"
        );
        Ok(HybridOutcome {
            data: working,
            converged: false,
            iterations: self.config.max_iterations,
            deltas,
        })
    }

    /// One forest round over all columns.
    ///
    /// Rows are partitioned by the original missingness pattern, never by the
    /// current round's completeness. Later columns train on the estimates
    /// already written this round, so the round reflects the evolving joint
    /// dependency between columns.
    fn ensemble_round(
        &self,
        original: &Array2<f64>,
        current: &Array2<f64>,
        mask: &Array2<bool>,
    ) -> Result<Array2<f64>> {
        let (n_rows, n_cols) = original.dim();
        let mut updated = current.clone();

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
                    x_train[[i, j]] = updated[[r, c]];
                }
                y_train[i] = original[[r, target_col]];
            }

            let mut x_target = Array2::zeros((missing_rows.len(), feature_cols.len()));
            for (i, &r) in missing_rows.iter().enumerate() {
                for (j, &c) in feature_cols.iter().enumerate() {
                    x_target[[i, j]] = updated[[r, c]];
                }
            }

            // A fresh forest per column, always from the same seed: every
            // column's fit starts from identical RNG state.
            let mut forest = RandomForestRegressor::new(self.config.tree_count)
                .with_random_state(self.config.random_seed);
            forest.fit(&x_train, &y_train)?;
            let predictions = forest.predict(&x_target)?;

            for (i, &r) in missing_rows.iter().enumerate() {
                updated[[r, target_col]] = predictions[i];
            }
        }

        Ok(updated)
    }
}

impl Imputer for HybridImputer {
    fn impute(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        self.fit_transform(x).map(|outcome| outcome.data)
    }
}

fn restore_observed(working: &mut Array2<f64>, original: &Array2<f64>, mask: &Array2<bool>) {
    for ((r, c), &was_missing) in mask.indexed_iter() {
        if !was_missing {
            working[[r, c]] = original[[r, c]];
        }
    }
}

fn mean_abs_delta(a: &Array2<f64>, b: &Array2<f64>) -> f64 {
    let accum: f64 = a.iter().zip(b.iter()).map(|(va, vb)| (va - vb).abs()).sum();
    accum / a.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn correlated_matrix() -> Array2<f64> {
        // col2 tracks 2 * col0 + col1
        array![
            [1.0, 0.5, 2.5],
            [2.0, 1.0, 5.0],
            [3.0, 1.5, 7.5],
            [4.0, 2.0, f64::NAN],
            [5.0, 2.5, 12.5],
            [6.0, 3.0, 15.0],
            [7.0, 3.5, f64::NAN],
            [8.0, 4.0, 20.0],
        ]
    }

    #[test]
    fn test_default_config_values() {
        let config = HybridConfig::default();
        assert_eq!(config.neighbor_count, 5);
        assert_eq!(config.tree_count, 100);
        assert_eq!(config.max_iterations, 10);
        assert_eq!(config.convergence_threshold, 1e-4);
        assert_eq!(config.random_seed, 20);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = HybridConfig::default().with_tree_count(0);
        assert!(HybridImputer::new(config).is_err());

        let config = HybridConfig::default().with_convergence_threshold(f64::NAN);
        assert!(HybridImputer::new(config).is_err());
    }

    #[test]
    fn test_converges_on_correlated_data() {
        let x = correlated_matrix();
        let imputer = HybridImputer::new(
            HybridConfig::default().with_tree_count(25).with_neighbor_count(3),
        )
        .unwrap();

        let outcome = imputer.fit_transform(&x).unwrap();

        assert!(outcome.converged);
        assert!(outcome.iterations <= 10);
        assert!(!outcome.data.iter().any(|&v| v.is_nan()));
        assert_eq!(outcome.deltas.len(), outcome.iterations);
    }

    #[test]
    fn test_observed_cells_preserved_exactly() {
        let x = correlated_matrix();
        let imputer = HybridImputer::default();
        let outcome = imputer.fit_transform(&x).unwrap();

        for ((r, c), &v) in x.indexed_iter() {
            if !v.is_nan() {
                assert_eq!(outcome.data[[r, c]].to_bits(), v.to_bits());
            }
        }
    }

    #[test]
    fn test_complete_input_converges_immediately() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let imputer = HybridImputer::default();
        let outcome = imputer.fit_transform(&x).unwrap();

        assert!(outcome.converged);
        assert_eq!(outcome.iterations, 1);
        assert_eq!(outcome.data, x);
    }

    #[test]
    fn test_single_observed_value_fails_fast() {
        // One observed value is enough for validation but not for training.
        let x = array![
            [1.0, f64::NAN],
            [2.0, f64::NAN],
            [3.0, 5.0],
            [4.0, f64::NAN],
        ];
        let imputer = HybridImputer::default();
        assert!(imputer.fit_transform(&x).is_err());
    }

    #[test]
    fn test_empty_column_names_offender() {
        let x = array![[1.0, f64::NAN], [2.0, f64::NAN], [3.0, f64::NAN]];
        let imputer = HybridImputer::default();
        let err = imputer.fit_transform(&x).unwrap_err();
        assert!(matches!(err, ImputeError::EmptyColumn(1)));
    }
}
