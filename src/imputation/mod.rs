//! Missing-value imputation algorithms
//!
//! Provides the imputation methods benchmarked against each other on
//! specimen datasets:
//! - KNN imputer (distance-weighted neighbor averaging)
//! - Iterative imputer (chained equations with a selectable estimator)
//! - Hybrid imputer (alternating KNN / random-forest refinement)

mod hybrid;
mod iterative;
mod knn;

pub use hybrid::{HybridConfig, HybridImputer, HybridOutcome};
pub use iterative::{Estimator, IterativeImputer};
pub use knn::KnnImputer;

use crate::error::{ImputeError, Result};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// Strategy for the initial fill of a chained-equations sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InitialStrategy {
    /// Mean of the observed values
    Mean,
    /// Median of the observed values
    Median,
}

/// Trait for imputers
///
/// Each invocation is independent: an imputer is a pure function of its
/// configuration and the input matrix, so there is no separate fit step.
pub trait Imputer: Send + Sync {
    /// Produce a completed copy of `x` with every missing entry filled in.
    ///
    /// The input is never mutated, and its shape is preserved exactly.
    fn impute(&self, x: &Array2<f64>) -> Result<Array2<f64>>;
}

/// Check if a value is missing (NaN)
#[inline]
pub fn is_missing(v: f64) -> bool {
    v.is_nan()
}

/// Derive the missingness mask for a matrix
///
/// `true` marks cells that are missing in the input. The mask is computed once
/// at the start of an imputation run and never mutated afterwards.
pub fn missing_mask(x: &Array2<f64>) -> Array2<bool> {
    x.mapv(is_missing)
}

/// Validate a matrix before imputation.
///
/// Degenerate inputs are rejected rather than degraded: fewer than two rows or
/// two columns leave nothing to estimate from, and a column with zero observed
/// values makes neighbor averaging undefined.
pub(crate) fn validate_input(x: &Array2<f64>) -> Result<()> {
    let (n_rows, n_cols) = x.dim();

    if n_rows < 2 {
        return Err(ImputeError::ValidationError(format!(
            "at least 2 rows required, got {}",
            n_rows
        )));
    }
    if n_cols < 2 {
        return Err(ImputeError::ValidationError(format!(
            "at least 2 columns required, got {}",
            n_cols
        )));
    }

    for (col_idx, column) in x.columns().into_iter().enumerate() {
        if column.iter().all(|&v| is_missing(v)) {
            return Err(ImputeError::EmptyColumn(col_idx));
        }
    }

    Ok(())
}
