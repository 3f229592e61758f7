//! isoimpute - Missing-value imputation for isotope-ratio specimen datasets
//!
//! This crate provides the numerical core of an imputation benchmarking
//! pipeline: given a matrix of isotope measurements with missing entries
//! (marked `NaN`), it produces a fully completed matrix and the error metrics
//! used to score reconstructions against ground truth.
//!
//! # Modules
//!
//! - [`imputation`] - Imputation algorithms (KNN, chained equations, hybrid)
//! - [`regression`] - Decision tree and random forest regressors backing the
//!   per-column imputation rounds
//! - [`metrics`] - MAE, MAPE, RMSE, NRMSE
//!
//! # Example
//!
//! ```
//! use isoimpute::imputation::{HybridConfig, HybridImputer};
//! use ndarray::array;
//!
//! let x = array![
//!     [1.0, 0.5, 2.5],
//!     [2.0, 1.0, 5.0],
//!     [3.0, 1.5, f64::NAN],
//!     [4.0, 2.0, 10.0],
//!     [5.0, 2.5, 12.5],
//! ];
//!
//! let imputer = HybridImputer::new(HybridConfig::default().with_tree_count(25)).unwrap();
//! let outcome = imputer.fit_transform(&x).unwrap();
//!
//! assert!(!outcome.data.iter().any(|v| v.is_nan()));
//! ```

// Core error handling
pub mod error;

// Imputation algorithms
pub mod imputation;

// Regression models
pub mod regression;

// Reconstruction scoring
pub mod metrics;

pub use error::{ImputeError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{ImputeError, Result};

    // Imputation
    pub use crate::imputation::{
        missing_mask, Estimator, HybridConfig, HybridImputer, HybridOutcome, Imputer,
        InitialStrategy, IterativeImputer, KnnImputer,
    };

    // Regression
    pub use crate::regression::{DecisionTree, RandomForestRegressor};

    // Scoring
    pub use crate::metrics::ImputationScores;
}
