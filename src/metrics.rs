//! Error metrics for scoring reconstructed values against ground truth

use crate::error::{ImputeError, Result};
use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// Mean absolute error
pub fn mae(actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).abs())
        .sum();
    sum / actual.len() as f64
}

/// Mean absolute percentage error, in percent.
///
/// Entries with a zero actual value are skipped to keep the ratio defined.
pub fn mape(actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    let mut sum = 0.0;
    let mut count = 0usize;
    for (a, p) in actual.iter().zip(predicted.iter()) {
        if *a != 0.0 {
            sum += ((a - p) / a).abs();
            count += 1;
        }
    }
    if count == 0 {
        return 0.0;
    }
    sum / count as f64 * 100.0
}

/// Root mean squared error
pub fn rmse(actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    if actual.is_empty() {
        return 0.0;
    }
    let sum: f64 = actual
        .iter()
        .zip(predicted.iter())
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    (sum / actual.len() as f64).sqrt()
}

/// RMSE normalized by the observed range of the actual values.
///
/// Zero when the range is zero.
pub fn nrmse(actual: ArrayView1<f64>, predicted: ArrayView1<f64>) -> f64 {
    let range = value_range(actual);
    if range == 0.0 {
        return 0.0;
    }
    rmse(actual, predicted) / range
}

fn value_range(values: ArrayView1<f64>) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        max - min
    } else {
        0.0
    }
}

/// Error metrics for one reconstruction
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImputationScores {
    pub mae: f64,
    pub mape: f64,
    pub rmse: f64,
    pub nrmse: f64,
}

impl ImputationScores {
    /// Score an imputed matrix against ground truth over the cells the mask
    /// marks as originally missing.
    pub fn between(
        truth: &Array2<f64>,
        imputed: &Array2<f64>,
        mask: &Array2<bool>,
    ) -> Result<Self> {
        if truth.dim() != imputed.dim() || truth.dim() != mask.dim() {
            return Err(ImputeError::ShapeError {
                expected: format!("{:?}", truth.dim()),
                actual: format!("{:?} / {:?}", imputed.dim(), mask.dim()),
            });
        }

        let mut actual = Vec::new();
        let mut predicted = Vec::new();
        for ((r, c), &was_missing) in mask.indexed_iter() {
            if was_missing {
                actual.push(truth[[r, c]]);
                predicted.push(imputed[[r, c]]);
            }
        }

        if actual.is_empty() {
            return Err(ImputeError::ValidationError(
                "mask marks no cells to score".to_string(),
            ));
        }

        let actual = ndarray::Array1::from_vec(actual);
        let predicted = ndarray::Array1::from_vec(predicted);

        Ok(Self {
            mae: mae(actual.view(), predicted.view()),
            mape: mape(actual.view(), predicted.view()),
            rmse: rmse(actual.view(), predicted.view()),
            nrmse: nrmse(actual.view(), predicted.view()),
        })
    }
}
