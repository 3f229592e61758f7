//! KNN-based imputation
//!
//! Fills each missing cell with a distance-weighted average over the rows
//! most similar to it. Distances are pairwise-complete: only columns observed
//! in both rows contribute, so rows with missing entries still participate as
//! neighbors.

use crate::error::Result;
use crate::imputation::{is_missing, validate_input, Imputer};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

/// KNN-based imputer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnnImputer {
    /// Number of neighbors used for averaging
    n_neighbors: usize,
}

impl KnnImputer {
    /// Create a new KNN imputer with the given neighbor count
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors: n_neighbors.max(1),
        }
    }

    /// Neighbor count used for averaging
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Pairwise-complete distance between two rows.
    ///
    /// Mean squared difference over the columns observed in both rows, then a
    /// square root. Rows sharing no observed column are infinitely far apart
    /// and never act as neighbors.
    fn distance(a: &[f64], b: &[f64]) -> f64 {
        let mut count = 0usize;
        let mut accum = 0.0f64;

        for (&ai, &bi) in a.iter().zip(b.iter()) {
            if is_missing(ai) || is_missing(bi) {
                continue;
            }
            count += 1;
            let d = ai - bi;
            accum += d * d;
        }

        if count == 0 {
            return f64::INFINITY;
        }

        (accum / count as f64).sqrt()
    }

    /// Distances from `row_idx` to every other row, ascending.
    ///
    /// Ties are broken by row index so neighbor selection is deterministic.
    fn ranked_neighbors(x: &Array2<f64>, row_idx: usize) -> Vec<(usize, f64)> {
        let row: Vec<f64> = x.row(row_idx).iter().copied().collect();
        let mut buf: Vec<f64> = Vec::with_capacity(x.ncols());

        let mut candidates: Vec<(usize, f64)> = x
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(i, _)| *i != row_idx)
            .filter_map(|(i, other)| {
                buf.clear();
                buf.extend(other.iter().copied());
                let dist = Self::distance(&row, &buf);
                dist.is_finite().then_some((i, dist))
            })
            .collect();

        candidates.sort_by(|a, b| {
            a.1.partial_cmp(&b.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.0.cmp(&b.0))
        });

        candidates
    }

    /// Inverse-distance-weighted average of the k nearest candidates that
    /// have `col` observed. Uses every available candidate when fewer than k
    /// qualify.
    fn weighted_average(
        &self,
        x: &Array2<f64>,
        ranked: &[(usize, f64)],
        col: usize,
    ) -> Option<f64> {
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        let mut taken = 0usize;

        for &(idx, dist) in ranked {
            if is_missing(x[[idx, col]]) {
                continue;
            }
            let weight = if dist < 1e-10 { 1e10 } else { 1.0 / dist };
            weighted_sum += x[[idx, col]] * weight;
            weight_sum += weight;
            taken += 1;
            if taken == self.n_neighbors {
                break;
            }
        }

        (taken > 0).then(|| weighted_sum / weight_sum)
    }

    /// Mean of the observed values in a column. Validation guarantees at
    /// least one observed value per column.
    fn column_mean(x: &Array2<f64>, col: usize) -> f64 {
        let mut sum = 0.0;
        let mut count = 0usize;
        for &v in x.column(col) {
            if !is_missing(v) {
                sum += v;
                count += 1;
            }
        }
        sum / count as f64
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Imputer for KnnImputer {
    fn impute(&self, x: &Array2<f64>) -> Result<Array2<f64>> {
        validate_input(x)?;

        let mut result = x.clone();
        let n_cols = x.ncols();

        for row_idx in 0..x.nrows() {
            let has_missing = x.row(row_idx).iter().any(|&v| is_missing(v));
            if !has_missing {
                continue;
            }

            let ranked = Self::ranked_neighbors(x, row_idx);

            for col in 0..n_cols {
                if !is_missing(x[[row_idx, col]]) {
                    continue;
                }
                // A row disconnected from every donor falls back to the
                // column mean of the observed values.
                let value = self
                    .weighted_average(x, &ranked, col)
                    .unwrap_or_else(|| Self::column_mean(x, col));
                result[[row_idx, col]] = value;
            }
        }

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_basic_fill() {
        let x = array![
            [1.0, 10.0],
            [2.0, 20.0],
            [3.0, 30.0],
            [4.0, 40.0],
            [f64::NAN, 25.0],
            [2.5, f64::NAN],
        ];

        let imputer = KnnImputer::new(3);
        let result = imputer.impute(&x).unwrap();

        assert!(!result.iter().any(|&v| v.is_nan()));
        assert!(result[[4, 0]] >= 1.0 && result[[4, 0]] <= 4.0);
        assert!(result[[5, 1]] >= 10.0 && result[[5, 1]] <= 40.0);
    }

    #[test]
    fn test_distance_weighting_favors_close_rows() {
        let x = array![
            [0.0, 0.0],
            [1.0, 1.0],
            [2.0, 2.0],
            [3.0, 3.0],
            [0.1, f64::NAN],
        ];

        let imputer = KnnImputer::new(3);
        let result = imputer.impute(&x).unwrap();

        // The nearly-coincident first row dominates the weighted average.
        assert!(result[[4, 1]] < 1.0);
    }

    #[test]
    fn test_neighbor_shortfall_uses_all_available() {
        let x = array![[1.0, 10.0], [3.0, f64::NAN], [5.0, 30.0]];

        let imputer = KnnImputer::new(50);
        let result = imputer.impute(&x).unwrap();

        // Both donors are equally far, so the average is their midpoint.
        assert!((result[[1, 1]] - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_pairwise_complete_distance() {
        // The donor rows themselves carry missing entries; distance falls
        // back to the commonly observed columns.
        let x = array![
            [1.0, f64::NAN, 5.0],
            [1.1, 8.0, f64::NAN],
            [4.0, 9.0, 6.0],
            [f64::NAN, 8.5, 5.5],
        ];

        let imputer = KnnImputer::new(2);
        let result = imputer.impute(&x).unwrap();
        assert!(!result.iter().any(|&v| v.is_nan()));
    }

    #[test]
    fn test_input_not_mutated() {
        let x = array![[1.0, f64::NAN], [2.0, 5.0], [3.0, 7.0]];
        let copy = x.clone();

        let imputer = KnnImputer::default();
        let _ = imputer.impute(&x).unwrap();

        for (a, b) in x.iter().zip(copy.iter()) {
            assert_eq!(a.is_nan(), b.is_nan());
            if !a.is_nan() {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_complete_input_is_identity() {
        let x = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let imputer = KnnImputer::default();
        let result = imputer.impute(&x).unwrap();
        assert_eq!(result, x);
    }

    #[test]
    fn test_empty_column_rejected() {
        let x = array![[1.0, f64::NAN], [2.0, f64::NAN], [3.0, f64::NAN]];
        let imputer = KnnImputer::default();
        assert!(imputer.impute(&x).is_err());
    }
}
