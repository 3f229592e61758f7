//! Regression models backing the per-column imputation rounds
//!
//! - Decision tree regressor (CART, variance-reduction splits)
//! - Random forest regressor (bootstrap ensemble, parallel tree building)

pub mod decision_tree;
pub mod random_forest;

pub use decision_tree::{DecisionTree, TreeNode};
pub use random_forest::RandomForestRegressor;
