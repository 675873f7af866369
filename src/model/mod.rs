//! Binary classifiers over encoded feature matrices.

mod binning;
mod forest;
mod gbdt;
mod logistic;
mod pipeline;
mod tree;
mod voting;

pub use binning::BinMapper;
pub use forest::{ForestParams, RandomForestClassifier};
pub use gbdt::{GbdtParams, GradientBoostingClassifier};
pub use logistic::{LogisticParams, LogisticRegression};
pub use pipeline::Pipeline;
pub use tree::{Node, Tree};
pub use voting::{EnsembleMember, SoftVotingClassifier};

use crate::error::Result;
use crate::matrix::FeatureMatrix;

pub trait Classifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[i32]) -> Result<()>;

    /// Probability of the positive class, one entry per row.
    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>>;

    fn predict(&self, x: &FeatureMatrix) -> Result<Vec<i32>> {
        Ok(self
            .predict_proba(x)?
            .into_iter()
            .map(|p| if p > 0.5 { 1 } else { 0 })
            .collect())
    }
}

pub(crate) fn sigmoid(raw: f64) -> f64 {
    1.0 / (1.0 + (-raw).exp())
}

/// Mean binary cross-entropy, clipped away from log(0).
pub fn log_loss(y: &[i32], proba: &[f64]) -> f64 {
    let eps = 1e-15;
    let total: f64 = y
        .iter()
        .zip(proba)
        .map(|(&label, &p)| {
            let p = p.clamp(eps, 1.0 - eps);
            if label == 1 {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / y.len().max(1) as f64
}
