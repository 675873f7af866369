use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::linear::logistic_regression::{
    LogisticRegression as SmartLogisticRegression, LogisticRegressionParameters,
};

use crate::error::{PipelineError, Result};
use crate::matrix::FeatureMatrix;
use crate::model::gbdt::check_training_set;
use crate::model::{sigmoid, Classifier};

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticParams {
    /// Inverse regularization strength, as in liblinear-style APIs.
    pub c: f64,
}

impl Default for LogisticParams {
    fn default() -> Self {
        Self { c: 1.0 }
    }
}

/// L2-regularized logistic regression fitted by smartcore; only the learned
/// weights are kept so probabilities can be computed directly.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    params: LogisticParams,
    weights: Vec<f64>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn new(params: LogisticParams) -> Self {
        Self {
            params,
            weights: Vec::new(),
            intercept: 0.0,
        }
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl Classifier for LogisticRegression {
    fn fit(&mut self, x: &FeatureMatrix, y: &[i32]) -> Result<()> {
        check_training_set(x, y)?;
        if self.params.c <= 0.0 {
            return Err(PipelineError::Model("C must be positive".to_string()));
        }
        let dense = x.to_dense();
        let labels = y.to_vec();
        let parameters = LogisticRegressionParameters::default().with_alpha(1.0 / self.params.c);
        let fitted: SmartLogisticRegression<f64, i32, DenseMatrix<f64>, Vec<i32>> =
            SmartLogisticRegression::fit(&dense, &labels, parameters)?;

        let coefficients = fitted.coefficients();
        self.weights = (0..x.n_cols())
            .map(|j| *coefficients.get((0, j)))
            .collect();
        self.intercept = *fitted.intercept().get((0, 0));
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if self.weights.is_empty() {
            return Err(PipelineError::NotFitted("logistic regression"));
        }
        if x.n_cols() != self.weights.len() {
            return Err(PipelineError::InvalidData(format!(
                "expected {} features, got {}",
                self.weights.len(),
                x.n_cols()
            )));
        }
        Ok(x
            .rows()
            .map(|row| {
                let z: f64 = row.iter().zip(&self.weights).map(|(v, w)| v * w).sum();
                sigmoid(z + self.intercept)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (FeatureMatrix, Vec<i32>) {
        let rows: Vec<Vec<f64>> = (0..40)
            .map(|i| vec![(i as f64 - 20.0) / 10.0, ((i * 3) % 4) as f64 / 4.0])
            .collect();
        let y = (0..40).map(|i| if i >= 20 { 1 } else { 0 }).collect();
        (FeatureMatrix::from_rows(rows).unwrap(), y)
    }

    #[test]
    fn positive_weight_on_the_informative_feature() {
        let (x, y) = data();
        let mut model = LogisticRegression::new(LogisticParams { c: 1.0 });
        model.fit(&x, &y).unwrap();
        assert!(model.weights()[0] > 0.0);

        let proba = model.predict_proba(&x).unwrap();
        assert!(proba[0] < 0.5);
        assert!(proba[39] > 0.5);
    }

    #[test]
    fn stronger_penalty_shrinks_weights() {
        let (x, y) = data();
        let mut loose = LogisticRegression::new(LogisticParams { c: 10.0 });
        let mut tight = LogisticRegression::new(LogisticParams { c: 0.01 });
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();
        assert!(tight.weights()[0].abs() < loose.weights()[0].abs());
    }

    #[test]
    fn unfitted_model_refuses_to_predict() {
        let (x, _) = data();
        let model = LogisticRegression::new(LogisticParams::default());
        assert!(matches!(model.predict_proba(&x), Err(PipelineError::NotFitted(_))));
    }
}
