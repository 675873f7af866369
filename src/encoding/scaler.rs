use num::Float;

use crate::error::{PipelineError, Result};
use crate::matrix::FeatureMatrix;

/// Population mean and standard deviation of a column.
pub fn mean_and_std<T: Float>(values: &[T]) -> Option<(T, T)> {
    if values.is_empty() {
        return None;
    }
    let n = T::from(values.len())?;
    let mean = values.iter().fold(T::zero(), |acc, &v| acc + v) / n;
    let var = values
        .iter()
        .fold(T::zero(), |acc, &v| acc + (v - mean) * (v - mean))
        / n;
    Some((mean, var.sqrt()))
}

/// Zero mean, unit variance per column, with statistics frozen at fit time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(&mut self, x: &FeatureMatrix) -> Result<()> {
        self.mean.clear();
        self.scale.clear();
        for j in 0..x.n_cols() {
            let column = x.column(j);
            let (mean, std) = mean_and_std(&column).ok_or_else(|| {
                PipelineError::InvalidData("cannot fit a scaler on zero rows".to_string())
            })?;
            self.mean.push(mean);
            // constant columns pass through centred but unscaled
            self.scale.push(if std > f64::EPSILON { std } else { 1.0 });
        }
        Ok(())
    }

    pub fn transform_row(&self, row: &mut [f64]) {
        for ((v, mean), scale) in row.iter_mut().zip(&self.mean).zip(&self.scale) {
            *v = (*v - mean) / scale;
        }
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }
}
