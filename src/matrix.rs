use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{PipelineError, Result};

/// Row-major feature matrix produced by the encoders.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_rows: usize,
    n_cols: usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    pub fn new(n_rows: usize, n_cols: usize, values: Vec<f64>) -> Result<Self> {
        if values.len() != n_rows * n_cols {
            return Err(PipelineError::InvalidData(format!(
                "matrix of {}x{} needs {} values, got {}",
                n_rows,
                n_cols,
                n_rows * n_cols,
                values.len()
            )));
        }
        Ok(FeatureMatrix {
            n_rows,
            n_cols,
            values,
        })
    }

    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self> {
        let n_rows = rows.len();
        let n_cols = rows.first().map_or(0, Vec::len);
        let mut values = Vec::with_capacity(n_rows * n_cols);
        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != n_cols {
                return Err(PipelineError::InvalidData(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    n_cols
                )));
            }
            values.extend(row);
        }
        Ok(FeatureMatrix {
            n_rows,
            n_cols,
            values,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.n_cols
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.values[i * self.n_cols..(i + 1) * self.n_cols]
    }

    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.values[row * self.n_cols + col]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    pub fn column(&self, col: usize) -> Vec<f64> {
        self.rows().map(|row| row[col]).collect()
    }

    /// Copy into the smartcore matrix type.
    pub fn to_dense(&self) -> DenseMatrix<f64> {
        DenseMatrix::new(self.n_rows, self.n_cols, self.values.clone(), false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_and_columns_line_up() {
        let m = FeatureMatrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]]).unwrap();
        assert_eq!(m.n_rows(), 3);
        assert_eq!(m.n_cols(), 2);
        assert_eq!(m.row(1), &[3.0, 4.0]);
        assert_eq!(m.column(1), vec![2.0, 4.0, 6.0]);
        assert_eq!(m.get(2, 0), 5.0);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        assert!(FeatureMatrix::from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
        assert!(FeatureMatrix::new(2, 2, vec![0.0; 3]).is_err());
    }
}
