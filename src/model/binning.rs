use crate::matrix::FeatureMatrix;

/// Histogram bin edges per feature.
///
/// `bin(x) <= b` holds exactly when `x <= thresholds[b]`, so a split found on
/// bins can be written back as a plain threshold on the raw value.
#[derive(Debug, Clone, PartialEq)]
pub struct BinMapper {
    thresholds: Vec<Vec<f64>>,
}

impl BinMapper {
    pub fn fit(x: &FeatureMatrix, max_bins: usize) -> Self {
        let max_bins = max_bins.clamp(2, 256);
        let thresholds = (0..x.n_cols())
            .map(|j| {
                let mut values = x.column(j);
                values.sort_by(f64::total_cmp);
                edges(&values, max_bins)
            })
            .collect();
        BinMapper { thresholds }
    }

    pub fn n_bins(&self, feature: usize) -> usize {
        self.thresholds[feature].len() + 1
    }

    pub fn threshold(&self, feature: usize, bin: usize) -> f64 {
        self.thresholds[feature][bin]
    }

    pub fn bin(&self, feature: usize, value: f64) -> u8 {
        self.thresholds[feature].partition_point(|t| *t < value) as u8
    }

    /// Column-major bin codes: `codes[feature][row]`.
    pub fn transform(&self, x: &FeatureMatrix) -> Vec<Vec<u8>> {
        (0..x.n_cols())
            .map(|j| x.rows().map(|row| self.bin(j, row[j])).collect())
            .collect()
    }
}

/// Midpoints between distinct values, or between quantiles when there are
/// more distinct values than bins.
fn edges(sorted: &[f64], max_bins: usize) -> Vec<f64> {
    let mut distinct: Vec<f64> = sorted.to_vec();
    distinct.dedup();

    let cut_points: Vec<f64> = if distinct.len() <= max_bins {
        distinct
    } else {
        let n = sorted.len();
        let mut picks: Vec<f64> = (0..max_bins)
            .map(|k| sorted[(k * (n - 1)) / (max_bins - 1)])
            .collect();
        picks.dedup();
        picks
    };

    cut_points
        .windows(2)
        .map(|pair| pair[0] + (pair[1] - pair[0]) / 2.0)
        .collect()
}
