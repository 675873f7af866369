//! Feature encoders fitted on the training split and replayed on every other split.
//!
//! [`ColumnTransformer`] drives the ensemble program (one-hot, passthrough,
//! interaction terms, standardization); [`LabelPreprocessor`] drives the single
//! boosted-tree program (first-seen integer ids, no scaling).

mod column_transformer;
mod label;
mod onehot;
mod poly;
mod scaler;

pub use column_transformer::ColumnTransformer;
pub use label::{LabelEncoder, LabelPreprocessor};
pub use onehot::OneHotEncoder;
pub use poly::InteractionFeatures;
pub use scaler::{mean_and_std, StandardScaler};

use crate::dataset::Dataset;
use crate::error::Result;
use crate::matrix::FeatureMatrix;

pub trait Preprocessor {
    fn fit(&mut self, data: &Dataset) -> Result<()>;

    fn transform(&self, data: &Dataset) -> Result<FeatureMatrix>;

    /// Output column names, in matrix order.
    fn feature_names(&self) -> Vec<String>;

    fn fit_transform(&mut self, data: &Dataset) -> Result<FeatureMatrix> {
        self.fit(data)?;
        self.transform(data)
    }
}
