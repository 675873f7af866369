use crate::dataset::Dataset;
use crate::encoding::Preprocessor;
use crate::error::Result;
use crate::model::Classifier;

/// A fitted preprocessor followed by a classifier, applied to raw datasets.
#[derive(Debug, Clone)]
pub struct Pipeline<P, M> {
    pub pre: P,
    pub clf: M,
}

impl<P: Preprocessor, M: Classifier> Pipeline<P, M> {
    pub fn new(pre: P, clf: M) -> Self {
        Pipeline { pre, clf }
    }

    pub fn fit(&mut self, data: &Dataset) -> Result<()> {
        let x = self.pre.fit_transform(data)?;
        self.clf.fit(&x, &data.labels)
    }

    pub fn predict_proba(&self, data: &Dataset) -> Result<Vec<f64>> {
        let x = self.pre.transform(data)?;
        self.clf.predict_proba(&x)
    }

    pub fn predict(&self, data: &Dataset) -> Result<Vec<i32>> {
        let x = self.pre.transform(data)?;
        self.clf.predict(&x)
    }
}
