use log::info;

use crate::error::{PipelineError, Result};
use crate::matrix::FeatureMatrix;
use crate::model::{Classifier, GradientBoostingClassifier, LogisticRegression, RandomForestClassifier};

#[derive(Debug, Clone)]
pub enum EnsembleMember {
    HistGb(GradientBoostingClassifier),
    Forest(RandomForestClassifier),
    Logistic(LogisticRegression),
}

impl EnsembleMember {
    fn as_classifier(&self) -> &dyn Classifier {
        match self {
            EnsembleMember::HistGb(m) => m,
            EnsembleMember::Forest(m) => m,
            EnsembleMember::Logistic(m) => m,
        }
    }

    fn as_classifier_mut(&mut self) -> &mut dyn Classifier {
        match self {
            EnsembleMember::HistGb(m) => m,
            EnsembleMember::Forest(m) => m,
            EnsembleMember::Logistic(m) => m,
        }
    }
}

/// Soft voting: the ensemble probability is the mean of the members' probabilities.
#[derive(Debug, Clone)]
pub struct SoftVotingClassifier {
    members: Vec<(String, EnsembleMember)>,
}

impl SoftVotingClassifier {
    pub fn new(members: Vec<(&str, EnsembleMember)>) -> Self {
        Self {
            members: members
                .into_iter()
                .map(|(name, member)| (name.to_string(), member))
                .collect(),
        }
    }

    pub fn member(&self, name: &str) -> Option<&EnsembleMember> {
        self.members
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, member)| member)
    }

    /// The fitted boosted-tree member registered under `name`.
    pub fn hist_gb(&self, name: &str) -> Result<&GradientBoostingClassifier> {
        match self.member(name) {
            Some(EnsembleMember::HistGb(model)) => Ok(model),
            _ => Err(PipelineError::Export(format!(
                "ensemble has no gradient boosting member named {:?}",
                name
            ))),
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.members.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// Per-member probabilities, in member order.
    pub fn member_probas(&self, x: &FeatureMatrix) -> Result<Vec<(String, Vec<f64>)>> {
        self.members
            .iter()
            .map(|(name, member)| Ok((name.clone(), member.as_classifier().predict_proba(x)?)))
            .collect()
    }
}

impl Classifier for SoftVotingClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[i32]) -> Result<()> {
        if self.members.is_empty() {
            return Err(PipelineError::Model("ensemble has no members".to_string()));
        }
        for (name, member) in self.members.iter_mut() {
            info!("Fitting ensemble member {}", name);
            member.as_classifier_mut().fit(x, y)?;
        }
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        let probas = self.member_probas(x)?;
        let n_members = probas.len() as f64;
        let mut mean = vec![0.0; x.n_rows()];
        for (_, proba) in &probas {
            for (acc, p) in mean.iter_mut().zip(proba) {
                *acc += p;
            }
        }
        Ok(mean.into_iter().map(|p| p / n_members).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ForestParams, GbdtParams, LogisticParams};

    fn data() -> (FeatureMatrix, Vec<i32>) {
        let rows: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![(i as f64 - 25.0) / 10.0, ((i * 7) % 9) as f64 / 9.0])
            .collect();
        let y = (0..50).map(|i| if i >= 25 { 1 } else { 0 }).collect();
        (FeatureMatrix::from_rows(rows).unwrap(), y)
    }

    fn ensemble() -> SoftVotingClassifier {
        SoftVotingClassifier::new(vec![
            (
                "hist_gb",
                EnsembleMember::HistGb(GradientBoostingClassifier::new(GbdtParams {
                    n_estimators: 10,
                    max_depth: 3,
                    ..Default::default()
                })),
            ),
            (
                "rf",
                EnsembleMember::Forest(RandomForestClassifier::new(ForestParams {
                    n_trees: 10,
                    max_depth: 4,
                    ..Default::default()
                })),
            ),
            ("lr", EnsembleMember::Logistic(LogisticRegression::new(LogisticParams::default()))),
        ])
    }

    #[test]
    fn probability_is_the_member_mean() {
        let (x, y) = data();
        let mut model = ensemble();
        model.fit(&x, &y).unwrap();

        let members = model.member_probas(&x).unwrap();
        let combined = model.predict_proba(&x).unwrap();
        for i in 0..x.n_rows() {
            let mean = members.iter().map(|(_, p)| p[i]).sum::<f64>() / 3.0;
            assert!((combined[i] - mean).abs() < 1e-12);
        }
    }

    #[test]
    fn boosted_member_can_be_extracted() {
        let (x, y) = data();
        let mut model = ensemble();
        model.fit(&x, &y).unwrap();
        assert_eq!(model.names(), vec!["hist_gb", "rf", "lr"]);
        let member = model.hist_gb("hist_gb").unwrap();
        assert_eq!(member.trees().len(), 10);
        assert!(model.hist_gb("rf").is_err());
    }
}
