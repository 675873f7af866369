use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{PipelineError, Result};
use crate::matrix::FeatureMatrix;
use crate::model::gbdt::check_training_set;
use crate::model::{Classifier, Node, Tree};

#[derive(Debug, Clone, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features tried per split; `None` means the square root of the feature count.
    pub max_features: Option<usize>,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: usize::MAX,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: None,
            seed: 42,
        }
    }
}

/// Bagged gini trees; a leaf stores the positive fraction of its bootstrap rows.
#[derive(Debug, Clone)]
pub struct RandomForestClassifier {
    params: ForestParams,
    trees: Vec<Tree>,
    n_features: usize,
}

impl RandomForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            trees: Vec::new(),
            n_features: 0,
        }
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }
}

impl Classifier for RandomForestClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[i32]) -> Result<()> {
        check_training_set(x, y)?;
        let n = x.n_rows();
        let max_features = self
            .params
            .max_features
            .unwrap_or_else(|| (x.n_cols() as f64).sqrt() as usize)
            .clamp(1, x.n_cols().max(1));

        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let builder = CartBuilder {
            x,
            y,
            params: &self.params,
            max_features,
        };
        let mut trees = Vec::with_capacity(self.params.n_trees);
        for _ in 0..self.params.n_trees {
            let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            let mut nodes = Vec::new();
            builder.build_node(&rows, 0, &mut nodes, &mut rng);
            trees.push(Tree { nodes });
        }
        self.trees = trees;
        self.n_features = x.n_cols();
        Ok(())
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(PipelineError::NotFitted("random forest"));
        }
        if x.n_cols() != self.n_features {
            return Err(PipelineError::InvalidData(format!(
                "expected {} features, got {}",
                self.n_features,
                x.n_cols()
            )));
        }
        let n_trees = self.trees.len() as f64;
        Ok(x
            .rows()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }
}

struct CartBuilder<'a> {
    x: &'a FeatureMatrix,
    y: &'a [i32],
    params: &'a ForestParams,
    max_features: usize,
}

struct GiniSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl<'a> CartBuilder<'a> {
    /// Push the subtree for `rows` and return its root index.
    fn build_node(
        &self,
        rows: &[usize],
        depth: usize,
        nodes: &mut Vec<Node>,
        rng: &mut StdRng,
    ) -> usize {
        let current = nodes.len();
        let positives = rows.iter().filter(|&&r| self.y[r] == 1).count();
        let fraction = positives as f64 / rows.len().max(1) as f64;

        let pure = positives == 0 || positives == rows.len();
        if pure || depth >= self.params.max_depth || rows.len() < self.params.min_samples_split {
            nodes.push(Node::leaf(fraction));
            return current;
        }

        let Some(split) = self.find_best_split(rows, positives, rng) else {
            nodes.push(Node::leaf(fraction));
            return current;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = rows
            .iter()
            .copied()
            .partition(|&r| self.x.get(r, split.feature) <= split.threshold);

        nodes.push(Node {
            feature: split.feature,
            threshold: split.threshold,
            left: 0,
            right: 0,
            value: None,
        });
        let left_idx = self.build_node(&left, depth + 1, nodes, rng);
        let right_idx = self.build_node(&right, depth + 1, nodes, rng);
        nodes[current].left = left_idx;
        nodes[current].right = right_idx;
        current
    }

    fn find_best_split(
        &self,
        rows: &[usize],
        positives: usize,
        rng: &mut StdRng,
    ) -> Option<GiniSplit> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent = gini(positives, n);
        let mut best: Option<GiniSplit> = None;

        let mut features = rand::seq::index::sample(rng, self.x.n_cols(), self.max_features).into_vec();
        features.sort_unstable();

        for feature in features {
            let mut column: Vec<(f64, i32)> = rows
                .iter()
                .map(|&r| (self.x.get(r, feature), self.y[r]))
                .collect();
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_pos = 0;
            for i in 1..n {
                left_pos += column[i - 1].1 as usize;
                if column[i - 1].0 == column[i].0 || i < min_leaf || n - i < min_leaf {
                    continue;
                }
                let right_pos = positives - left_pos;
                let impurity = (i as f64 * gini(left_pos, i)
                    + (n - i) as f64 * gini(right_pos, n - i))
                    / n as f64;
                if impurity < parent - 1e-12 && best.as_ref().map_or(true, |b| impurity < b.impurity) {
                    best = Some(GiniSplit {
                        feature,
                        threshold: column[i - 1].0 + (column[i].0 - column[i - 1].0) / 2.0,
                        impurity,
                    });
                }
            }
        }
        best
    }
}

fn gini(positives: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let p = positives as f64 / n as f64;
    1.0 - p * p - (1.0 - p) * (1.0 - p)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (FeatureMatrix, Vec<i32>) {
        let rows: Vec<Vec<f64>> = (0..60)
            .map(|i| vec![(i % 7) as f64, i as f64, ((i * 13) % 11) as f64])
            .collect();
        let y = (0..60).map(|i| if i >= 30 { 1 } else { 0 }).collect();
        (FeatureMatrix::from_rows(rows).unwrap(), y)
    }

    fn params() -> ForestParams {
        ForestParams {
            n_trees: 25,
            max_depth: 5,
            min_samples_split: 4,
            min_samples_leaf: 2,
            max_features: Some(2),
            seed: 42,
        }
    }

    #[test]
    fn probabilities_are_fractions_and_rank_classes() {
        let (x, y) = data();
        let mut forest = RandomForestClassifier::new(params());
        forest.fit(&x, &y).unwrap();
        let proba = forest.predict_proba(&x).unwrap();
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));
        let accuracy = forest
            .predict(&x)
            .unwrap()
            .iter()
            .zip(&y)
            .filter(|(a, b)| a == b)
            .count() as f64
            / y.len() as f64;
        assert!(accuracy > 0.9, "accuracy {}", accuracy);
    }

    #[test]
    fn trees_respect_depth_and_seed() {
        let (x, y) = data();
        let mut a = RandomForestClassifier::new(params());
        let mut b = RandomForestClassifier::new(params());
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a.trees().len(), 25);
        assert!(a.trees().iter().all(|t| t.depth() <= 5));
        assert_eq!(a.trees(), b.trees());
    }

    #[test]
    fn gini_of_pure_and_even_nodes() {
        assert_eq!(gini(0, 10), 0.0);
        assert_eq!(gini(10, 10), 0.0);
        assert_eq!(gini(5, 10), 0.5);
    }
}
