//! Histogram gradient boosting for binary log-loss.
//!
//! Features are bucketed once with [`BinMapper`]; each round fits a tree to the
//! first and second derivatives of the loss, growing best-first until the depth
//! or leaf budget runs out. Leaf values are `-G / (H + lambda)` scaled by the
//! learning rate. All randomness (row and column sampling) comes from one
//! seeded generator, so a fixed seed reproduces the same model.

use log::{debug, info};
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::error::{PipelineError, Result};
use crate::matrix::FeatureMatrix;
use crate::model::{log_loss, sigmoid, BinMapper, Classifier, Node, Tree};

#[derive(Debug, Clone, PartialEq)]
pub struct GbdtParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub max_leaf_nodes: Option<usize>,
    pub min_samples_leaf: usize,
    pub min_child_weight: f64,
    pub l2_regularization: f64,
    pub subsample: f64,
    pub colsample_bytree: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 6,
            max_leaf_nodes: None,
            min_samples_leaf: 1,
            min_child_weight: 1e-3,
            l2_regularization: 0.0,
            subsample: 1.0,
            colsample_bytree: 1.0,
            max_bins: 255,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GradientBoostingClassifier {
    params: GbdtParams,
    base_score: f64,
    trees: Vec<Tree>,
    gains: Vec<f64>,
    n_features: usize,
}

impl GradientBoostingClassifier {
    pub fn new(params: GbdtParams) -> Self {
        Self {
            params,
            base_score: 0.0,
            trees: Vec::new(),
            gains: Vec::new(),
            n_features: 0,
        }
    }

    pub fn params(&self) -> &GbdtParams {
        &self.params
    }

    /// Raw score every prediction starts from (log-odds of the training positive rate).
    pub fn base_score(&self) -> f64 {
        self.base_score
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Fit, reporting log-loss on `eval` while training. The eval set never stops training.
    pub fn fit_with_eval(
        &mut self,
        x: &FeatureMatrix,
        y: &[i32],
        eval: Option<(&FeatureMatrix, &[i32])>,
    ) -> Result<()> {
        check_training_set(x, y)?;
        if let Some((xv, yv)) = eval {
            if xv.n_cols() != x.n_cols() || xv.n_rows() != yv.len() {
                return Err(PipelineError::InvalidData(format!(
                    "eval set is {}x{} with {} labels, training width is {}",
                    xv.n_rows(),
                    xv.n_cols(),
                    yv.len(),
                    x.n_cols()
                )));
            }
        }
        let n = x.n_rows();
        let positives = y.iter().filter(|&&label| label == 1).count();

        let mapper = BinMapper::fit(x, self.params.max_bins);
        let codes = mapper.transform(x);
        let rate = (positives as f64 / n as f64).clamp(1e-15, 1.0 - 1e-15);

        self.base_score = (rate / (1.0 - rate)).ln();
        self.n_features = x.n_cols();
        self.trees = Vec::with_capacity(self.params.n_estimators);
        self.gains = vec![0.0; x.n_cols()];

        let mut raw = vec![self.base_score; n];
        let mut eval_raw = eval.map(|(xv, _)| vec![self.base_score; xv.n_rows()]);
        let mut rng = StdRng::seed_from_u64(self.params.seed);
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];

        for round in 0..self.params.n_estimators {
            for i in 0..n {
                let p = sigmoid(raw[i]);
                grad[i] = p - y[i] as f64;
                hess[i] = (p * (1.0 - p)).max(1e-16);
            }

            let rows = sample(&mut rng, n, self.params.subsample);
            let features = sample(&mut rng, x.n_cols(), self.params.colsample_bytree);
            let grower = Grower {
                codes: &codes,
                mapper: &mapper,
                grad: &grad,
                hess: &hess,
                features: &features,
                params: &self.params,
            };
            let tree = grower.grow(rows, &mut self.gains);

            for (i, row) in x.rows().enumerate() {
                raw[i] += tree.predict_row(row);
            }
            if let (Some((xv, yv)), Some(scores)) = (eval, eval_raw.as_mut()) {
                for (i, row) in xv.rows().enumerate() {
                    scores[i] += tree.predict_row(row);
                }
                let round = round + 1;
                if round % 10 == 0 || round == self.params.n_estimators {
                    let proba: Vec<f64> = scores.iter().map(|&s| sigmoid(s)).collect();
                    debug!("[{}] validation-logloss: {:.5}", round, log_loss(yv, &proba));
                }
            }
            self.trees.push(tree);
        }

        let train_proba: Vec<f64> = raw.iter().map(|&s| sigmoid(s)).collect();
        info!(
            "Boosted {} trees over {} features, train log-loss {:.5}",
            self.trees.len(),
            self.n_features,
            log_loss(y, &train_proba)
        );
        Ok(())
    }

    /// Sum of raw scores before the logistic link.
    pub fn decision_function(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        if !self.is_fitted() {
            return Err(PipelineError::NotFitted("gradient boosting classifier"));
        }
        if x.n_cols() != self.n_features {
            return Err(PipelineError::InvalidData(format!(
                "expected {} features, got {}",
                self.n_features,
                x.n_cols()
            )));
        }
        Ok(x
            .rows()
            .map(|row| {
                self.base_score + self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
            })
            .collect())
    }

    /// Total split gain per feature, normalized to sum to one.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.gains.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.gains.len()];
        }
        self.gains.iter().map(|g| g / total).collect()
    }
}

impl Classifier for GradientBoostingClassifier {
    fn fit(&mut self, x: &FeatureMatrix, y: &[i32]) -> Result<()> {
        self.fit_with_eval(x, y, None)
    }

    fn predict_proba(&self, x: &FeatureMatrix) -> Result<Vec<f64>> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(sigmoid)
            .collect())
    }
}

pub(crate) fn check_training_set(x: &FeatureMatrix, y: &[i32]) -> Result<()> {
    if x.n_rows() != y.len() {
        return Err(PipelineError::InvalidData(format!(
            "{} rows but {} labels",
            x.n_rows(),
            y.len()
        )));
    }
    let positives = y.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == y.len() {
        return Err(PipelineError::InvalidData(
            "training labels contain a single class".to_string(),
        ));
    }
    Ok(())
}

/// Sorted sample of `fraction * n` indices, or all of them when the fraction is 1.
fn sample(rng: &mut StdRng, n: usize, fraction: f64) -> Vec<usize> {
    if fraction >= 1.0 {
        return (0..n).collect();
    }
    let k = ((n as f64 * fraction).round() as usize).clamp(1, n);
    let mut picked = rand::seq::index::sample(rng, n, k).into_vec();
    picked.sort_unstable();
    picked
}

struct Split {
    feature: usize,
    bin: usize,
    gain: f64,
}

struct OpenLeaf {
    node: usize,
    rows: Vec<usize>,
    depth: usize,
    split: Option<Split>,
}

struct Grower<'a> {
    codes: &'a [Vec<u8>],
    mapper: &'a BinMapper,
    grad: &'a [f64],
    hess: &'a [f64],
    features: &'a [usize],
    params: &'a GbdtParams,
}

impl<'a> Grower<'a> {
    fn grow(&self, rows: Vec<usize>, gains: &mut [f64]) -> Tree {
        let (g, h) = self.sums(&rows);
        let mut nodes = vec![Node::leaf(self.leaf_value(g, h))];
        let split = self.best_split(&rows, 0);
        let mut open = vec![OpenLeaf {
            node: 0,
            rows,
            depth: 0,
            split,
        }];
        let mut n_leaves = 1;

        loop {
            if self.params.max_leaf_nodes.map_or(false, |max| n_leaves >= max) {
                break;
            }
            let mut pick: Option<(usize, f64)> = None;
            for (i, leaf) in open.iter().enumerate() {
                if let Some(split) = &leaf.split {
                    if pick.map_or(true, |(_, best)| split.gain > best) {
                        pick = Some((i, split.gain));
                    }
                }
            }
            let Some((i, _)) = pick else {
                break;
            };
            let leaf = open.remove(i);
            let Some(split) = leaf.split else {
                break;
            };

            let codes = &self.codes[split.feature];
            let (left, right): (Vec<usize>, Vec<usize>) = leaf
                .rows
                .iter()
                .copied()
                .partition(|&r| (codes[r] as usize) <= split.bin);
            gains[split.feature] += split.gain;

            let left_idx = nodes.len();
            let right_idx = left_idx + 1;
            for child in [&left, &right] {
                let (g, h) = self.sums(child);
                nodes.push(Node::leaf(self.leaf_value(g, h)));
            }
            nodes[leaf.node] = Node {
                feature: split.feature,
                threshold: self.mapper.threshold(split.feature, split.bin),
                left: left_idx,
                right: right_idx,
                value: None,
            };
            n_leaves += 1;

            let depth = leaf.depth + 1;
            for (node, rows) in [(left_idx, left), (right_idx, right)] {
                let split = self.best_split(&rows, depth);
                open.push(OpenLeaf {
                    node,
                    rows,
                    depth,
                    split,
                });
            }
        }

        Tree { nodes }
    }

    fn sums(&self, rows: &[usize]) -> (f64, f64) {
        rows.iter()
            .fold((0.0, 0.0), |(g, h), &r| (g + self.grad[r], h + self.hess[r]))
    }

    fn leaf_value(&self, g: f64, h: f64) -> f64 {
        -g / (h + self.params.l2_regularization) * self.params.learning_rate
    }

    fn score(&self, g: f64, h: f64) -> f64 {
        g * g / (h + self.params.l2_regularization)
    }

    fn best_split(&self, rows: &[usize], depth: usize) -> Option<Split> {
        let min_leaf = self.params.min_samples_leaf.max(1);
        if depth >= self.params.max_depth || rows.len() < 2 * min_leaf {
            return None;
        }
        let (g_total, h_total) = self.sums(rows);
        let parent = self.score(g_total, h_total);
        let mut best: Option<Split> = None;

        for &feature in self.features {
            let n_bins = self.mapper.n_bins(feature);
            if n_bins < 2 {
                continue;
            }
            let codes = &self.codes[feature];
            let mut hist = vec![(0.0f64, 0.0f64, 0usize); n_bins];
            for &r in rows {
                let slot = &mut hist[codes[r] as usize];
                slot.0 += self.grad[r];
                slot.1 += self.hess[r];
                slot.2 += 1;
            }

            let (mut g_left, mut h_left, mut n_left) = (0.0, 0.0, 0usize);
            for (bin, &(g, h, count)) in hist.iter().enumerate().take(n_bins - 1) {
                g_left += g;
                h_left += h;
                n_left += count;
                let n_right = rows.len() - n_left;
                let (g_right, h_right) = (g_total - g_left, h_total - h_left);
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }
                if h_left < self.params.min_child_weight || h_right < self.params.min_child_weight {
                    continue;
                }
                let gain = self.score(g_left, h_left) + self.score(g_right, h_right) - parent;
                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(Split { feature, bin, gain });
                }
            }
        }
        best
    }
}
