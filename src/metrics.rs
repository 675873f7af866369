use std::fmt;

use log::{info, warn};
use smartcore::metrics::{accuracy, roc_auc_score};

use crate::dataset::Dataset;
use crate::encoding::Preprocessor;
use crate::error::{PipelineError, Result};
use crate::model::{Classifier, Pipeline};

#[derive(Debug, Clone, PartialEq)]
pub struct SplitScore {
    pub name: String,
    pub accuracy: f64,
    pub roc_auc: f64,
}

impl fmt::Display for SplitScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] Accuracy: {:.4} | ROC-AUC: {:.4}",
            self.name, self.accuracy, self.roc_auc
        )
    }
}

/// Accuracy at the 0.5 threshold and ROC-AUC of the positive-class probability.
pub fn score(name: &str, y_true: &[i32], proba: &[f64]) -> Result<SplitScore> {
    if y_true.len() != proba.len() || y_true.is_empty() {
        return Err(PipelineError::InvalidData(format!(
            "cannot score {} labels against {} probabilities",
            y_true.len(),
            proba.len()
        )));
    }
    let truth: Vec<i32> = y_true.to_vec();
    let predicted: Vec<i32> = proba.iter().map(|&p| (p > 0.5) as i32).collect();
    let acc = accuracy(&truth, &predicted);

    let positives = truth.iter().filter(|&&y| y == 1).count();
    let roc_auc = if positives == 0 || positives == truth.len() {
        warn!("[{}] only one class present, ROC-AUC undefined", name);
        f64::NAN
    } else {
        // smartcore only averages tied ranks correctly on ascending input
        let mut pairs: Vec<(f64, f64)> = proba
            .iter()
            .zip(&truth)
            .map(|(&p, &y)| (p, y as f64))
            .collect();
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));
        let (proba_v, truth_f): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        roc_auc_score(&truth_f, &proba_v)
    };

    let split = SplitScore {
        name: name.to_string(),
        accuracy: acc,
        roc_auc,
    };
    info!("{}", split);
    Ok(split)
}

pub fn evaluate<P: Preprocessor, M: Classifier>(
    model: &Pipeline<P, M>,
    split: &Dataset,
    name: &str,
) -> Result<SplitScore> {
    let proba = model.predict_proba(split)?;
    score(name, &split.labels, &proba)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMetrics {
    pub label: i32,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Per-class precision, recall and F1 for the two labels, with macro and weighted averages.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationReport {
    pub classes: Vec<ClassMetrics>,
    pub accuracy: f64,
    pub digits: usize,
}

impl ClassificationReport {
    pub fn new(y_true: &[i32], y_pred: &[i32]) -> Self {
        let classes = [0, 1]
            .iter()
            .map(|&label| {
                let tp = count(y_true, y_pred, |t, p| t == label && p == label);
                let predicted = y_pred.iter().filter(|&&p| p == label).count();
                let support = y_true.iter().filter(|&&t| t == label).count();
                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    label,
                    precision,
                    recall,
                    f1,
                    support,
                }
            })
            .collect();
        let correct = count(y_true, y_pred, |t, p| t == p);
        ClassificationReport {
            classes,
            accuracy: ratio(correct, y_true.len()),
            digits: 3,
        }
    }

    pub fn support(&self) -> usize {
        self.classes.iter().map(|c| c.support).sum()
    }

    pub fn macro_avg(&self) -> (f64, f64, f64) {
        let n = self.classes.len() as f64;
        let sum = self.classes.iter().fold((0.0, 0.0, 0.0), |acc, c| {
            (acc.0 + c.precision, acc.1 + c.recall, acc.2 + c.f1)
        });
        (sum.0 / n, sum.1 / n, sum.2 / n)
    }

    pub fn weighted_avg(&self) -> (f64, f64, f64) {
        let total = self.support().max(1) as f64;
        let sum = self.classes.iter().fold((0.0, 0.0, 0.0), |acc, c| {
            let w = c.support as f64;
            (acc.0 + w * c.precision, acc.1 + w * c.recall, acc.2 + w * c.f1)
        });
        (sum.0 / total, sum.1 / total, sum.2 / total)
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.digits;
        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &self.classes {
            writeln!(
                f,
                "{:>12} {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>12} {:>9} {:>9} {:>9.d$} {:>9}",
            "accuracy",
            "",
            "",
            self.accuracy,
            self.support()
        )?;
        for (name, (p, r, f1)) in [("macro avg", self.macro_avg()), ("weighted avg", self.weighted_avg())] {
            writeln!(
                f,
                "{:>12} {:>9.d$} {:>9.d$} {:>9.d$} {:>9}",
                name,
                p,
                r,
                f1,
                self.support()
            )?;
        }
        Ok(())
    }
}

fn count(y_true: &[i32], y_pred: &[i32], pred: impl Fn(i32, i32) -> bool) -> usize {
    y_true
        .iter()
        .zip(y_pred)
        .filter(|(&t, &p)| pred(t, p))
        .count()
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}
