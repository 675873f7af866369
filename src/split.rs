use std::collections::BTreeMap;

use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::dataset::Dataset;
use crate::error::{PipelineError, Result};

/// Stratified split of row indices: each class sends `round(n_class * test_fraction)`
/// of its rows to the test side. Both index lists come back in ascending order.
pub fn stratified_split(
    labels: &[i32],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if !(0.0..1.0).contains(&test_fraction) || test_fraction == 0.0 {
        return Err(PipelineError::InvalidData(format!(
            "test fraction {} outside (0, 1)",
            test_fraction
        )));
    }

    let mut by_class: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
    for (i, &label) in labels.iter().enumerate() {
        by_class.entry(label).or_default().push(i);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(labels.len());
    let mut test = Vec::new();
    for (_, mut rows) in by_class {
        rows.shuffle(&mut rng);
        let n_test = (rows.len() as f64 * test_fraction).round() as usize;
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }

    if train.is_empty() || test.is_empty() {
        return Err(PipelineError::InvalidData(format!(
            "cannot split {} rows with test fraction {}",
            labels.len(),
            test_fraction
        )));
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

pub fn train_test(data: &Dataset, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
    let (train, test) = stratified_split(&data.labels, test_fraction, seed)?;
    Ok((data.select(&train), data.select(&test)))
}

/// 60/20/20: a 60/40 split, then the 40% halved into validation and test.
pub fn train_val_test(data: &Dataset, seed: u64) -> Result<(Dataset, Dataset, Dataset)> {
    let (train, rest) = train_test(data, 0.4, seed)?;
    let (val, test) = train_test(&rest, 0.5, seed)?;
    info!(
        "Split {} rows into train={} val={} test={}",
        data.len(),
        train.len(),
        val.len(),
        test.len()
    );
    Ok((train, val, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{Column, ColumnData};
    use crate::records::ColumnKind;

    fn labels(n: usize, positive_every: usize) -> Vec<i32> {
        (0..n).map(|i| (i % positive_every == 0) as i32).collect()
    }

    fn positive_rate(rows: &[usize], labels: &[i32]) -> f64 {
        rows.iter().filter(|&&i| labels[i] == 1).count() as f64 / rows.len() as f64
    }

    #[test]
    fn class_proportions_survive() {
        let y = labels(300, 3);
        let (train, test) = stratified_split(&y, 0.2, 42).unwrap();
        assert_eq!(train.len() + test.len(), 300);
        assert_eq!(test.len(), 60);
        let overall = positive_rate(&(0..300).collect::<Vec<_>>(), &y);
        assert!((positive_rate(&train, &y) - overall).abs() < 0.01);
        assert!((positive_rate(&test, &y) - overall).abs() < 0.01);
    }

    #[test]
    fn fixed_seed_is_reproducible() {
        let y = labels(200, 2);
        assert_eq!(
            stratified_split(&y, 0.4, 42).unwrap(),
            stratified_split(&y, 0.4, 42).unwrap()
        );
        assert_ne!(
            stratified_split(&y, 0.4, 42).unwrap(),
            stratified_split(&y, 0.4, 7).unwrap()
        );
    }

    #[test]
    fn sides_are_disjoint() {
        let y = labels(101, 4);
        let (train, test) = stratified_split(&y, 0.25, 42).unwrap();
        assert!(train.iter().all(|i| !test.contains(i)));
    }

    #[test]
    fn three_way_split_is_sixty_twenty_twenty() {
        let y = labels(500, 2);
        let data = Dataset {
            columns: vec![Column {
                name: "row".into(),
                kind: ColumnKind::Numeric,
                data: ColumnData::Numeric((0..500).map(|i| i as f64).collect()),
            }],
            labels: y,
        };
        let (train, val, test) = train_val_test(&data, 42).unwrap();
        assert_eq!((train.len(), val.len(), test.len()), (300, 100, 100));
        for part in [&train, &val, &test] {
            let (neg, pos) = part.class_counts();
            assert!((pos as f64 / (neg + pos) as f64 - 0.5).abs() < 0.02);
        }
    }

    #[test]
    fn degenerate_fractions_are_rejected() {
        let y = labels(10, 2);
        assert!(stratified_split(&y, 0.0, 42).is_err());
        assert!(stratified_split(&y, 1.0, 42).is_err());
        assert!(stratified_split(&[1], 0.2, 42).is_err());
    }
}
