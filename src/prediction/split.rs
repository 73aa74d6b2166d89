use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;

use crate::Error;

/// Share of rows held out for evaluation.
pub const TEST_RATIO: f64 = 0.2;
pub const SPLIT_SEED: u64 = 42;

/// Row indices of the training and evaluation partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Splits rows so every class appears in both partitions, roughly in
/// proportion to its share of `labels`.
///
/// Fails with [`Error::InsufficientData`] when fewer than two classes are
/// present or a class has fewer than two rows.
pub fn stratified_split(
    labels: &[usize],
    n_classes: usize,
    test_ratio: f64,
    seed: u64,
) -> Result<Split, Error> {
    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, label) in labels.iter().enumerate() {
        let rows = by_class.get_mut(*label).ok_or_else(|| {
            Error::InsufficientData(format!("label {label} out of range for {n_classes} classes"))
        })?;
        rows.push(row);
    }

    let present = by_class.iter().filter(|rows| !rows.is_empty()).count();
    if present < 2 {
        return Err(Error::InsufficientData(format!(
            "at least two crowd levels are needed to train, found {present}"
        )));
    }
    if let Some((label, rows)) = by_class
        .iter()
        .enumerate()
        .find(|(_, rows)| rows.len() == 1)
    {
        return Err(Error::InsufficientData(format!(
            "crowd level {label} has {} observation, at least 2 are needed to stratify",
            rows.len()
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(labels.len()),
        test: Vec::new(),
    };
    for mut rows in by_class.into_iter().filter(|rows| !rows.is_empty()) {
        rows.shuffle(&mut rng);
        let n_test = ((rows.len() as f64 * test_ratio).round() as usize).clamp(1, rows.len() - 1);
        split.test.extend_from_slice(&rows[..n_test]);
        split.train.extend_from_slice(&rows[n_test..]);
    }
    split.train.shuffle(&mut rng);
    split.test.shuffle(&mut rng);
    Ok(split)
}
