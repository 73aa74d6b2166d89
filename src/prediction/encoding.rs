use serde::{Deserialize, Serialize};

use crate::{Error, prediction::features::UNKNOWN_ZONE};

/// Maps zone identifiers to ordinal codes. The vocabulary is sorted so the
/// same training data always yields the same codes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ZoneEncoder {
    classes: Vec<String>,
}

impl ZoneEncoder {
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(String::from).collect();
        classes.sort_unstable();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// Zones never seen during fitting take the code of `"unknown"` when that
    /// was seen, otherwise one past the last code.
    pub fn transform(&self, value: &str) -> f64 {
        let code = match self.code(value) {
            Some(code) => code,
            None => self.code(UNKNOWN_ZONE).unwrap_or(self.classes.len()),
        };
        code as f64
    }

    fn code(&self, value: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .ok()
    }
}

/// Standardizes each column to zero mean and unit variance using the
/// population standard deviation. Constant columns keep a scale of 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit<R>(rows: &[R]) -> Result<Self, Error>
    where
        R: AsRef<[f64]>,
    {
        let width = rows
            .first()
            .map(|row| row.as_ref().len())
            .ok_or_else(|| Error::InsufficientData("cannot fit a scaler on zero rows".into()))?;
        if rows.iter().any(|row| row.as_ref().len() != width) {
            return Err(Error::InsufficientData("ragged rows passed to scaler".into()));
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; width];
        rows.iter().for_each(|row| {
            row.as_ref()
                .iter()
                .zip(mean.iter_mut())
                .for_each(|(value, sum)| *sum += value)
        });
        mean.iter_mut().for_each(|sum| *sum /= n);

        let mut variance = vec![0.0; width];
        rows.iter().for_each(|row| {
            row.as_ref()
                .iter()
                .zip(mean.iter())
                .zip(variance.iter_mut())
                .for_each(|((value, mean), sum)| *sum += (value - mean).powi(2))
        });
        let scale = variance
            .into_iter()
            .map(|sum| {
                let std = (sum / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Ok(Self { mean, scale })
    }

    pub fn width(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn transform_value(&self, column: usize, value: f64) -> f64 {
        (value - self.mean[column]) / self.scale[column]
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.mean.len() == self.scale.len() && self.scale.iter().all(|scale| *scale > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_sorts_and_dedups() {
        let encoder = ZoneEncoder::fit(["zone_b", "unknown", "zone_a", "zone_b"]);
        assert_eq!(encoder.classes(), ["unknown", "zone_a", "zone_b"]);
        assert_eq!(encoder.transform("zone_a"), 1.0);
        assert_eq!(encoder.transform("zone_b"), 2.0);
    }

    #[test]
    fn unseen_zone_uses_unknown_code() {
        let encoder = ZoneEncoder::fit(["zone_b", "unknown", "zone_a"]);
        assert_eq!(encoder.transform("zone_z"), 0.0);
    }

    #[test]
    fn unseen_zone_without_unknown_is_out_of_range() {
        let encoder = ZoneEncoder::fit(["zone_b", "zone_a"]);
        assert_eq!(encoder.transform("zone_z"), 2.0);
    }

    #[test]
    fn scaler_standardizes_columns() {
        let rows = [[1.0, 5.0], [3.0, 5.0], [5.0, 5.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        assert_eq!(scaler.mean(), [3.0, 5.0]);
        let std = (8.0f64 / 3.0).sqrt();
        assert!((scaler.scale()[0] - std).abs() < 1e-12);
        // Constant column keeps unit scale.
        assert_eq!(scaler.scale()[1], 1.0);
        assert!((scaler.transform_value(0, 5.0) - 2.0 / std).abs() < 1e-12);
        assert_eq!(scaler.transform_value(1, 5.0), 0.0);
    }

    #[test]
    fn scaling_is_stable() {
        let rows = [[6.0], [8.0], [17.0], [23.0]];
        let scaler = StandardScaler::fit(&rows).unwrap();
        let first = scaler.transform_value(0, 8.0);
        let second = scaler.transform_value(0, 8.0);
        assert_eq!(first.to_bits(), second.to_bits());
    }

    #[test]
    fn scaler_rejects_empty_input() {
        let rows: [[f64; 2]; 0] = [];
        assert!(matches!(
            StandardScaler::fit(&rows),
            Err(Error::InsufficientData(_))
        ));
    }
}
