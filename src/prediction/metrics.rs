//! Evaluation metrics for the crowd classifier.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Fraction of predictions equal to the truth. Empty input scores 0.
pub fn accuracy(truth: &[usize], predicted: &[usize]) -> f64 {
    if truth.is_empty() {
        return 0.0;
    }
    let correct = truth
        .iter()
        .zip(predicted.iter())
        .filter(|(t, p)| t == p)
        .count();
    correct as f64 / truth.len() as f64
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

/// Per-class precision/recall/F1 plus macro and support-weighted averages.
/// Undefined ratios (nothing predicted, nothing present) are reported as 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub classes: BTreeMap<String, ClassMetrics>,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

impl ClassificationReport {
    pub fn new(truth: &[usize], predicted: &[usize], class_names: &[String]) -> Self {
        let n_classes = class_names.len();
        let mut true_positive = vec![0usize; n_classes];
        let mut predicted_count = vec![0usize; n_classes];
        let mut support = vec![0usize; n_classes];
        for (t, p) in truth.iter().zip(predicted.iter()) {
            support[*t] += 1;
            predicted_count[*p] += 1;
            if t == p {
                true_positive[*t] += 1;
            }
        }

        let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };
        let per_class: Vec<ClassMetrics> = (0..n_classes)
            .map(|class| {
                let precision = ratio(true_positive[class], predicted_count[class]);
                let recall = ratio(true_positive[class], support[class]);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics {
                    precision,
                    recall,
                    f1_score,
                    support: support[class],
                }
            })
            .collect();

        let total: usize = support.iter().sum();
        let macro_avg = average(&per_class, |_| 1.0, n_classes as f64, total);
        let weighted_avg = average(&per_class, |m| m.support as f64, total as f64, total);

        Self {
            classes: class_names.iter().cloned().zip(per_class).collect(),
            accuracy: accuracy(truth, predicted),
            macro_avg,
            weighted_avg,
        }
    }
}

fn average<W>(metrics: &[ClassMetrics], weight: W, denominator: f64, support: usize) -> ClassMetrics
where
    W: Fn(&ClassMetrics) -> f64,
{
    if denominator <= 0.0 {
        return ClassMetrics {
            support,
            ..Default::default()
        };
    }
    let (precision, recall, f1_score) =
        metrics
            .iter()
            .fold((0.0, 0.0, 0.0), |(precision, recall, f1_score), m| {
                let w = weight(m);
                (
                    precision + w * m.precision,
                    recall + w * m.recall,
                    f1_score + w * m.f1_score,
                )
            });
    ClassMetrics {
        precision: precision / denominator,
        recall: recall / denominator,
        f1_score: f1_score / denominator,
        support,
    }
}

fn write_row(f: &mut fmt::Formatter<'_>, name: &str, m: &ClassMetrics) -> fmt::Result {
    writeln!(
        f,
        "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
        name, m.precision, m.recall, m.f1_score, m.support
    )
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (name, metrics) in &self.classes {
            write_row(f, name, metrics)?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        write_row(f, "macro avg", &self.macro_avg)?;
        write_row(f, "weighted avg", &self.weighted_avg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> Vec<String> {
        vec!["light".into(), "moderate".into(), "packed".into()]
    }

    #[test]
    fn accuracy_counts_matches() {
        assert_eq!(accuracy(&[0, 1, 2, 2], &[0, 1, 1, 2]), 0.75);
        assert_eq!(accuracy(&[], &[]), 0.0);
    }

    #[test]
    fn report_per_class() {
        let truth = [0, 0, 1, 1, 2, 2];
        let predicted = [0, 1, 1, 1, 2, 0];
        let report = ClassificationReport::new(&truth, &predicted, &names());

        let light = report.classes["light"];
        assert_eq!(light.precision, 0.5);
        assert_eq!(light.recall, 0.5);
        assert_eq!(light.support, 2);

        let moderate = report.classes["moderate"];
        assert!((moderate.precision - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(moderate.recall, 1.0);
        assert!((moderate.f1_score - 0.8).abs() < 1e-12);

        let packed = report.classes["packed"];
        assert_eq!(packed.precision, 1.0);
        assert_eq!(packed.recall, 0.5);

        assert!((report.accuracy - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(report.macro_avg.support, 6);
        // Equal supports make both averages agree.
        assert!((report.macro_avg.f1_score - report.weighted_avg.f1_score).abs() < 1e-12);
    }

    #[test]
    fn never_predicted_class_scores_zero() {
        let report = ClassificationReport::new(&[0, 2], &[0, 0], &names());
        assert_eq!(report.classes["packed"].precision, 0.0);
        assert_eq!(report.classes["packed"].f1_score, 0.0);
        assert_eq!(report.classes["moderate"].support, 0);
    }

    #[test]
    fn report_renders_every_class() {
        let report = ClassificationReport::new(&[0, 1, 2], &[0, 1, 2], &names());
        let text = report.to_string();
        assert!(text.contains("light"));
        assert!(text.contains("weighted avg"));
    }
}
