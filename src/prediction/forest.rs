//! Random forest of CART classification trees split on Gini impurity.
//!
//! Every tree draws a bootstrap sample and a random feature subset per split
//! from its own seeded RNG, so fitting in parallel is still reproducible.

use rand::{Rng, SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MaxFeatures {
    /// Square root of the feature count, rounded down, at least 1.
    Sqrt,
    All,
    Count(usize),
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        let count = match self {
            MaxFeatures::Sqrt => (n_features as f64).sqrt() as usize,
            MaxFeatures::All => n_features,
            MaxFeatures::Count(count) => *count,
        };
        count.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: None,
            min_samples_split: 2,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Leaf {
        /// Class probabilities, sums to 1.
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        /// Rows with `value <= threshold` go left.
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub fn predict_proba(&self, row: &[f64]) -> &[f64] {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn depth(&self) -> usize {
        fn depth_from(nodes: &[Node], index: usize) -> usize {
            match &nodes[index] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => {
                    1 + depth_from(nodes, *left).max(depth_from(nodes, *right))
                }
            }
        }
        depth_from(&self.nodes, 0)
    }

    /// Every child sits after its parent and inside the tree, so walking from
    /// the root always reaches a leaf. Every leaf has `n_classes` entries.
    fn is_consistent(&self, n_classes: usize, n_features: usize) -> bool {
        let len = self.nodes.len();
        len > 0
            && self.nodes.iter().enumerate().all(|(index, node)| match node {
                Node::Leaf { distribution } => distribution.len() == n_classes,
                Node::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    *feature < n_features
                        && (index + 1..len).contains(left)
                        && (index + 1..len).contains(right)
                }
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fits `config.n_estimators` trees on rows `x` with class indices `y`.
    pub fn fit<R>(config: &ForestConfig, x: &[R], y: &[usize], n_classes: usize) -> Result<Self, Error>
    where
        R: AsRef<[f64]> + Sync,
    {
        if x.is_empty() || x.len() != y.len() {
            return Err(Error::InsufficientData(format!(
                "forest needs matching non-empty rows and labels, got {} rows and {} labels",
                x.len(),
                y.len()
            )));
        }
        if config.n_estimators == 0 {
            return Err(Error::InsufficientData("forest needs at least one tree".into()));
        }
        if let Some(label) = y.iter().find(|label| **label >= n_classes) {
            return Err(Error::InsufficientData(format!(
                "label {label} out of range for {n_classes} classes"
            )));
        }
        let n_features = x[0].as_ref().len();

        let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
        let seeds: Vec<u64> = (0..config.n_estimators).map(|_| rng.r#gen()).collect();
        let trees = seeds
            .into_par_iter()
            .map(|seed| {
                let mut rng = ChaCha8Rng::seed_from_u64(seed);
                let samples: Vec<usize> = if config.bootstrap {
                    (0..x.len()).map(|_| rng.gen_range(0..x.len())).collect()
                } else {
                    (0..x.len()).collect()
                };
                TreeBuilder {
                    config,
                    x,
                    y,
                    n_classes,
                    n_features,
                    max_features: config.max_features.resolve(n_features),
                    nodes: Vec::new(),
                }
                .build(samples, &mut rng)
            })
            .collect();

        Ok(Self {
            n_classes,
            n_features,
            trees,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Mean of the per-tree leaf distributions.
    pub fn predict_proba(&self, row: &[f64]) -> Vec<f64> {
        let mut probabilities = vec![0.0; self.n_classes];
        if self.trees.is_empty() {
            return probabilities;
        }
        self.trees.iter().for_each(|tree| {
            tree.predict_proba(row)
                .iter()
                .zip(probabilities.iter_mut())
                .for_each(|(p, sum)| *sum += p)
        });
        let n = self.trees.len() as f64;
        probabilities.iter_mut().for_each(|p| *p /= n);
        probabilities
    }

    /// Most probable class and its probability. Ties go to the lower class index.
    pub fn predict(&self, row: &[f64]) -> (usize, f64) {
        argmax(&self.predict_proba(row))
    }

    pub(crate) fn is_consistent(&self) -> bool {
        self.n_classes > 0
            && !self.trees.is_empty()
            && self
                .trees
                .iter()
                .all(|tree| tree.is_consistent(self.n_classes, self.n_features))
    }
}

pub(crate) fn argmax(values: &[f64]) -> (usize, f64) {
    values
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, (index, value)| {
            if value > best.1 { (index, value) } else { best }
        })
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|count| (*count as f64 / total).powi(2))
        .sum::<f64>()
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

struct TreeBuilder<'a, R> {
    config: &'a ForestConfig,
    x: &'a [R],
    y: &'a [usize],
    n_classes: usize,
    n_features: usize,
    max_features: usize,
    nodes: Vec<Node>,
}

impl<R: AsRef<[f64]>> TreeBuilder<'_, R> {
    fn build(mut self, samples: Vec<usize>, rng: &mut ChaCha8Rng) -> DecisionTree {
        self.grow(samples, 0, rng);
        DecisionTree { nodes: self.nodes }
    }

    /// Appends the subtree for `samples` and returns the index of its root.
    fn grow(&mut self, samples: Vec<usize>, depth: usize, rng: &mut ChaCha8Rng) -> usize {
        let counts = self.class_counts(&samples);
        let parent_impurity = gini(&counts, samples.len());
        let at_max_depth = self.config.max_depth.is_some_and(|max| depth >= max);

        let split = if parent_impurity <= 0.0
            || at_max_depth
            || samples.len() < self.config.min_samples_split.max(2)
        {
            None
        } else {
            self.best_split(&samples, rng)
                .filter(|split| split.impurity < parent_impurity)
        };

        let Some(split) = split else {
            return self.leaf(&counts, samples.len());
        };

        let (left, right): (Vec<usize>, Vec<usize>) = samples
            .into_iter()
            .partition(|sample| self.x[*sample].as_ref()[split.feature] <= split.threshold);

        // Reserve the slot so the parent precedes its children.
        let index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: Vec::new(),
        });
        let left = self.grow(left, depth + 1, rng);
        let right = self.grow(right, depth + 1, rng);
        self.nodes[index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        index
    }

    fn leaf(&mut self, counts: &[usize], total: usize) -> usize {
        let total = total.max(1) as f64;
        let distribution = counts.iter().map(|count| *count as f64 / total).collect();
        self.nodes.push(Node::Leaf { distribution });
        self.nodes.len() - 1
    }

    fn class_counts(&self, samples: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        samples.iter().for_each(|sample| counts[self.y[*sample]] += 1);
        counts
    }

    fn best_split(&self, samples: &[usize], rng: &mut ChaCha8Rng) -> Option<BestSplit> {
        let mut features: Vec<usize> = (0..self.n_features).collect();
        features.shuffle(rng);

        // Keeps drawing past `max_features` until at least one feature can split.
        let mut best: Option<BestSplit> = None;
        for (drawn, &feature) in features.iter().enumerate() {
            if drawn >= self.max_features && best.is_some() {
                break;
            }
            if let Some(split) = self.best_split_on(samples, feature)
                && best
                    .as_ref()
                    .is_none_or(|best| split.impurity < best.impurity)
            {
                best = Some(split);
            }
        }
        best
    }

    /// Sweeps the sorted values of one feature and returns the threshold with
    /// the lowest weighted child impurity.
    fn best_split_on(&self, samples: &[usize], feature: usize) -> Option<BestSplit> {
        let mut sorted: Vec<(f64, usize)> = samples
            .iter()
            .map(|sample| (self.x[*sample].as_ref()[feature], self.y[*sample]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = sorted.len();
        if total < 2 {
            return None;
        }
        let mut left_counts = vec![0; self.n_classes];
        let mut right_counts = vec![0; self.n_classes];
        sorted.iter().for_each(|(_, label)| right_counts[*label] += 1);

        let mut best: Option<BestSplit> = None;
        for i in 0..total - 1 {
            let (value, label) = sorted[i];
            left_counts[label] += 1;
            right_counts[label] -= 1;

            let next = sorted[i + 1].0;
            if next <= value {
                continue;
            }
            let n_left = i + 1;
            let n_right = total - n_left;
            let impurity = (n_left as f64 * gini(&left_counts, n_left)
                + n_right as f64 * gini(&right_counts, n_right))
                / total as f64;
            if best.as_ref().is_none_or(|best| impurity < best.impurity) {
                best = Some(BestSplit {
                    feature,
                    threshold: value + (next - value) / 2.0,
                    impurity,
                });
            }
        }
        best
    }
}
