use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{PipelineError, Result};

/// Random forest tuning. The seed makes every run reproducible: the same
/// table always grows the same forest.
#[derive(Debug, Clone)]
pub struct ForestConfig {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 8,
            min_samples_split: 4,
            seed: 42,
        }
    }
}

/// A single regression tree node.
#[derive(Debug, Clone)]
enum Node {
    Leaf(f64),
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, features: &[f64]) -> f64 {
        match self {
            Node::Leaf(value) => *value,
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if features[*feature] <= *threshold {
                    left.predict(features)
                } else {
                    right.predict(features)
                }
            }
        }
    }
}

/// Bagged ensemble of variance-minimizing regression trees with per-split
/// feature subsampling.
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    trees: Vec<Node>,
    fitted: Option<Vec<f64>>,
    residuals: Option<Vec<f64>>,
}

impl RandomForestRegressor {
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            fitted: None,
            residuals: None,
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn residuals(&self) -> Option<&[f64]> {
        self.residuals.as_deref()
    }

    pub fn rmse(&self) -> Option<f64> {
        self.residuals.as_ref().map(|r| {
            (r.iter().map(|e| e * e).sum::<f64>() / r.len() as f64).sqrt()
        })
    }

    /// In-sample R² against the training target.
    pub fn r_squared(&self, target: &[f64]) -> Option<f64> {
        let fitted = self.fitted.as_ref()?;
        let mean = target.iter().sum::<f64>() / target.len() as f64;
        let ss_tot: f64 = target.iter().map(|y| (y - mean).powi(2)).sum();
        let ss_res: f64 = target
            .iter()
            .zip(fitted)
            .map(|(y, f)| (y - f).powi(2))
            .sum();
        if ss_tot > 0.0 {
            Some(1.0 - ss_res / ss_tot)
        } else {
            Some(0.0)
        }
    }

    pub fn fit(&mut self, features: &[Vec<f64>], target: &[f64]) -> Result<()> {
        if features.is_empty() || target.is_empty() {
            return Err(PipelineError::Model("empty training data".to_string()));
        }
        if features.len() != target.len() {
            return Err(PipelineError::Model(format!(
                "feature/target length mismatch: {} vs {}",
                features.len(),
                target.len()
            )));
        }

        let n = features.len();
        let n_features = features[0].len();
        // Per-split candidate feature count, the usual sqrt heuristic.
        let max_features = ((n_features as f64).sqrt().ceil() as usize).max(1);

        let mut trees = Vec::with_capacity(self.config.n_trees);
        for tree_index in 0..self.config.n_trees {
            // Per-tree RNG keyed off the configured seed keeps the forest
            // deterministic regardless of build order.
            let mut rng = StdRng::seed_from_u64(self.config.seed.wrapping_add(tree_index as u64));
            let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
            trees.push(build_tree(
                features,
                target,
                &sample,
                0,
                max_features,
                &self.config,
                &mut rng,
            ));
        }
        self.trees = trees;

        let fitted: Vec<f64> = features.iter().map(|row| self.predict_row(row)).collect();
        let residuals: Vec<f64> = target.iter().zip(&fitted).map(|(y, f)| y - f).collect();
        self.fitted = Some(fitted);
        self.residuals = Some(residuals);
        Ok(())
    }

    pub fn predict(&self, features: &[f64]) -> Result<f64> {
        if !self.is_fitted() {
            return Err(PipelineError::Model(
                "model must be fitted before prediction".to_string(),
            ));
        }
        Ok(self.predict_row(features))
    }

    fn predict_row(&self, features: &[f64]) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| t.predict(features)).sum();
        sum / self.trees.len() as f64
    }
}

fn mean_of(target: &[f64], indices: &[usize]) -> f64 {
    indices.iter().map(|&i| target[i]).sum::<f64>() / indices.len() as f64
}

fn build_tree(
    features: &[Vec<f64>],
    target: &[f64],
    indices: &[usize],
    depth: usize,
    max_features: usize,
    config: &ForestConfig,
    rng: &mut StdRng,
) -> Node {
    if depth >= config.max_depth || indices.len() < config.min_samples_split {
        return Node::Leaf(mean_of(target, indices));
    }

    let n_features = features[0].len();
    let mut candidates: Vec<usize> = (0..n_features).collect();
    // Partial Fisher-Yates: the first max_features entries become the
    // candidate set for this split.
    for i in 0..max_features.min(n_features) {
        let j = rng.gen_range(i..n_features);
        candidates.swap(i, j);
    }
    candidates.truncate(max_features.min(n_features));

    let Some((feature, threshold)) = best_split(features, target, indices, &candidates) else {
        return Node::Leaf(mean_of(target, indices));
    };

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| features[i][feature] <= threshold);
    if left_idx.is_empty() || right_idx.is_empty() {
        return Node::Leaf(mean_of(target, indices));
    }

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_tree(
            features,
            target,
            &left_idx,
            depth + 1,
            max_features,
            config,
            rng,
        )),
        right: Box::new(build_tree(
            features,
            target,
            &right_idx,
            depth + 1,
            max_features,
            config,
            rng,
        )),
    }
}

/// Pick the (feature, threshold) minimizing the weighted sum of child
/// variances. Each candidate feature is scanned once over its sorted
/// values with running sums, so a split evaluation is linear in the node
/// size.
fn best_split(
    features: &[Vec<f64>],
    target: &[f64],
    indices: &[usize],
    candidates: &[usize],
) -> Option<(usize, f64)> {
    let n = indices.len() as f64;
    let total_sum: f64 = indices.iter().map(|&i| target[i]).sum();
    let total_sq: f64 = indices.iter().map(|&i| target[i] * target[i]).sum();
    let parent_score = total_sq - total_sum * total_sum / n;

    let mut best: Option<(usize, f64, f64)> = None;
    for &feature in candidates {
        let mut order: Vec<usize> = indices.to_vec();
        order.sort_by(|&a, &b| features[a][feature].total_cmp(&features[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for (count, pair) in order.windows(2).enumerate() {
            let y = target[pair[0]];
            left_sum += y;
            left_sq += y * y;

            let left_value = features[pair[0]][feature];
            let right_value = features[pair[1]][feature];
            if left_value == right_value {
                continue; // no boundary between equal values
            }

            let left_n = (count + 1) as f64;
            let right_n = n - left_n;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let score = (left_sq - left_sum * left_sum / left_n)
                + (right_sq - right_sum * right_sum / right_n);

            if score < best.map_or(parent_score, |(_, _, s)| s) {
                best = Some((feature, (left_value + right_value) / 2.0, score));
            }
        }
    }
    best.map(|(feature, threshold, _)| (feature, threshold))
}
