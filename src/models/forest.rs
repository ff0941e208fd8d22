//! Случайный лес регрессионных деревьев

use linfa::prelude::SingleTargetRegression;
use ndarray::{Array1, Array2, ArrayView1};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{RegressionDataset, Regressor};
use crate::error::ModelError;

/// Число признаков, рассматриваемых при каждом разбиении
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    Sqrt,
    Log2,
    Fraction(f64),
    All,
}

impl MaxFeatures {
    fn resolve(&self, n_features: usize) -> usize {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::Sqrt => n.sqrt().floor() as usize,
            MaxFeatures::Log2 => n.log2().floor() as usize,
            MaxFeatures::Fraction(f) => (n * f).floor() as usize,
            MaxFeatures::All => n_features,
        };
        k.clamp(1, n_features.max(1))
    }
}

#[derive(Debug, Clone, Copy)]
struct TreeParams {
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    max_features: usize,
}

#[derive(Debug, Clone)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

#[derive(Debug, Clone)]
struct RegressionTree {
    root: TreeNode,
    /// Суммарное уменьшение SSE по признакам
    importances: Vec<f64>,
    /// Попала ли строка в бутстрэп-выборку дерева
    in_bag: Vec<bool>,
}

impl RegressionTree {
    fn predict_row(&self, sample: ArrayView1<f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if sample[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    children_sse: f64,
}

/// Построение одного дерева по индексам строк (с повторами для бутстрэпа)
struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    y: &'a Array1<f64>,
    params: TreeParams,
    rng: ChaCha8Rng,
    importances: Vec<f64>,
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> TreeNode {
        let n_samples = indices.len();
        if n_samples == 0 {
            return TreeNode::Leaf { value: 0.0 };
        }
        let mean = indices.iter().map(|&i| self.y[i]).sum::<f64>() / n_samples as f64;

        let first = self.y[indices[0]];
        let is_pure = indices.iter().all(|&i| self.y[i] == first);

        if is_pure
            || self.params.max_depth.map_or(false, |d| depth >= d)
            || n_samples < self.params.min_samples_split
            || n_samples < 2 * self.params.min_samples_leaf
        {
            return TreeNode::Leaf { value: mean };
        }

        let parent_sse: f64 = indices.iter().map(|&i| (self.y[i] - mean).powi(2)).sum();

        let split = match self.find_split(&indices) {
            Some(split) => split,
            None => return TreeNode::Leaf { value: mean },
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, split.feature]] <= split.threshold);
        if left_indices.is_empty() || right_indices.is_empty() {
            return TreeNode::Leaf { value: mean };
        }

        self.importances[split.feature] += (parent_sse - split.children_sse).max(0.0);

        TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left: Box::new(self.build(left_indices, depth + 1)),
            right: Box::new(self.build(right_indices, depth + 1)),
        }
    }

    /// Лучшее разбиение среди случайного подмножества непостоянных признаков
    fn find_split(&mut self, indices: &[usize]) -> Option<SplitCandidate> {
        let n = indices.len();
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<SplitCandidate> = None;
        let mut visited = 0;
        let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(n);

        for feature in features {
            if visited >= self.params.max_features {
                break;
            }

            pairs.clear();
            pairs.extend(indices.iter().map(|&i| (self.x[[i, feature]], self.y[i])));
            pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

            // Постоянный признак не считается просмотренным
            if pairs[0].0 == pairs[n - 1].0 {
                continue;
            }
            visited += 1;

            let total_sum: f64 = pairs.iter().map(|p| p.1).sum();
            let total_sq: f64 = pairs.iter().map(|p| p.1 * p.1).sum();
            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for k in 1..n {
                let (prev_x, prev_y) = pairs[k - 1];
                left_sum += prev_y;
                left_sq += prev_y * prev_y;

                if k < min_leaf || n - k < min_leaf || prev_x == pairs[k].0 {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = (left_sq - left_sum * left_sum / k as f64).max(0.0);
                let right_sse = (right_sq - right_sum * right_sum / (n - k) as f64).max(0.0);
                let children_sse = left_sse + right_sse;

                if best.as_ref().map_or(true, |b| children_sse < b.children_sse) {
                    let mut threshold = (prev_x + pairs[k].0) / 2.0;
                    if threshold >= pairs[k].0 {
                        threshold = prev_x;
                    }
                    // NaN и бесконечность не разделяют строки
                    if !threshold.is_finite() {
                        continue;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        children_sse,
                    });
                }
            }
        }

        best
    }
}

/// Бэггинг регрессионных деревьев с OOB-оценкой и важностями признаков
#[derive(Debug, Clone)]
pub struct RandomForestRegressor {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub max_features: MaxFeatures,
    pub bootstrap: bool,
    pub oob_score: bool,
    pub random_state: u64,
    trees: Vec<RegressionTree>,
    n_features: usize,
    oob_score_value: Option<f64>,
    feature_importances: Option<Array1<f64>>,
}

impl RandomForestRegressor {
    pub fn new(n_estimators: usize) -> Self {
        Self {
            n_estimators,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: MaxFeatures::Sqrt,
            bootstrap: true,
            oob_score: true,
            random_state: 42,
            trees: Vec::new(),
            n_features: 0,
            oob_score_value: None,
            feature_importances: None,
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples;
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples;
        self
    }

    pub fn with_max_features(mut self, max_features: MaxFeatures) -> Self {
        self.max_features = max_features;
        self
    }

    pub fn with_bootstrap(mut self, bootstrap: bool) -> Self {
        self.bootstrap = bootstrap;
        self
    }

    pub fn with_oob_score(mut self, oob_score: bool) -> Self {
        self.oob_score = oob_score;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];

        for tree in &self.trees {
            let tree_total: f64 = tree.importances.iter().sum();
            if tree_total <= 0.0 {
                continue;
            }
            for (acc, imp) in total.iter_mut().zip(&tree.importances) {
                *acc += imp / tree_total;
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }

        self.feature_importances = Some(Array1::from_vec(total));
    }

    /// R^2 по строкам, не попавшим в бутстрэп хотя бы одного дерева
    fn compute_oob_score(&self, x: &Array2<f64>, y: &Array1<f64>) -> Option<f64> {
        let mut predicted = Vec::new();
        let mut actual = Vec::new();

        for (i, row) in x.outer_iter().enumerate() {
            let oob_trees: Vec<&RegressionTree> = self.trees.iter().filter(|t| !t.in_bag[i]).collect();
            if oob_trees.is_empty() {
                continue;
            }
            let sum: f64 = oob_trees.iter().map(|t| t.predict_row(row)).sum();
            predicted.push(sum / oob_trees.len() as f64);
            actual.push(y[i]);
        }

        if predicted.len() < x.nrows() {
            tracing::warn!(
                "{} samples have no out-of-bag prediction; OOB score may be unreliable",
                x.nrows() - predicted.len()
            );
        }
        if predicted.len() < 2 {
            return None;
        }

        Array1::from_vec(predicted).r2(&Array1::from_vec(actual)).ok()
    }
}

impl Default for RandomForestRegressor {
    fn default() -> Self {
        Self::new(200)
    }
}

impl Regressor for RandomForestRegressor {
    fn fit(&mut self, dataset: &RegressionDataset) -> Result<(), ModelError> {
        let x = &dataset.records;
        let y = &dataset.targets;
        let n_samples = x.nrows();
        let n_features = x.ncols();

        if n_samples == 0 || n_features == 0 || self.n_estimators == 0 {
            return Err(ModelError::EmptyDataset);
        }
        if y.len() != n_samples {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} targets", n_samples),
                actual: format!("{} targets", y.len()),
            });
        }
        if y.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteTarget);
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::NonFiniteFeature);
        }

        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split.max(2),
            min_samples_leaf: self.min_samples_leaf.max(1),
            max_features: self.max_features.resolve(n_features),
        };
        let base_seed = self.random_state;
        let bootstrap = self.bootstrap;

        // Каждое дерево со своим ГПСЧ: результат не зависит от планировщика потоков
        let trees: Vec<RegressionTree> = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = ChaCha8Rng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));

                let sample_indices: Vec<usize> = if bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut in_bag = vec![false; n_samples];
                for &i in &sample_indices {
                    in_bag[i] = true;
                }

                let mut builder = TreeBuilder {
                    x,
                    y,
                    params,
                    rng,
                    importances: vec![0.0; n_features],
                };
                let root = builder.build(sample_indices, 0);

                RegressionTree {
                    root,
                    importances: builder.importances,
                    in_bag,
                }
            })
            .collect();

        self.trees = trees;
        self.n_features = n_features;
        self.compute_feature_importances();

        self.oob_score_value = if self.oob_score && self.bootstrap {
            self.compute_oob_score(x, y)
        } else {
            None
        };

        tracing::debug!(
            "Random forest fitted: {} trees, {} features, max_features={}",
            self.trees.len(),
            n_features,
            params.max_features
        );

        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>, ModelError> {
        if self.trees.is_empty() {
            return Err(ModelError::NotFitted);
        }
        if x.ncols() != self.n_features {
            return Err(ModelError::ShapeMismatch {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", x.ncols()),
            });
        }

        let n_trees = self.trees.len() as f64;
        Ok(x.outer_iter()
            .map(|row| self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / n_trees)
            .collect())
    }

    fn oob_score(&self) -> Option<f64> {
        self.oob_score_value
    }

    fn feature_importances(&self) -> Option<&Array1<f64>> {
        self.feature_importances.as_ref()
    }

    fn n_estimators(&self) -> Option<usize> {
        Some(self.trees.len())
    }
}
