use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::errors::{JusicError, JusicResult};

/// 결정 트리 노드
#[derive(Debug, Clone, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        /// 가중치 기준 양성 클래스 비율
        prob: f64,
    },
    Internal {
        feature: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// 얕은 결정 트리 (지니 불순도, 가중 샘플)
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DecisionTree {
    root: TreeNode,
}

impl DecisionTree {
    fn predict_one(&self, row: &[f64]) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { prob } => return *prob,
                TreeNode::Internal {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { left } else { right };
                }
            }
        }
    }
}

/// 랜덤 포레스트 이진 분류기
/// 부트스트랩 샘플 + 특징 부분집합, 얕은 깊이 (과적합 억제), 클래스 균형 가중
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    n_trees: usize,
    max_depth: usize,
    min_samples_split: usize,
    class_weight_balanced: bool,
    seed: u64,
    trees: Vec<DecisionTree>,
}

impl RandomForestClassifier {
    pub fn new(n_trees: usize, max_depth: usize, min_samples_split: usize, seed: u64) -> Self {
        RandomForestClassifier {
            n_trees,
            max_depth,
            min_samples_split,
            class_weight_balanced: true,
            seed,
            trees: Vec::new(),
        }
    }

    /// Direction 스태킹용 기본 설정 (얕은 트리 100그루)
    pub fn shallow() -> Self {
        Self::new(100, 3, 2, 42)
    }

    fn class_weights(&self, y: &[f64]) -> (f64, f64) {
        if !self.class_weight_balanced {
            return (1.0, 1.0);
        }
        let n = y.len() as f64;
        let n_pos = y.iter().filter(|&&v| v == 1.0).count() as f64;
        let n_neg = n - n_pos;
        if n_pos == 0.0 || n_neg == 0.0 {
            return (1.0, 1.0);
        }
        (n / (2.0 * n_neg), n / (2.0 * n_pos))
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &[f64]) -> JusicResult<()> {
        let n = x.nrows();
        if n != y.len() {
            return Err(JusicError::training(format!(
                "행 수 불일치: X {} vs y {}",
                n,
                y.len()
            )));
        }
        if n == 0 {
            return Err(JusicError::training("학습 샘플이 없습니다".to_string()));
        }

        let (w_neg, w_pos) = self.class_weights(y);
        let max_features = ((x.ncols() as f64).sqrt().round() as usize).max(1);

        // 트리별 독립 시드로 병렬 학습 (내부 병렬화 - 시스템 동시성 계약과 무관)
        let params = TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            max_features,
            w_neg,
            w_pos,
        };
        let seed = self.seed;

        self.trees = (0..self.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(t as u64));
                let indices: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                let root = build_node(x, y, &indices, 0, &params, &mut rng);
                DecisionTree { root }
            })
            .collect();

        Ok(())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> JusicResult<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(JusicError::prediction("랜덤 포레스트가 학습되지 않았습니다"));
        }

        let n = x.nrows();
        let mut probs = vec![0.0; n];
        let mut row_buf = vec![0.0; x.ncols()];

        for i in 0..n {
            for (j, v) in row_buf.iter_mut().enumerate() {
                *v = x[[i, j]];
            }
            let sum: f64 = self.trees.iter().map(|t| t.predict_one(&row_buf)).sum();
            probs[i] = sum / self.trees.len() as f64;
        }

        Ok(probs)
    }

    pub fn predict(&self, x: &Array2<f64>) -> JusicResult<Vec<u8>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.iter().map(|&p| if p >= 0.5 { 1 } else { 0 }).collect())
    }
}

struct TreeParams {
    max_depth: usize,
    min_samples_split: usize,
    max_features: usize,
    w_neg: f64,
    w_pos: f64,
}

/// 가중치 기준 (음성, 양성) 합
fn weighted_counts(y: &[f64], indices: &[usize], params: &TreeParams) -> (f64, f64) {
    let mut neg = 0.0;
    let mut pos = 0.0;
    for &i in indices {
        if y[i] == 1.0 {
            pos += params.w_pos;
        } else {
            neg += params.w_neg;
        }
    }
    (neg, pos)
}

fn gini(neg: f64, pos: f64) -> f64 {
    let total = neg + pos;
    if total == 0.0 {
        return 0.0;
    }
    let p = pos / total;
    2.0 * p * (1.0 - p)
}

fn make_leaf(y: &[f64], indices: &[usize], params: &TreeParams) -> TreeNode {
    let (neg, pos) = weighted_counts(y, indices, params);
    let total = neg + pos;
    TreeNode::Leaf {
        prob: if total > 0.0 { pos / total } else { 0.5 },
    }
}

fn build_node(
    x: &Array2<f64>,
    y: &[f64],
    indices: &[usize],
    depth: usize,
    params: &TreeParams,
    rng: &mut StdRng,
) -> TreeNode {
    let (neg, pos) = weighted_counts(y, indices, params);

    if depth >= params.max_depth
        || indices.len() < params.min_samples_split
        || neg == 0.0
        || pos == 0.0
    {
        return make_leaf(y, indices, params);
    }

    let parent_gini = gini(neg, pos);
    let n_features = x.ncols();

    // 특징 부분집합 샘플링 (중복 없이)
    let mut candidates: Vec<usize> = (0..n_features).collect();
    for i in (1..candidates.len()).rev() {
        let j = rng.gen_range(0..=i);
        candidates.swap(i, j);
    }
    candidates.truncate(params.max_features);

    let mut best: Option<(usize, f64, f64)> = None; // (특징, 임계값, 이득)

    for &feature in &candidates {
        let mut values: Vec<f64> = indices.iter().map(|&i| x[[i, feature]]).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        values.dedup();

        for pair in values.windows(2) {
            let threshold = (pair[0] + pair[1]) / 2.0;

            let mut left_neg = 0.0;
            let mut left_pos = 0.0;
            let mut right_neg = 0.0;
            let mut right_pos = 0.0;
            for &i in indices {
                let w = if y[i] == 1.0 { params.w_pos } else { params.w_neg };
                if x[[i, feature]] <= threshold {
                    if y[i] == 1.0 { left_pos += w } else { left_neg += w }
                } else if y[i] == 1.0 {
                    right_pos += w
                } else {
                    right_neg += w
                }
            }

            let left_total = left_neg + left_pos;
            let right_total = right_neg + right_pos;
            if left_total == 0.0 || right_total == 0.0 {
                continue;
            }

            let total = left_total + right_total;
            let weighted_gini = (left_total / total) * gini(left_neg, left_pos)
                + (right_total / total) * gini(right_neg, right_pos);
            let gain = parent_gini - weighted_gini;

            if best.map_or(true, |(_, _, g)| gain > g) {
                best = Some((feature, threshold, gain));
            }
        }
    }

    let (feature, threshold, gain) = match best {
        Some(b) => b,
        None => return make_leaf(y, indices, params),
    };
    if gain <= 0.0 {
        return make_leaf(y, indices, params);
    }

    let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .iter()
        .copied()
        .partition(|&i| x[[i, feature]] <= threshold);

    TreeNode::Internal {
        feature,
        threshold,
        left: Box::new(build_node(x, y, &left_idx, depth + 1, params, rng)),
        right: Box::new(build_node(x, y, &right_idx, depth + 1, params, rng)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn separable_data() -> (Array2<f64>, Vec<f64>) {
        let n = 40;
        let mut rows = Vec::with_capacity(n * 2);
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            let offset = (i % 7) as f64 * 0.01;
            if i % 2 == 0 {
                rows.push(1.0 + offset);
                rows.push(0.5 - offset);
                y.push(1.0);
            } else {
                rows.push(-1.0 - offset);
                rows.push(-0.5 + offset);
                y.push(0.0);
            }
        }
        (
            Array2::from_shape_vec((n, 2), rows).expect("shape"),
            y,
        )
    }

    #[test]
    fn test_fit_and_predict_separable() {
        let (x, y) = separable_data();
        let mut model = RandomForestClassifier::shallow();
        model.fit(&x, &y).expect("fit");

        let preds = model.predict(&x).expect("predict");
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(&p, &t)| p as f64 == t)
            .count();
        assert_eq!(correct, y.len());

        let probs = model.predict_proba(&x).expect("proba");
        for p in probs {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_deterministic_with_fixed_seed() {
        let (x, y) = separable_data();
        let mut a = RandomForestClassifier::new(20, 3, 2, 7);
        let mut b = RandomForestClassifier::new(20, 3, 2, 7);
        a.fit(&x, &y).expect("fit a");
        b.fit(&x, &y).expect("fit b");

        let pa = a.predict_proba(&x).expect("proba a");
        let pb = b.predict_proba(&x).expect("proba b");
        assert_eq!(pa, pb);
    }

    #[test]
    fn test_unfitted_model_is_error() {
        let model = RandomForestClassifier::shallow();
        let x = Array2::zeros((1, 2));
        assert!(model.predict_proba(&x).is_err());
    }
}
