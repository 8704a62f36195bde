use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{JusicError, JusicResult};

/// 정규화 방식
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Penalty {
    L1,
    L2,
}

/// 로지스틱 회귀 이진 분류기 (경사 하강, L1/L2 정규화, 클래스 균형 가중)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    penalty: Penalty,
    /// 역정규화 강도 (작을수록 강한 정규화)
    c: f64,
    class_weight_balanced: bool,
    learning_rate: f64,
    max_iter: usize,
    tol: f64,
    weights: Option<Vec<f64>>,
    intercept: f64,
}

impl LogisticRegression {
    pub fn new(
        penalty: Penalty,
        c: f64,
        class_weight_balanced: bool,
        learning_rate: f64,
        max_iter: usize,
        tol: f64,
    ) -> Self {
        LogisticRegression {
            penalty,
            c,
            class_weight_balanced,
            learning_rate,
            max_iter,
            tol,
            weights: None,
            intercept: 0.0,
        }
    }

    /// L1 정규화 + 클래스 균형 가중 분류기
    pub fn l1(c: f64) -> Self {
        Self::new(Penalty::L1, c, true, 0.1, 1000, 1e-6)
    }

    /// L2 정규화 + 클래스 균형 가중 분류기
    pub fn l2(c: f64) -> Self {
        Self::new(Penalty::L2, c, true, 0.1, 1000, 1e-6)
    }

    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let e = z.exp();
            e / (1.0 + e)
        }
    }

    /// 클래스 균형 샘플 가중치: n / (클래스 수 * 클래스 빈도)
    fn sample_weights(&self, y: &[f64]) -> Vec<f64> {
        if !self.class_weight_balanced {
            return vec![1.0; y.len()];
        }
        let n = y.len() as f64;
        let n_pos = y.iter().filter(|&&v| v == 1.0).count() as f64;
        let n_neg = n - n_pos;
        if n_pos == 0.0 || n_neg == 0.0 {
            return vec![1.0; y.len()];
        }
        let w_pos = n / (2.0 * n_pos);
        let w_neg = n / (2.0 * n_neg);
        y.iter()
            .map(|&v| if v == 1.0 { w_pos } else { w_neg })
            .collect()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &[f64]) -> JusicResult<()> {
        let n = x.nrows();
        let f = x.ncols();
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

        let sample_w = self.sample_weights(y);
        let lambda = 1.0 / (self.c * n as f64);

        let mut w = Array1::<f64>::zeros(f);
        let mut b = 0.0;
        let mut prev_loss = f64::INFINITY;

        for iter in 0..self.max_iter {
            // 순전파
            let z = x.dot(&w) + b;
            let probs: Vec<f64> = z.iter().map(|&v| Self::sigmoid(v)).collect();

            // 가중 로그 손실
            let mut loss = 0.0;
            for i in 0..n {
                let p = probs[i].clamp(1e-12, 1.0 - 1e-12);
                loss -= sample_w[i] * (y[i] * p.ln() + (1.0 - y[i]) * (1.0 - p).ln());
            }
            loss /= n as f64;
            match self.penalty {
                Penalty::L1 => loss += lambda * w.iter().map(|v| v.abs()).sum::<f64>(),
                Penalty::L2 => loss += 0.5 * lambda * w.iter().map(|v| v * v).sum::<f64>(),
            }

            // 기울기
            let mut grad_w = Array1::<f64>::zeros(f);
            let mut grad_b = 0.0;
            for i in 0..n {
                let err = sample_w[i] * (probs[i] - y[i]);
                for j in 0..f {
                    grad_w[j] += err * x[[i, j]];
                }
                grad_b += err;
            }
            grad_w.mapv_inplace(|v| v / n as f64);
            grad_b /= n as f64;

            match self.penalty {
                Penalty::L1 => {
                    for j in 0..f {
                        grad_w[j] += lambda * w[j].signum() * if w[j] == 0.0 { 0.0 } else { 1.0 };
                    }
                }
                Penalty::L2 => {
                    for j in 0..f {
                        grad_w[j] += lambda * w[j];
                    }
                }
            }

            w = &w - &(grad_w * self.learning_rate);
            b -= grad_b * self.learning_rate;

            if (prev_loss - loss).abs() < self.tol {
                debug!("로지스틱 회귀 수렴: {}회 반복, 손실 {:.6}", iter + 1, loss);
                break;
            }
            prev_loss = loss;
        }

        self.weights = Some(w.to_vec());
        self.intercept = b;
        Ok(())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> JusicResult<Vec<f64>> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| JusicError::prediction("로지스틱 회귀가 학습되지 않았습니다"))?;
        if x.ncols() != weights.len() {
            return Err(JusicError::prediction(format!(
                "특징 수 불일치: 기대 {} vs 실제 {}",
                weights.len(),
                x.ncols()
            )));
        }

        let w = Array1::from_vec(weights.clone());
        let z = x.dot(&w) + self.intercept;
        Ok(z.iter().map(|&v| Self::sigmoid(v)).collect())
    }

    pub fn predict(&self, x: &Array2<f64>) -> JusicResult<Vec<u8>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.iter().map(|&p| if p >= 0.5 { 1 } else { 0 }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_fit_separable_data() {
        // x > 0 이면 1, 아니면 0인 선형 분리 가능 데이터
        let x = arr2(&[
            [-2.0], [-1.5], [-1.0], [-0.5], [-0.2],
            [0.2], [0.5], [1.0], [1.5], [2.0],
        ]);
        let y = vec![0.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0, 1.0];

        let mut model = LogisticRegression::l2(1.0);
        model.fit(&x, &y).expect("fit");

        let preds = model.predict(&x).expect("predict");
        let correct = preds
            .iter()
            .zip(y.iter())
            .filter(|(&p, &t)| p as f64 == t)
            .count();
        assert!(correct >= 9, "분리 가능 데이터 정확도 부족: {}/10", correct);

        let probs = model.predict_proba(&x).expect("proba");
        assert!(probs[0] < 0.5);
        assert!(probs[9] > 0.5);
        for p in probs {
            assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn test_unfitted_model_is_error() {
        let model = LogisticRegression::l1(0.005);
        let x = arr2(&[[1.0, 2.0]]);
        assert!(model.predict_proba(&x).is_err());
    }

    #[test]
    fn test_feature_count_mismatch_is_error() {
        let x = arr2(&[[-1.0], [1.0]]);
        let y = vec![0.0, 1.0];
        let mut model = LogisticRegression::l2(1.0);
        model.fit(&x, &y).expect("fit");

        let wrong = arr2(&[[1.0, 2.0]]);
        assert!(model.predict_proba(&wrong).is_err());
    }

    #[test]
    fn test_l1_shrinks_weights_more_than_l2() {
        // 강한 L1 정규화 (C 작음)는 가중치 크기를 줄인다
        let x = arr2(&[
            [-2.0, 0.1], [-1.0, -0.2], [-0.5, 0.3], [0.5, -0.1], [1.0, 0.2], [2.0, -0.3],
        ]);
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut strong = LogisticRegression::l1(0.005);
        strong.fit(&x, &y).expect("fit strong");
        let mut weak = LogisticRegression::l1(100.0);
        weak.fit(&x, &y).expect("fit weak");

        let norm = |m: &LogisticRegression| -> f64 {
            m.weights
                .as_ref()
                .expect("weights")
                .iter()
                .map(|v| v.abs())
                .sum()
        };
        assert!(norm(&strong) <= norm(&weak));
    }
}
