use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{JusicError, JusicResult};
use crate::model::forest::RandomForestClassifier;
use crate::model::logistic::{LogisticRegression, Penalty};

/// 스태킹 앙상블 (Direction 과제용)
/// 베이스: L1 로지스틱 회귀 + 얕은 랜덤 포레스트
/// 메타: 로지스틱 회귀 - 베이스의 폴드 외(out-of-fold) 양성 확률 2개를 입력으로 학습
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StackingEnsemble {
    base_logistic: LogisticRegression,
    base_forest: RandomForestClassifier,
    meta: LogisticRegression,
    cv_folds: usize,
}

impl StackingEnsemble {
    pub fn new(cv_folds: usize) -> Self {
        StackingEnsemble {
            base_logistic: LogisticRegression::l1(1.0),
            base_forest: RandomForestClassifier::shallow(),
            meta: LogisticRegression::new(Penalty::L2, 1.0, true, 0.1, 1000, 1e-6),
            cv_folds,
        }
    }

    /// 연속 구간 K-폴드 경계 (시계열 순서 유지)
    fn fold_bounds(n: usize, folds: usize) -> Vec<(usize, usize)> {
        let mut bounds = Vec::with_capacity(folds);
        for k in 0..folds {
            let start = k * n / folds;
            let end = (k + 1) * n / folds;
            bounds.push((start, end));
        }
        bounds
    }

    fn select_rows(x: &Array2<f64>, indices: &[usize]) -> Array2<f64> {
        let mut out = Array2::zeros((indices.len(), x.ncols()));
        for (row, &i) in indices.iter().enumerate() {
            for j in 0..x.ncols() {
                out[[row, j]] = x[[i, j]];
            }
        }
        out
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
        if n < self.cv_folds * 2 {
            return Err(JusicError::training(format!(
                "스태킹 학습 샘플 부족: {}개 ({}폴드)",
                n, self.cv_folds
            )));
        }

        // 1단계: 폴드 외 예측으로 메타 특징 생성 (베이스가 자기 폴드를 본 적 없도록)
        let mut meta_features = Array2::<f64>::zeros((n, 2));
        let bounds = Self::fold_bounds(n, self.cv_folds);

        for &(start, end) in &bounds {
            if start == end {
                continue;
            }
            let train_idx: Vec<usize> = (0..n).filter(|i| *i < start || *i >= end).collect();
            let fold_idx: Vec<usize> = (start..end).collect();

            let x_train = Self::select_rows(x, &train_idx);
            let y_train: Vec<f64> = train_idx.iter().map(|&i| y[i]).collect();
            let x_fold = Self::select_rows(x, &fold_idx);

            let mut fold_logistic = self.base_logistic.clone();
            fold_logistic.fit(&x_train, &y_train)?;
            let p_logistic = fold_logistic.predict_proba(&x_fold)?;

            let mut fold_forest = self.base_forest.clone();
            fold_forest.fit(&x_train, &y_train)?;
            let p_forest = fold_forest.predict_proba(&x_fold)?;

            for (offset, &i) in fold_idx.iter().enumerate() {
                meta_features[[i, 0]] = p_logistic[offset];
                meta_features[[i, 1]] = p_forest[offset];
            }
        }

        // 2단계: 메타 학습기 학습
        self.meta.fit(&meta_features, y)?;

        // 3단계: 베이스를 전체 학습 데이터로 재학습 (예측 시 사용)
        self.base_logistic.fit(x, y)?;
        self.base_forest.fit(x, y)?;

        debug!("스태킹 앙상블 학습 완료: {}개 샘플, {}폴드", n, self.cv_folds);
        Ok(())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> JusicResult<Vec<f64>> {
        let p_logistic = self.base_logistic.predict_proba(x)?;
        let p_forest = self.base_forest.predict_proba(x)?;

        let n = x.nrows();
        let mut meta_features = Array2::<f64>::zeros((n, 2));
        for i in 0..n {
            meta_features[[i, 0]] = p_logistic[i];
            meta_features[[i, 1]] = p_forest[i];
        }

        self.meta.predict_proba(&meta_features)
    }

    pub fn predict(&self, x: &Array2<f64>) -> JusicResult<Vec<u8>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.iter().map(|&p| if p >= 0.5 { 1 } else { 0 }).collect())
    }
}
