pub mod forest;
pub mod logistic;
pub mod metrics;
pub mod pca;
pub mod scaler;
pub mod stacking;

pub use forest::RandomForestClassifier;
pub use logistic::{LogisticRegression, Penalty};
pub use metrics::{compute_partition_metrics, PartitionMetrics, TaskMetrics};
pub use pca::Pca;
pub use scaler::RobustScaler;
pub use stacking::StackingEnsemble;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::errors::JusicResult;

/// 과제별 분류기
/// 모든 분류기는 이진 라벨과 양성 클래스 확률을 모두 노출한다 (점수 계산에 필수)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Classifier {
    Logistic(LogisticRegression),
    Stacking(StackingEnsemble),
}

impl Classifier {
    pub fn fit(&mut self, x: &Array2<f64>, y: &[f64]) -> JusicResult<()> {
        match self {
            Classifier::Logistic(model) => model.fit(x, y),
            Classifier::Stacking(model) => model.fit(x, y),
        }
    }

    /// 양성 클래스(1) 확률
    pub fn predict_proba(&self, x: &Array2<f64>) -> JusicResult<Vec<f64>> {
        match self {
            Classifier::Logistic(model) => model.predict_proba(x),
            Classifier::Stacking(model) => model.predict_proba(x),
        }
    }

    /// 이진 라벨 (확률 0.5 기준)
    pub fn predict(&self, x: &Array2<f64>) -> JusicResult<Vec<u8>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.iter().map(|&p| if p >= 0.5 { 1 } else { 0 }).collect())
    }
}
