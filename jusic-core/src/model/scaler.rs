use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::errors::{JusicError, JusicResult};

/// 로버스트 스케일러: (x - 중앙값) / IQR
/// 이상치가 많은 금융 시계열 특징에 평균/표준편차 스케일링보다 안정적
/// 반드시 학습 구간에서만 적합시키고 검증/테스트는 transform만 한다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobustScaler {
    center: Vec<f64>,
    scale: Vec<f64>,
}

/// 선형 보간 분위수 (numpy 방식)
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let pos = q * (n - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = pos - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

impl RobustScaler {
    pub fn fit(x: &Array2<f64>) -> JusicResult<Self> {
        let n = x.nrows();
        let f = x.ncols();
        if n == 0 {
            return Err(JusicError::training("스케일러 학습 샘플이 없습니다".to_string()));
        }

        let mut center = Vec::with_capacity(f);
        let mut scale = Vec::with_capacity(f);

        for j in 0..f {
            let mut col: Vec<f64> = (0..n).map(|i| x[[i, j]]).collect();
            col.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let median = quantile(&col, 0.5);
            let iqr = quantile(&col, 0.75) - quantile(&col, 0.25);

            center.push(median);
            // IQR이 0인 상수 컬럼은 1.0으로 나눠 그대로 통과
            scale.push(if iqr > 0.0 { iqr } else { 1.0 });
        }

        Ok(RobustScaler { center, scale })
    }

    pub fn n_features(&self) -> usize {
        self.center.len()
    }

    pub fn transform(&self, x: &Array2<f64>) -> JusicResult<Array2<f64>> {
        if x.ncols() != self.center.len() {
            return Err(JusicError::prediction(format!(
                "스케일러 특징 수 불일치: 기대 {} vs 실제 {}",
                self.center.len(),
                x.ncols()
            )));
        }

        let mut out = x.clone();
        for i in 0..out.nrows() {
            for j in 0..out.ncols() {
                out[[i, j]] = (out[[i, j]] - self.center[j]) / self.scale[j];
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::arr2;

    #[test]
    fn test_fit_transform_median_zero() {
        let x = arr2(&[[1.0], [2.0], [3.0], [4.0], [100.0]]);
        let scaler = RobustScaler::fit(&x).expect("fit");
        let out = scaler.transform(&x).expect("transform");

        // 중앙값 3.0 -> 변환 후 0
        assert!((out[[2, 0]]).abs() < 1e-12);
        // 이상치 100도 IQR 기준으로만 스케일됨
        assert!(out[[4, 0]] > 1.0);
    }

    #[test]
    fn test_constant_column_passthrough() {
        let x = arr2(&[[5.0, 1.0], [5.0, 2.0], [5.0, 3.0]]);
        let scaler = RobustScaler::fit(&x).expect("fit");
        let out = scaler.transform(&x).expect("transform");

        // 상수 컬럼은 IQR 0 -> 나누기 1.0, 중앙값 제거만
        assert_eq!(out[[0, 0]], 0.0);
        assert_eq!(out[[1, 0]], 0.0);
    }

    #[test]
    fn test_train_only_fit_differs_from_pooled_fit() {
        // 누수 방지 성질: train에만 적합한 파라미터와 train+val에 적합한 파라미터는 달라야 함
        let train = arr2(&[[1.0], [2.0], [3.0], [4.0]]);
        let pooled = arr2(&[[1.0], [2.0], [3.0], [4.0], [50.0], [60.0]]);

        let a = RobustScaler::fit(&train).expect("fit train");
        let b = RobustScaler::fit(&pooled).expect("fit pooled");
        assert_ne!(a.center, b.center);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let x = arr2(&[[1.0, 2.0], [3.0, 4.0]]);
        let scaler = RobustScaler::fit(&x).expect("fit");
        let wrong = arr2(&[[1.0]]);
        assert!(scaler.transform(&wrong).is_err());
    }
}
