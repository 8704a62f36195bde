use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{JusicError, JusicResult};

/// 주성분 분석 (분산 보존 차원 축소)
/// 설명 분산 비율의 누적합이 임계값(95%) 이상이 되는 최소 성분 수를 유지
/// Direction 과제 전용 - 학습 구간의 스케일된 특징에만 적합시킨다
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pca {
    mean: Vec<f64>,
    /// 성분 행렬 (k x f), 행마다 하나의 주성분
    components: Vec<Vec<f64>>,
    explained_variance_ratio: Vec<f64>,
}

/// 대칭 행렬의 야코비 고유값 분해
/// 반환: (고유값, 고유벡터 열 행렬)
fn jacobi_eigen(matrix: &Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut a = matrix.clone();
    let mut v = Array2::<f64>::eye(n);

    const MAX_SWEEPS: usize = 100;
    const EPS: f64 = 1e-12;

    for _ in 0..MAX_SWEEPS {
        // 비대각 성분의 크기
        let mut off_diag = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off_diag += a[[i, j]] * a[[i, j]];
            }
        }
        if off_diag.sqrt() < EPS {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                if a[[p, q]].abs() < EPS {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * a[[p, q]]);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let akp = a[[k, p]];
                    let akq = a[[k, q]];
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let apk = a[[p, k]];
                    let aqk = a[[q, k]];
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let vkp = v[[k, p]];
                    let vkq = v[[k, q]];
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    let eigenvalues: Vec<f64> = (0..n).map(|i| a[[i, i]]).collect();
    (eigenvalues, v)
}

impl Pca {
    /// 스케일된 학습 특징에 적합 - 설명 분산 min_explained 이상 유지
    pub fn fit(x: &Array2<f64>, min_explained: f64) -> JusicResult<Self> {
        let n = x.nrows();
        let f = x.ncols();
        if n < 2 {
            return Err(JusicError::training(format!(
                "PCA 학습 샘플 부족: {}개",
                n
            )));
        }

        // 중심화
        let mut mean = vec![0.0; f];
        for j in 0..f {
            mean[j] = (0..n).map(|i| x[[i, j]]).sum::<f64>() / n as f64;
        }

        // 공분산 행렬 (f x f)
        let mut cov = Array2::<f64>::zeros((f, f));
        for i in 0..n {
            for j in 0..f {
                let dj = x[[i, j]] - mean[j];
                for k in j..f {
                    cov[[j, k]] += dj * (x[[i, k]] - mean[k]);
                }
            }
        }
        for j in 0..f {
            for k in j..f {
                let value = cov[[j, k]] / (n as f64 - 1.0);
                cov[[j, k]] = value;
                cov[[k, j]] = value;
            }
        }

        let (eigenvalues, eigenvectors) = jacobi_eigen(&cov);

        // 고유값 내림차순 정렬
        let mut order: Vec<usize> = (0..f).collect();
        order.sort_by(|&a, &b| {
            eigenvalues[b]
                .partial_cmp(&eigenvalues[a])
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let total_variance: f64 = eigenvalues.iter().map(|&v| v.max(0.0)).sum();
        if total_variance <= 0.0 {
            return Err(JusicError::training("총 분산이 0입니다 (상수 입력)".to_string()));
        }

        // 누적 설명 분산이 임계값을 넘는 최소 성분 수
        let mut n_components = 0;
        let mut cumulative = 0.0;
        let mut ratios = Vec::new();
        for &idx in &order {
            let ratio = eigenvalues[idx].max(0.0) / total_variance;
            cumulative += ratio;
            ratios.push(ratio);
            n_components += 1;
            if cumulative >= min_explained {
                break;
            }
        }

        let mut components = Vec::with_capacity(n_components);
        for &idx in order.iter().take(n_components) {
            let component: Vec<f64> = (0..f).map(|row| eigenvectors[[row, idx]]).collect();
            components.push(component);
        }
        ratios.truncate(n_components);

        debug!(
            "PCA 적합 완료: {} -> {}개 성분 (설명 분산 {:.1}%)",
            f,
            n_components,
            cumulative * 100.0
        );

        Ok(Pca {
            mean,
            components,
            explained_variance_ratio: ratios,
        })
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn explained_variance_ratio(&self) -> &[f64] {
        &self.explained_variance_ratio
    }

    pub fn transform(&self, x: &Array2<f64>) -> JusicResult<Array2<f64>> {
        let f = self.mean.len();
        if x.ncols() != f {
            return Err(JusicError::prediction(format!(
                "PCA 특징 수 불일치: 기대 {} vs 실제 {}",
                f,
                x.ncols()
            )));
        }

        let n = x.nrows();
        let k = self.components.len();
        let mut out = Array2::<f64>::zeros((n, k));
        for i in 0..n {
            for (c, component) in self.components.iter().enumerate() {
                let mut dot = 0.0;
                for j in 0..f {
                    dot += (x[[i, j]] - self.mean[j]) * component[j];
                }
                out[[i, c]] = dot;
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    /// 한 방향으로만 분산이 큰 2차원 데이터
    fn elongated_data() -> Array2<f64> {
        let n = 50;
        let mut rows = Vec::with_capacity(n * 2);
        for i in 0..n {
            let t = (i as f64 - 25.0) / 5.0;
            let noise = ((i * 7) % 11) as f64 * 0.01 - 0.05;
            rows.push(t);
            rows.push(t * 0.5 + noise);
        }
        Array2::from_shape_vec((n, 2), rows).expect("shape")
    }

    #[test]
    fn test_fit_reduces_dimension() {
        let x = elongated_data();
        let pca = Pca::fit(&x, 0.95).expect("fit");

        // 분산 대부분이 한 축에 있으므로 1개 성분이면 충분
        assert_eq!(pca.n_components(), 1);
        assert!(pca.explained_variance_ratio()[0] >= 0.95);

        let out = pca.transform(&x).expect("transform");
        assert_eq!(out.nrows(), 50);
        assert_eq!(out.ncols(), 1);
    }

    #[test]
    fn test_full_variance_keeps_all_components() {
        let x = elongated_data();
        let pca = Pca::fit(&x, 1.0).expect("fit");
        assert_eq!(pca.n_components(), 2);
    }

    #[test]
    fn test_train_only_fit_differs_from_pooled_fit() {
        let train = elongated_data();
        let mut pooled_rows: Vec<f64> = train.iter().copied().collect();
        // 분포가 다른 검증 데이터를 덧붙임
        for i in 0..20 {
            pooled_rows.push(0.1);
            pooled_rows.push(10.0 + i as f64);
        }
        let pooled = Array2::from_shape_vec((70, 2), pooled_rows).expect("shape");

        let a = Pca::fit(&train, 0.95).expect("fit train");
        let b = Pca::fit(&pooled, 0.95).expect("fit pooled");
        assert_ne!(a.mean, b.mean);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let x = elongated_data();
        let pca = Pca::fit(&x, 0.95).expect("fit");
        let wrong = Array2::<f64>::zeros((1, 3));
        assert!(pca.transform(&wrong).is_err());
    }
}
