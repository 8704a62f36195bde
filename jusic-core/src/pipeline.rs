use ndarray::{s, Array2};
use tracing::{debug, info};

use crate::dataset::TaskDataset;
use crate::errors::{JusicError, JusicResult};
use crate::labels::Task;
use crate::model::{
    compute_partition_metrics, Classifier, LogisticRegression, PartitionMetrics, Pca, RobustScaler,
    StackingEnsemble, TaskMetrics,
};

/// PCA가 유지해야 하는 최소 설명 분산 (Direction 전용)
const PCA_MIN_EXPLAINED: f64 = 0.95;

/// 학습에 필요한 최소 샘플 수
const MIN_SAMPLES: usize = 50;

/// 시간 순 60/20/20 분할 경계 (행 인덱스 기준, 절대 섞지 않음)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitIndices {
    pub train_end: usize,
    pub val_end: usize,
}

pub fn split_indices(n: usize) -> SplitIndices {
    SplitIndices {
        train_end: n * 6 / 10,
        val_end: n * 8 / 10,
    }
}

/// (과제, 기간) 하나의 학습 결과물
#[derive(Debug)]
pub struct TrainedTask {
    pub classifier: Classifier,
    pub scaler: RobustScaler,
    pub pca: Option<Pca>,
    pub feature_names: Vec<String>,
    pub metrics: TaskMetrics,
}

/// 과제별 분류기 구성
/// Direction: 스태킹 (L1 로지스틱 + 얕은 포레스트, 로지스틱 메타)
/// Volatility: 로지스틱 L1 (C=0.005), Risk: 로지스틱 L2 (C=0.1) - 모두 클래스 균형 가중
fn build_classifier(task: Task) -> Classifier {
    match task {
        Task::Direction => Classifier::Stacking(StackingEnsemble::new(3)),
        Task::Volatility => Classifier::Logistic(LogisticRegression::l1(0.005)),
        Task::Risk => Classifier::Logistic(LogisticRegression::l2(0.1)),
    }
}

/// 분할 → 스케일링 → (Direction) PCA → 학습 → 3파티션 평가
/// 스케일러와 PCA는 학습 구간에서만 적합 - 검증/테스트 누수 방지가 이 함수의 핵심 계약
pub fn train_task(dataset: &TaskDataset) -> JusicResult<TrainedTask> {
    let n = dataset.len();
    if n < MIN_SAMPLES {
        return Err(JusicError::training(format!(
            "[{}/{}] 샘플 부족: {}개 (최소 {}개)",
            dataset.task.as_str(),
            dataset.horizon.as_str(),
            n,
            MIN_SAMPLES
        )));
    }

    let split = split_indices(n);
    debug!(
        "[{}/{}] 분할: train {} / val {} / test {}",
        dataset.task.as_str(),
        dataset.horizon.as_str(),
        split.train_end,
        split.val_end - split.train_end,
        n - split.val_end
    );

    let x_train = dataset.x.slice(s![..split.train_end, ..]).to_owned();
    let x_val = dataset.x.slice(s![split.train_end..split.val_end, ..]).to_owned();
    let x_test = dataset.x.slice(s![split.val_end.., ..]).to_owned();

    let y_train = &dataset.y[..split.train_end];
    let y_val = &dataset.y[split.train_end..split.val_end];
    let y_test = &dataset.y[split.val_end..];

    // 스케일러는 학습 구간에만 적합
    let scaler = RobustScaler::fit(&x_train)?;
    let x_train_scaled = scaler.transform(&x_train)?;
    let x_val_scaled = scaler.transform(&x_val)?;
    let x_test_scaled = scaler.transform(&x_test)?;

    // Direction만 차원 축소 (스케일된 학습 구간에만 적합)
    let (pca, x_train_final, x_val_final, x_test_final) = if dataset.task == Task::Direction {
        let pca = Pca::fit(&x_train_scaled, PCA_MIN_EXPLAINED)?;
        let train = pca.transform(&x_train_scaled)?;
        let val = pca.transform(&x_val_scaled)?;
        let test = pca.transform(&x_test_scaled)?;
        (Some(pca), train, val, test)
    } else {
        (None, x_train_scaled, x_val_scaled, x_test_scaled)
    };

    let mut classifier = build_classifier(dataset.task);
    classifier.fit(&x_train_final, y_train)?;

    let evaluate = |x: &Array2<f64>, y: &[f64]| -> JusicResult<PartitionMetrics> {
        let preds = classifier.predict(x)?;
        let probs = classifier.predict_proba(x)?;
        Ok(compute_partition_metrics(y, &preds, &probs))
    };

    let metrics = TaskMetrics {
        train: evaluate(&x_train_final, y_train)?,
        val: evaluate(&x_val_final, y_val)?,
        test: evaluate(&x_test_final, y_test)?,
    };

    info!(
        "🧮 [{}/{}] 학습 완료 - Train Acc {:.3}, Val Acc {:.3}, Test Acc {:.3}",
        dataset.task.as_str(),
        dataset.horizon.as_str(),
        metrics.train.accuracy,
        metrics.val.accuracy,
        metrics.test.accuracy
    );

    Ok(TrainedTask {
        classifier,
        scaler,
        pca,
        feature_names: dataset.feature_names.clone(),
        metrics,
    })
}

/// 저장된 전처리기/분류기로 신규 코퍼스의 3파티션 지표를 재계산 (평가 스크립트용)
pub fn evaluate_task(
    dataset: &TaskDataset,
    classifier: &Classifier,
    scaler: &RobustScaler,
    pca: Option<&Pca>,
) -> JusicResult<TaskMetrics> {
    let n = dataset.len();
    if n < MIN_SAMPLES {
        return Err(JusicError::training(format!(
            "[{}/{}] 평가 샘플 부족: {}개",
            dataset.task.as_str(),
            dataset.horizon.as_str(),
            n
        )));
    }

    let split = split_indices(n);

    let partition = |x: Array2<f64>, y: &[f64]| -> JusicResult<PartitionMetrics> {
        let scaled = scaler.transform(&x)?;
        let transformed = match pca {
            Some(p) => p.transform(&scaled)?,
            None => scaled,
        };
        let preds = classifier.predict(&transformed)?;
        let probs = classifier.predict_proba(&transformed)?;
        Ok(compute_partition_metrics(y, &preds, &probs))
    };

    Ok(TaskMetrics {
        train: partition(
            dataset.x.slice(s![..split.train_end, ..]).to_owned(),
            &dataset.y[..split.train_end],
        )?,
        val: partition(
            dataset.x.slice(s![split.train_end..split.val_end, ..]).to_owned(),
            &dataset.y[split.train_end..split.val_end],
        )?,
        test: partition(
            dataset.x.slice(s![split.val_end.., ..]).to_owned(),
            &dataset.y[split.val_end..],
        )?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Horizon;
    use chrono::NaiveDate;
    use ndarray::Array2;

    fn synthetic_dataset(task: Task, n: usize) -> TaskDataset {
        let start = NaiveDate::from_ymd_opt(2022, 1, 3).expect("date");
        let f = 4;
        let mut x = Array2::<f64>::zeros((n, f));
        let mut y = Vec::with_capacity(n);
        for i in 0..n {
            // 첫 특징이 라벨을 결정하는 학습 가능한 신호
            let signal = ((i * 13) % 17) as f64 / 17.0 - 0.5;
            x[[i, 0]] = signal;
            x[[i, 1]] = ((i * 7) % 11) as f64 / 11.0;
            x[[i, 2]] = ((i * 3) % 5) as f64 / 5.0;
            x[[i, 3]] = signal * 0.5 + ((i * 5) % 9) as f64 / 90.0;
            y.push(if signal > 0.0 { 1.0 } else { 0.0 });
        }
        TaskDataset {
            task,
            horizon: Horizon::D5,
            feature_names: vec!["f0".into(), "f1".into(), "f2".into(), "f3".into()],
            dates: (0..n)
                .map(|i| start + chrono::Duration::days(i as i64))
                .collect(),
            tickers: vec!["TEST.KS".to_string(); n],
            x,
            y,
            direction_median: if task == Task::Direction { Some(0.0) } else { None },
        }
    }

    #[test]
    fn test_split_boundaries_exact() {
        // 경계는 정확히 ⌊0.6N⌋, ⌊0.8N⌋
        let split = split_indices(100);
        assert_eq!(split.train_end, 60);
        assert_eq!(split.val_end, 80);

        let split = split_indices(7);
        assert_eq!(split.train_end, 4);
        assert_eq!(split.val_end, 5);

        // 분할은 전체를 정확히 한 번씩 덮는다
        for n in [1usize, 5, 49, 100, 1234] {
            let s = split_indices(n);
            assert!(s.train_end <= s.val_end && s.val_end <= n);
            let total = s.train_end + (s.val_end - s.train_end) + (n - s.val_end);
            assert_eq!(total, n);
        }
    }

    #[test]
    fn test_train_task_volatility_structure() {
        let dataset = synthetic_dataset(Task::Volatility, 200);
        let trained = train_task(&dataset).expect("train");

        assert!(trained.pca.is_none());
        assert_eq!(trained.feature_names.len(), 4);
        assert_eq!(trained.metrics.train.n, 120);
        assert_eq!(trained.metrics.val.n, 40);
        assert_eq!(trained.metrics.test.n, 40);
    }

    #[test]
    fn test_train_task_risk_learns_signal() {
        let dataset = synthetic_dataset(Task::Risk, 200);
        let trained = train_task(&dataset).expect("train");

        assert!(trained.pca.is_none());
        assert!(trained.metrics.train.accuracy > 0.6);
    }

    #[test]
    fn test_train_task_direction_has_pca() {
        let dataset = synthetic_dataset(Task::Direction, 200);
        let trained = train_task(&dataset).expect("train");
        let pca = trained.pca.expect("direction task should fit PCA");
        assert!(pca.n_components() >= 1);
        assert!(pca.n_components() <= 4);
    }

    #[test]
    fn test_scaler_fit_on_train_slice_only() {
        // 파이프라인이 학습 구간에만 스케일러를 적합시키는지 확인:
        // 검증 구간 분포를 크게 바꿔도 학습된 스케일러 파라미터가 같아야 함
        let base = synthetic_dataset(Task::Risk, 100);
        let mut shifted = synthetic_dataset(Task::Risk, 100);
        let split = split_indices(100);
        for i in split.train_end..100 {
            for j in 0..4 {
                shifted.x[[i, j]] += 1000.0;
            }
        }

        let a = train_task(&base).expect("train base");
        let b = train_task(&shifted).expect("train shifted");

        let x_probe = Array2::from_shape_vec((1, 4), vec![0.1, 0.2, 0.3, 0.4]).expect("shape");
        let ta = a.scaler.transform(&x_probe).expect("transform a");
        let tb = b.scaler.transform(&x_probe).expect("transform b");
        for (va, vb) in ta.iter().zip(tb.iter()) {
            assert!((va - vb).abs() < 1e-12, "스케일러가 검증 구간을 보았습니다");
        }
    }

    #[test]
    fn test_too_small_dataset_is_error() {
        let dataset = synthetic_dataset(Task::Risk, 10);
        assert!(train_task(&dataset).is_err());
    }

    #[test]
    fn test_evaluate_task_matches_shapes() {
        let dataset = synthetic_dataset(Task::Risk, 120);
        let trained = train_task(&dataset).expect("train");
        let metrics = evaluate_task(
            &dataset,
            &trained.classifier,
            &trained.scaler,
            trained.pca.as_ref(),
        )
        .expect("evaluate");
        assert_eq!(metrics.train.n, 72);
        assert_eq!(metrics.test.n, 24);
    }
}
