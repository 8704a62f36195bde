use serde::{Deserialize, Serialize};

/// 한 파티션(train/val/test)의 성능 지표
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionMetrics {
    pub accuracy: f64,
    /// 클래스 지지도 가중 F1
    pub f1: f64,
    /// ROC-AUC - 파티션에 클래스가 하나뿐이면 None
    pub auc: Option<f64>,
    pub n: usize,
    pub pos_rate: f64,
}

/// (과제, 기간) 모델 하나의 3파티션 지표
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetrics {
    pub train: PartitionMetrics,
    pub val: PartitionMetrics,
    pub test: PartitionMetrics,
}

pub fn accuracy(y_true: &[f64], y_pred: &[u8]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let correct = y_true
        .iter()
        .zip(y_pred.iter())
        .filter(|(&t, &p)| t == p as f64)
        .count();
    correct as f64 / y_true.len() as f64
}

/// 클래스별 F1을 지지도로 가중 평균
pub fn weighted_f1(y_true: &[f64], y_pred: &[u8]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }

    let mut total = 0.0;
    for class in [0.0, 1.0] {
        let support = y_true.iter().filter(|&&t| t == class).count();
        if support == 0 {
            continue;
        }

        let tp = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(&t, &p)| t == class && p as f64 == class)
            .count() as f64;
        let pred_count = y_pred.iter().filter(|&&p| p as f64 == class).count() as f64;

        let precision = if pred_count > 0.0 { tp / pred_count } else { 0.0 };
        let recall = tp / support as f64;
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        total += f1 * support as f64 / y_true.len() as f64;
    }
    total
}

/// ROC-AUC (순위 기반, 동점은 평균 순위)
/// 파티션에 클래스가 하나뿐이면 정의되지 않음 (None)
pub fn roc_auc(y_true: &[f64], scores: &[f64]) -> Option<f64> {
    let n_pos = y_true.iter().filter(|&&t| t == 1.0).count();
    let n_neg = y_true.len() - n_pos;
    if n_pos == 0 || n_neg == 0 {
        return None;
    }

    // 점수 오름차순 순위 (동점은 평균 순위)
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; scores.len()];
    let mut i = 0;
    while i < order.len() {
        let mut j = i;
        while j + 1 < order.len() && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        // i..=j 구간이 동점 - 평균 순위 부여 (1부터 시작)
        let avg_rank = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        i = j + 1;
    }

    let pos_rank_sum: f64 = y_true
        .iter()
        .zip(ranks.iter())
        .filter(|(&t, _)| t == 1.0)
        .map(|(_, &r)| r)
        .sum();

    let auc = (pos_rank_sum - (n_pos * (n_pos + 1)) as f64 / 2.0) / (n_pos * n_neg) as f64;
    Some(auc)
}

/// 예측/확률로부터 파티션 지표 계산
pub fn compute_partition_metrics(y_true: &[f64], y_pred: &[u8], scores: &[f64]) -> PartitionMetrics {
    let n = y_true.len();
    let pos_rate = if n > 0 {
        y_true.iter().filter(|&&t| t == 1.0).count() as f64 / n as f64
    } else {
        0.0
    };

    PartitionMetrics {
        accuracy: accuracy(y_true, y_pred),
        f1: weighted_f1(y_true, y_pred),
        auc: roc_auc(y_true, scores),
        n,
        pos_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy() {
        let y = vec![1.0, 0.0, 1.0, 0.0];
        let pred = vec![1, 0, 0, 0];
        assert_eq!(accuracy(&y, &pred), 0.75);
    }

    #[test]
    fn test_perfect_f1() {
        let y = vec![1.0, 0.0, 1.0, 0.0];
        let pred = vec![1, 0, 1, 0];
        assert!((weighted_f1(&y, &pred) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_auc_perfect_ranking() {
        let y = vec![0.0, 0.0, 1.0, 1.0];
        let scores = vec![0.1, 0.2, 0.8, 0.9];
        assert_eq!(roc_auc(&y, &scores), Some(1.0));
    }

    #[test]
    fn test_auc_random_ranking() {
        let y = vec![0.0, 1.0, 0.0, 1.0];
        let scores = vec![0.5, 0.5, 0.5, 0.5];
        // 모든 점수가 동일하면 AUC 0.5
        assert_eq!(roc_auc(&y, &scores), Some(0.5));
    }

    #[test]
    fn test_auc_single_class_is_none() {
        let y = vec![1.0, 1.0, 1.0];
        let scores = vec![0.1, 0.5, 0.9];
        assert_eq!(roc_auc(&y, &scores), None);
    }

    #[test]
    fn test_partition_metrics() {
        let y = vec![1.0, 0.0, 1.0, 0.0];
        let pred = vec![1, 0, 1, 1];
        let scores = vec![0.9, 0.2, 0.8, 0.6];
        let m = compute_partition_metrics(&y, &pred, &scores);

        assert_eq!(m.n, 4);
        assert_eq!(m.pos_rate, 0.5);
        assert_eq!(m.accuracy, 0.75);
        assert_eq!(m.auc, Some(1.0));
    }
}
