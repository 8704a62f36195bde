use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::errors::JusicResult;
use crate::labels::{Horizon, Task};
use crate::model::TaskMetrics;

/// (과제, 기간) 하나의 보고서 행 - 데이터 부족 조합은 지표 없이 기록
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportRow {
    pub task: String,
    pub horizon: String,
    pub metrics: Option<TaskMetrics>,
}

/// 모델 성능 보고서 (JSON/CSV)
#[derive(Debug, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub generated_date: NaiveDate,
    pub rows: Vec<ReportRow>,
}

impl PerformanceReport {
    pub fn new(generated_date: NaiveDate) -> Self {
        PerformanceReport {
            generated_date,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, task: Task, horizon: Horizon, metrics: Option<TaskMetrics>) {
        self.rows.push(ReportRow {
            task: task.as_str().to_string(),
            horizon: horizon.as_str().to_string(),
            metrics,
        });
    }

    /// CSV 직렬화 (파티션별 acc/f1/auc/n/pos_rate)
    pub fn to_csv(&self) -> String {
        let mut out = String::from(
            "task,horizon,\
             train_acc,train_f1,train_auc,train_n,train_pos_rate,\
             val_acc,val_f1,val_auc,val_n,val_pos_rate,\
             test_acc,test_f1,test_auc,test_n,test_pos_rate\n",
        );

        for row in &self.rows {
            out.push_str(&row.task);
            out.push(',');
            out.push_str(&row.horizon);

            match &row.metrics {
                Some(m) => {
                    for p in [&m.train, &m.val, &m.test] {
                        let auc = p
                            .auc
                            .map(|v| format!("{:.4}", v))
                            .unwrap_or_default();
                        out.push_str(&format!(
                            ",{:.4},{:.4},{},{},{:.4}",
                            p.accuracy, p.f1, auc, p.n, p.pos_rate
                        ));
                    }
                }
                None => {
                    // 데이터 부족: 과제/기간만 기록
                    out.push_str(&",".repeat(15));
                }
            }
            out.push('\n');
        }
        out
    }

    /// JSON과 CSV 두 형식으로 저장
    pub fn write(&self, json_path: &str, csv_path: &str) -> JusicResult<()> {
        for path in [json_path, csv_path] {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }

        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(json_path, json)?;
        std::fs::write(csv_path, self.to_csv())?;

        info!("📋 성능 보고서 저장: {} / {}", json_path, csv_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PartitionMetrics;

    fn metrics() -> TaskMetrics {
        let p = PartitionMetrics {
            accuracy: 0.648,
            f1: 0.61,
            auc: Some(0.66),
            n: 1000,
            pos_rate: 0.48,
        };
        TaskMetrics {
            train: p.clone(),
            val: p.clone(),
            test: p,
        }
    }

    #[test]
    fn test_csv_row_with_metrics() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");
        let mut report = PerformanceReport::new(date);
        report.push(Task::Volatility, Horizon::D5, Some(metrics()));

        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[1].starts_with("volatility,5day,0.6480"));
        assert_eq!(lines[1].split(',').count(), 17);
    }

    #[test]
    fn test_csv_row_missing_data() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");
        let mut report = PerformanceReport::new(date);
        report.push(Task::Direction, Horizon::D10, None);

        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[1].starts_with("direction,10day,"));
        assert_eq!(lines[1].split(',').count(), 17);
    }

    #[test]
    fn test_auc_none_serialized_empty_in_csv() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");
        let mut m = metrics();
        m.test.auc = None;
        let mut report = PerformanceReport::new(date);
        report.push(Task::Risk, Horizon::D1, Some(m));

        let csv = report.to_csv();
        let lines: Vec<&str> = csv.lines().collect();
        let fields: Vec<&str> = lines[1].split(',').collect();
        // test_auc는 끝에서 3번째 필드
        assert_eq!(fields[14], "");
    }
}
