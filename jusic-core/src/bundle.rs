use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::errors::{JusicError, JusicResult};
use crate::labels::{Horizon, Task};
use crate::model::{Classifier, Pca, RobustScaler, TaskMetrics};

/// (과제, 기간) 하나의 저장 단위: 분류기 + 전처리기 + 특징 목록 + 기록된 성능
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskModel {
    pub classifier: Classifier,
    pub scaler: RobustScaler,
    pub pca: Option<Pca>,
    pub feature_names: Vec<String>,
    pub metrics: TaskMetrics,
}

/// 12개 모델 번들
/// 학습 파이프라인이 통째로 만들고 통째로 교체한다 - 부분 갱신 없음
/// 키는 (Task, Horizon) enum 쌍 - 문자열 키 분해로 구조를 추측하지 않는다
#[derive(Debug, Serialize, Deserialize)]
pub struct ModelBundle {
    pub version: u32,
    pub trained_date: NaiveDate,
    models: BTreeMap<(Task, Horizon), TaskModel>,
    /// Direction 라벨 임계값 (기간별 학습 코퍼스 중앙값) - 학습/평가 간 일관성의 근거
    medians: BTreeMap<Horizon, f64>,
}

pub const BUNDLE_VERSION: u32 = 1;

impl ModelBundle {
    pub fn new(trained_date: NaiveDate) -> Self {
        ModelBundle {
            version: BUNDLE_VERSION,
            trained_date,
            models: BTreeMap::new(),
            medians: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, task: Task, horizon: Horizon, model: TaskModel) {
        self.models.insert((task, horizon), model);
    }

    pub fn set_median(&mut self, horizon: Horizon, median: f64) {
        self.medians.insert(horizon, median);
    }

    /// 필수 키 조회 - 없으면 번들 무결성 오류 (기본값 대체 금지)
    pub fn get(&self, task: Task, horizon: Horizon) -> JusicResult<&TaskModel> {
        self.models.get(&(task, horizon)).ok_or_else(|| {
            JusicError::bundle_integrity(format!(
                "{}_{} 모델이 번들에 없습니다",
                task.as_str(),
                horizon.as_str()
            ))
        })
    }

    pub fn median(&self, horizon: Horizon) -> JusicResult<f64> {
        self.medians.get(&horizon).copied().ok_or_else(|| {
            JusicError::bundle_integrity(format!(
                "direction_{} 중앙값이 번들에 없습니다",
                horizon.as_str()
            ))
        })
    }

    /// 전체 무결성 검증 - 12개 키와 기간별 중앙값이 전부 있어야 통과
    /// 로드 시점에 즉시 실행되어 불완전한 번들이 서비스되는 것을 막는다
    pub fn validate(&self) -> JusicResult<()> {
        for task in Task::ALL {
            for horizon in Horizon::ALL {
                let model = self.get(task, horizon)?;
                if model.feature_names.is_empty() {
                    return Err(JusicError::bundle_integrity(format!(
                        "{}_{} 특징 목록이 비어있습니다",
                        task.as_str(),
                        horizon.as_str()
                    )));
                }
            }
        }
        for horizon in Horizon::ALL {
            self.median(horizon)?;
        }
        Ok(())
    }

    /// 원자적 저장: 같은 디렉토리의 임시 파일에 쓴 뒤 rename으로 교체
    /// 동시에 읽는 추론 프로세스가 중간 상태를 볼 수 없게 하는 필수 불변식
    pub fn save(&self, path: &str) -> JusicResult<()> {
        self.validate()?;

        let path = Path::new(path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let encoded = bincode::serialize(self)?;

        let tmp_path = path.with_extension("tmp");
        std::fs::write(&tmp_path, &encoded)?;
        std::fs::rename(&tmp_path, path)?;

        info!(
            "💾 모델 번들 저장 완료: {} ({}개 모델, {}바이트)",
            path.display(),
            self.models.len(),
            encoded.len()
        );
        Ok(())
    }

    /// 전부-아니면-무 로드: 역직렬화 직후 무결성 검증까지 통과해야 반환
    pub fn load(path: &str) -> JusicResult<Self> {
        if !Path::new(path).exists() {
            return Err(JusicError::bundle_integrity(format!(
                "번들 파일이 없습니다: {} (train_multitf를 먼저 실행하세요)",
                path
            )));
        }

        let encoded = std::fs::read(path)?;
        let bundle: ModelBundle = bincode::deserialize(&encoded)?;
        bundle.validate()?;

        info!(
            "모델 번들 로드 완료: {} (학습일 {}, {}개 모델)",
            path,
            bundle.trained_date,
            bundle.models.len()
        );
        Ok(bundle)
    }
}
