use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::errors::JusicResult;

/// 하루치 투자자별 순매수 금액 (원)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowPoint {
    pub date: NaiveDate,
    pub institution: f64,
    pub foreign: f64,
    pub individual: f64,
}

/// 종목별 투자자 순매수 캐시
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowData {
    #[serde(default)]
    pub stocks: HashMap<String, Vec<FlowPoint>>,
}

impl FlowData {
    pub fn get(&self, ticker: &str) -> Option<&[FlowPoint]> {
        self.stocks.get(ticker).map(|v| v.as_slice())
    }
}

/// 수급 피처의 출처 구분
/// Default는 캐시에 해당 종목이 아예 없을 때의 문서화된 근사치 (0.33/0.33/0.34)이며
/// 호출자가 실제 수급 데이터와 구분할 수 있도록 명시적으로 전달된다
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowMerge {
    Real,
    Default,
}

/// 투자자 순매수 캐시 로드 (캐시 우선, 신선도 검사)
/// 파일이 없으면 None — 전체 유니버스가 기본 비율 경로로 동작한다
pub fn load_flow_cache(path: &str, max_age_hours: u64) -> JusicResult<Option<FlowData>> {
    let path = Path::new(path);

    if !path.exists() {
        warn!(
            "투자자 순매수 캐시가 없습니다: {} (기본 비율 0.33/0.33/0.34 사용)",
            path.display()
        );
        return Ok(None);
    }

    if let Some(age) = super::cache_age_hours(path) {
        if age > max_age_hours {
            warn!(
                "투자자 순매수 캐시가 오래되었습니다: {}시간 경과 (한계 {}시간) - 그대로 사용",
                age, max_age_hours
            );
        }
    }

    let content = std::fs::read_to_string(path)?;
    let data: FlowData = serde_json::from_str(&content)?;

    info!("투자자 순매수 캐시 로드 완료: {}개 종목", data.stocks.len());

    Ok(Some(data))
}
