use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

use crate::errors::JusicResult;

/// 거시경제 시계열의 한 점 (일봉 종가)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroPoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// 거시경제 캐시 데이터
/// KOSPI 지수, 원/달러 환율, VIX, S&P 500 — 외부 수집기가 JSON으로 기록한다
/// 비어있는 시리즈는 해당 피처를 생략하는 것으로 처리 (Direction 모델이 기술적 피처만으로 동작)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacroData {
    #[serde(default)]
    pub kospi: Vec<MacroPoint>,
    #[serde(default)]
    pub usd_krw: Vec<MacroPoint>,
    #[serde(default)]
    pub vix: Vec<MacroPoint>,
    #[serde(default)]
    pub sp500: Vec<MacroPoint>,
}

impl MacroData {
    pub fn is_empty(&self) -> bool {
        self.kospi.is_empty()
            && self.usd_krw.is_empty()
            && self.vix.is_empty()
            && self.sp500.is_empty()
    }
}

/// 거시경제 캐시 로드 (캐시 우선, 신선도 검사)
/// 파일이 없으면 None — 호출자는 거시경제 피처 없이 진행한다
pub fn load_macro_cache(path: &str, max_age_hours: u64) -> JusicResult<Option<MacroData>> {
    let path = Path::new(path);

    if !path.exists() {
        warn!("거시경제 캐시가 없습니다: {} (거시경제 피처 생략)", path.display());
        return Ok(None);
    }

    if let Some(age) = super::cache_age_hours(path) {
        if age > max_age_hours {
            warn!(
                "거시경제 캐시가 오래되었습니다: {}시간 경과 (한계 {}시간) - 그대로 사용",
                age, max_age_hours
            );
        }
    }

    let content = std::fs::read_to_string(path)?;
    let data: MacroData = serde_json::from_str(&content)?;

    info!(
        "거시경제 캐시 로드 완료: KOSPI {}일, USD/KRW {}일, VIX {}일, S&P500 {}일",
        data.kospi.len(),
        data.usd_krw.len(),
        data.vix.len(),
        data.sp500.len()
    );

    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_cache_is_none() {
        let result = load_macro_cache("no_such_macro_cache.json", 24).expect("load");
        assert!(result.is_none());
    }

    #[test]
    fn test_load_cache() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(
            br#"{"kospi": [{"date": "2024-01-02", "close": 2669.8}, {"date": "2024-01-03", "close": 2607.3}]}"#,
        )
        .expect("write cache");

        let data = load_macro_cache(file.path().to_str().expect("path"), 24)
            .expect("load")
            .expect("cache present");
        assert_eq!(data.kospi.len(), 2);
        assert!(data.usd_krw.is_empty());
        assert_eq!(data.kospi[0].close, 2669.8);
    }
}
