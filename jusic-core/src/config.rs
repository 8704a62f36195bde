use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("설정 파일을 찾을 수 없습니다: {0}")]
    FileNotFound(String),
    #[error("설정 파일 읽기 오류: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("설정 파일 파싱 오류: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("설정 유효성 검증 실패: {0}")]
    ValidationError(String),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub cache: CacheConfig,
    pub bundle: BundleConfig,
    pub prediction: PredictionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    /// 일봉 OHLCV 데이터베이스 경로 (종목별 테이블)
    pub daily_price_db_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// 거시경제 시계열 캐시 파일 경로 (JSON)
    pub macro_cache_path: String,
    /// 투자자별 순매수 캐시 파일 경로 (JSON)
    pub flow_cache_path: String,
    /// 캐시 신선도 한계 (시간). 초과 시 경고 후 그대로 사용
    #[serde(default = "default_max_age_hours")]
    pub max_age_hours: u64,
}

fn default_max_age_hours() -> u64 {
    24
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BundleConfig {
    /// 12개 모델 번들 파일 경로 (bincode)
    pub bundle_path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct PredictionConfig {
    /// 예측 스냅샷 저장 디렉토리
    pub output_dir: String,
    /// 추론용 최근 가격 윈도우 (달력일 기준)
    #[serde(default = "default_window_days")]
    pub window_days: i64,
    /// 종목당 데이터 조회 재시도 횟수
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

fn default_window_days() -> i64 {
    45
}

fn default_retry_attempts() -> u32 {
    3
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
}

impl Config {
    /// config.toml 파일에서 설정을 로드
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("config.toml")
    }

    /// 지정된 파일에서 설정을 로드
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        if !Path::new(path).exists() {
            return Err(ConfigError::FileNotFound(format!(
                "{}가 없습니다. config.example.toml을 복사해서 config.toml을 만들고 설정을 채워주세요.",
                path
            )));
        }

        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;

        Ok(config)
    }

    /// 설정 유효성 검증
    fn validate(&self) -> Result<(), ConfigError> {
        if self.database.daily_price_db_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "daily_price_db_path가 비어있습니다".to_string(),
            ));
        }

        if self.bundle.bundle_path.is_empty() {
            return Err(ConfigError::ValidationError(
                "bundle_path가 비어있습니다".to_string(),
            ));
        }

        if self.prediction.window_days < 30 {
            return Err(ConfigError::ValidationError(
                "window_days는 최소 30일 이상이어야 합니다 (20봉 윈도우 특징 계산)".to_string(),
            ));
        }

        if self.prediction.retry_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry_attempts는 1 이상이어야 합니다".to_string(),
            ));
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => {
                return Err(ConfigError::ValidationError(
                    "log level은 'error', 'warn', 'info', 'debug', 'trace' 중 하나여야 합니다"
                        .to_string(),
                ))
            }
        }

        Ok(())
    }
}

/// 글로벌 설정 인스턴스 (한 번만 로드)
static GLOBAL_CONFIG: std::sync::OnceLock<Option<Config>> = std::sync::OnceLock::new();

/// 글로벌 설정 인스턴스를 가져오기
pub fn get_config() -> Result<&'static Config, ConfigError> {
    let config_option = GLOBAL_CONFIG.get_or_init(|| match Config::load() {
        Ok(config) => Some(config),
        Err(e) => {
            eprintln!("설정 로드 실패: {}", e);
            eprintln!("config.example.toml을 config.toml로 복사하고 설정을 채워주세요.");
            None
        }
    });

    config_option
        .as_ref()
        .ok_or_else(|| ConfigError::FileNotFound("설정을 로드할 수 없습니다".to_string()))
}

/// 전역 설정을 설정 (바이너리 진입점에서 사용)
pub fn set_global_config(config: Config) -> Result<(), ConfigError> {
    GLOBAL_CONFIG
        .set(Some(config))
        .map_err(|_| ConfigError::ValidationError("전역 설정이 이미 초기화되어 있습니다".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write config");
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(
            r#"
[database]
daily_price_db_path = "data/daily.db"

[cache]
macro_cache_path = "cached_data/macro.json"
flow_cache_path = "cached_data/flow.json"

[bundle]
bundle_path = "models/multi_timeframe.bundle"

[prediction]
output_dir = "predictions"

[logging]
level = "info"
"#,
        );

        let config = Config::load_from_file(file.path().to_str().expect("path"))
            .expect("config should load");
        assert_eq!(config.cache.max_age_hours, 24);
        assert_eq!(config.prediction.window_days, 45);
        assert_eq!(config.prediction.retry_attempts, 3);
    }

    #[test]
    fn test_window_days_lower_bound() {
        let file = write_config(
            r#"
[database]
daily_price_db_path = "data/daily.db"

[cache]
macro_cache_path = "cached_data/macro.json"
flow_cache_path = "cached_data/flow.json"

[bundle]
bundle_path = "models/multi_timeframe.bundle"

[prediction]
output_dir = "predictions"
window_days = 10

[logging]
level = "info"
"#,
        );

        let result = Config::load_from_file(file.path().to_str().expect("path"));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load_from_file("no_such_config.toml");
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }
}
