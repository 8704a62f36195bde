use thiserror::Error;

/// jusic 시스템의 모든 오류 타입을 정의하는 enum
/// 각 오류는 구체적인 컨텍스트 정보를 포함하여 디버깅과 사용자 경험을 개선
#[derive(Error, Debug)]
pub enum JusicError {
    /// 외부 데이터 조회 결과가 비어있는 경우 (해당 종목은 건너뜀)
    #[error("종목 데이터 없음: {ticker} (조회 기간: {days}일)")]
    DataUnavailable { ticker: String, days: i64 },

    /// 윈도우 특징 계산에 필요한 최소 봉 수 미달
    #[error("데이터 부족: {ticker} - {have}개 봉 (최소 {need}개 필요)")]
    InsufficientHistory {
        ticker: String,
        have: usize,
        need: usize,
    },

    /// 모델 번들 무결성 오류 (일부만 로드된 번들은 절대 서비스하지 않음)
    #[error("모델 번들 무결성 오류: {reason}")]
    BundleIntegrity { reason: String },

    /// 저장된 특징 이름이 추론 시점 프레임에 없는 경우
    #[error("특징 불일치: '{feature}' 특징이 없습니다 ({task} 모델)")]
    FeatureMismatch { feature: String, task: String },

    /// 외부 서비스(캐시 파일, 수집기) 관련 오류
    #[error("외부 데이터 오류: {source_name} - {reason}")]
    ExternalService { source_name: String, reason: String },

    /// 데이터베이스 관련 오류
    #[error("데이터베이스 오류: {operation} - {reason}")]
    Database { operation: String, reason: String },

    /// 설정 관련 오류 (config.rs의 ConfigError와 연동)
    #[error("설정 오류: {0}")]
    Config(#[from] crate::config::ConfigError),

    /// 데이터 파싱 오류
    #[error("파싱 오류: {data_type} 파싱 실패 - {reason}")]
    Parsing { data_type: String, reason: String },

    /// 예측 관련 오류
    #[error("예측 오류: {message}")]
    Prediction { message: String },

    /// 학습 관련 오류
    #[error("학습 오류: {message}")]
    Training { message: String },

    /// 일반적인 I/O 오류
    #[error("I/O 오류: {operation} - {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// 일반적인 오류 (기타)
    #[error("오류: {message}")]
    General { message: String },
}

/// jusic 시스템에서 사용하는 Result 타입 별칭
/// 모든 함수가 이 타입을 반환하여 일관된 오류 처리를 제공
pub type JusicResult<T> = Result<T, JusicError>;

impl JusicError {
    /// 종목 데이터 없음 오류를 간편하게 생성하는 헬퍼 함수
    pub fn data_unavailable(ticker: impl Into<String>, days: i64) -> Self {
        Self::DataUnavailable {
            ticker: ticker.into(),
            days,
        }
    }

    /// 데이터 부족 오류를 간편하게 생성하는 헬퍼 함수
    pub fn insufficient_history(ticker: impl Into<String>, have: usize, need: usize) -> Self {
        Self::InsufficientHistory {
            ticker: ticker.into(),
            have,
            need,
        }
    }

    /// 번들 무결성 오류를 간편하게 생성하는 헬퍼 함수
    pub fn bundle_integrity(reason: impl Into<String>) -> Self {
        Self::BundleIntegrity {
            reason: reason.into(),
        }
    }

    /// 특징 불일치 오류를 간편하게 생성하는 헬퍼 함수
    pub fn feature_mismatch(feature: impl Into<String>, task: impl Into<String>) -> Self {
        Self::FeatureMismatch {
            feature: feature.into(),
            task: task.into(),
        }
    }

    /// 외부 서비스 오류를 간편하게 생성하는 헬퍼 함수
    pub fn external_service(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalService {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// 데이터베이스 오류를 간편하게 생성하는 헬퍼 함수
    pub fn database(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Database {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// 데이터베이스 쿼리 관련 오류를 생성하는 헬퍼 함수
    pub fn database_query(message: impl Into<String>) -> Self {
        Self::Database {
            operation: "쿼리 실행".to_string(),
            reason: message.into(),
        }
    }

    /// 데이터 파싱 오류를 간편하게 생성하는 헬퍼 함수
    pub fn parsing(data_type: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Parsing {
            data_type: data_type.into(),
            reason: reason.into(),
        }
    }

    /// 예측 관련 오류를 생성하는 헬퍼 함수
    pub fn prediction(message: impl Into<String>) -> Self {
        Self::Prediction {
            message: message.into(),
        }
    }

    /// 학습 관련 오류를 생성하는 헬퍼 함수
    pub fn training(message: impl Into<String>) -> Self {
        Self::Training {
            message: message.into(),
        }
    }

    /// 일반적인 오류를 생성하는 헬퍼 함수
    pub fn general(message: impl Into<String>) -> Self {
        Self::General {
            message: message.into(),
        }
    }
}

/// Rusqlite 데이터베이스 오류를 JusicError로 변환
impl From<rusqlite::Error> for JusicError {
    fn from(error: rusqlite::Error) -> Self {
        let operation = match &error {
            rusqlite::Error::SqliteFailure(_, _) => "SQL 실행",
            rusqlite::Error::InvalidPath(_) => "경로 확인",
            rusqlite::Error::InvalidColumnIndex(_) => "컬럼 인덱스",
            rusqlite::Error::InvalidColumnName(_) => "컬럼 이름",
            rusqlite::Error::InvalidColumnType(_, _, _) => "컬럼 타입",
            _ => "데이터베이스 작업",
        };

        JusicError::Database {
            operation: operation.to_string(),
            reason: error.to_string(),
        }
    }
}

/// std::io::Error를 JusicError로 변환
impl From<std::io::Error> for JusicError {
    fn from(error: std::io::Error) -> Self {
        JusicError::Io {
            operation: "파일 I/O".to_string(),
            source: error,
        }
    }
}

/// serde_json 오류를 JusicError로 변환 (캐시/스냅샷 파일 파싱)
impl From<serde_json::Error> for JusicError {
    fn from(error: serde_json::Error) -> Self {
        JusicError::Parsing {
            data_type: "JSON".to_string(),
            reason: error.to_string(),
        }
    }
}

/// bincode 직렬화 오류를 JusicError로 변환 (모델 번들)
impl From<bincode::Error> for JusicError {
    fn from(error: bincode::Error) -> Self {
        JusicError::Parsing {
            data_type: "모델 번들".to_string(),
            reason: error.to_string(),
        }
    }
}

/// &str을 JusicError로 변환
impl From<&str> for JusicError {
    fn from(message: &str) -> Self {
        JusicError::General {
            message: message.to_string(),
        }
    }
}

/// String을 JusicError로 변환
impl From<String> for JusicError {
    fn from(message: String) -> Self {
        JusicError::General { message }
    }
}
