use tracing_log::LogTracer;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Registry};

/// tracing 초기화 함수
/// env_logger 대신 사용하며, JSON 구조화 로그와 스팬 트레이싱을 제공합니다.
pub fn init_tracing() -> Result<(), String> {
    // 기존 log! 매크로 호환
    LogTracer::init().map_err(|e| {
        eprintln!("Failed to set LogTracer: {}", e);
        format!("로그 시스템 초기화 실패: {}", e)
    })?;

    // JSON 구조화 로그 + RUST_LOG 기반 레벨 필터링
    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().json().with_target(true));

    tracing::subscriber::set_global_default(subscriber).map_err(|e| {
        eprintln!("Failed to set tracing subscriber: {}", e);
        format!("로그 시스템 초기화 실패: {}", e)
    })?;

    Ok(())
}

/// 챗봇처럼 stdout이 JSON 전용인 프로세스용 - 로그를 stderr로 보냄
pub fn init_tracing_stderr() -> Result<(), String> {
    LogTracer::init().map_err(|e| format!("로그 시스템 초기화 실패: {}", e))?;

    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer().with_writer(std::io::stderr));

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| format!("로그 시스템 초기화 실패: {}", e))?;

    Ok(())
}

pub mod bundle;
pub mod config;
pub mod data;
pub mod dataset;
pub mod errors;
pub mod features;
pub mod labels;
pub mod model;
pub mod pipeline;
pub mod predictor;
pub mod report;
pub mod universe;
