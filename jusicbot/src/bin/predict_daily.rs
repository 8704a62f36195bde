use clap::Parser;
use tracing::info;

use jusic_core::config::{set_global_config, Config};
use jusic_core::errors::{JusicError, JusicResult};
use jusic_core::labels::Horizon;
use jusic_core::predictor::{write_snapshot, PredictionSnapshot, Predictor, Recommendation};

/// 기간별 일일 예측 스냅샷 생성
/// predictions_{timeframe}_{날짜}.json (불변) + today_predictions_{timeframe}.json (최신)
#[derive(Parser)]
#[command(name = "predict_daily")]
#[command(about = "Write the daily prediction snapshot for one timeframe")]
struct Args {
    /// 예측 기간 (1day/3day/5day/10day)
    #[arg(default_value = "5day")]
    timeframe: String,

    /// 설정 파일 경로 (기본값: config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: String,
}

fn main() -> JusicResult<()> {
    let args = Args::parse();

    jusic_core::init_tracing()
        .map_err(|e| JusicError::general(format!("로그 시스템 초기화 실패: {}", e)))?;

    let horizon = Horizon::parse(&args.timeframe)?;
    info!("🚀 일일 예측 시작 - {}", horizon.as_str());

    let config = Config::load_from_file(&args.config)?;
    set_global_config(config.clone())?;

    let predictor = Predictor::from_config(&config)?;
    let predictions = predictor.rank_universe(horizon);

    if predictions.is_empty() {
        return Err(JusicError::prediction(
            "예측에 성공한 종목이 없습니다 - 일봉 DB를 확인하세요".to_string(),
        ));
    }

    let today = chrono::Local::now().date_naive();
    let snapshot = PredictionSnapshot::build(horizon, today, &predictions);
    let (dated_path, legacy_path) = write_snapshot(&config.prediction.output_dir, &snapshot)?;

    info!("저장 완료: {}", dated_path.display());
    info!("호환용: {}", legacy_path.display());

    // 배치 통계
    let total = predictions.len();
    let safe = predictions.iter().filter(|p| p.risk.prediction == 0).count();
    let upward = predictions
        .iter()
        .filter(|p| p.direction.prediction == 1)
        .count();
    let low_vol = predictions
        .iter()
        .filter(|p| p.volatility.prediction == 0)
        .count();

    info!("📊 예측 통계: 총 {}개 종목", total);
    info!("  안전 종목: {}개 ({:.1}%)", safe, safe as f64 / total as f64 * 100.0);
    info!("  상승 예상: {}개 ({:.1}%)", upward, upward as f64 / total as f64 * 100.0);
    info!("  저변동성: {}개 ({:.1}%)", low_vol, low_vol as f64 / total as f64 * 100.0);

    info!("🏆 TOP 5 추천 종목:");
    for (i, pred) in predictions.iter().take(5).enumerate() {
        let rec = Recommendation::from_score(pred.score);
        info!(
            "  {}. {}: {} (점수: {:+.3})",
            i + 1,
            pred.name,
            rec.grade(),
            pred.score
        );
    }

    Ok(())
}
