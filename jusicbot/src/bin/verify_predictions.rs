use chrono::NaiveDate;
use clap::Parser;
use serde::Serialize;
use serde_json::json;
use std::path::PathBuf;
use tracing::{info, warn};

use jusic_core::config::{set_global_config, Config};
use jusic_core::data::PriceApi;
use jusic_core::errors::{JusicError, JusicResult};
use jusic_core::predictor::PredictionSnapshot;

/// 어제의 1일 예측 스냅샷을 실제 종가와 대조
/// 스냅샷은 불변 기준점 - 추천 상위 3개만 검증한다
#[derive(Parser)]
#[command(name = "verify_predictions")]
#[command(about = "Verify yesterday's 1-day predictions against realized prices")]
struct Args {
    /// 설정 파일 경로 (기본값: config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// 며칠 전 예측을 검증할지 (기본값: 1)
    #[arg(long, default_value_t = 1)]
    days_back: i64,
}

#[derive(Debug, Serialize)]
struct VerifiedStock {
    ticker: String,
    #[serde(rename = "stockName")]
    stock_name: String,
    score: f64,
    predicted_direction: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    actual_return: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    correct: Option<bool>,
}

/// 예측 파일 탐색: 날짜별 파일 → 호환용 최신 파일 → 가장 최근 날짜별 파일
fn find_prediction_file(dir: &std::path::Path, date: NaiveDate) -> Option<PathBuf> {
    let dated = dir.join(format!("predictions_1day_{}.json", date));
    if dated.exists() {
        return Some(dated);
    }

    let legacy = dir.join("today_predictions_1day.json");
    if legacy.exists() {
        warn!("날짜별 예측 파일이 없어 호환용 파일을 사용합니다");
        return Some(legacy);
    }

    // predictions_1day_*.json 중 사전순 최대 = 가장 최근 날짜
    let mut newest: Option<PathBuf> = None;
    let entries = std::fs::read_dir(dir).ok()?;
    for entry in entries.flatten() {
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with("predictions_1day_") && name.ends_with(".json") {
            let path = entry.path();
            if newest
                .as_ref()
                .map(|cur| path.file_name() > cur.file_name())
                .unwrap_or(true)
            {
                newest = Some(path);
            }
        }
    }
    if newest.is_some() {
        warn!("가장 최근 예측 파일로 대체합니다");
    }
    newest
}

/// 추천 점수: 상승 예측 +100, 안전 +50, 저변동 +30, 상승 확률 x100
fn recommendation_score(entry: &jusic_core::predictor::SnapshotEntry) -> f64 {
    let upward_prob = if entry.direction.prediction == 1 {
        entry.direction.probability
    } else {
        1.0 - entry.direction.probability
    };

    let mut score = 0.0;
    if entry.direction.prediction == 1 {
        score += 100.0;
    }
    if entry.risk.prediction == 0 {
        score += 50.0;
    }
    if entry.volatility.prediction == 0 {
        score += 30.0;
    }
    score + upward_prob * 100.0
}

fn main() -> JusicResult<()> {
    let args = Args::parse();

    jusic_core::init_tracing()
        .map_err(|e| JusicError::general(format!("로그 시스템 초기화 실패: {}", e)))?;

    let config = Config::load_from_file(&args.config)?;
    set_global_config(config.clone())?;

    let today = chrono::Local::now().date_naive();
    let prediction_day = today - chrono::Duration::days(args.days_back);

    let dir = std::path::Path::new(&config.prediction.output_dir);
    let file = find_prediction_file(dir, prediction_day).ok_or_else(|| {
        JusicError::prediction(format!(
            "검증할 예측 파일을 찾을 수 없습니다: {}",
            dir.display()
        ))
    })?;

    info!("검증 대상 파일: {}", file.display());
    let snapshot = PredictionSnapshot::load(&file)?;

    // 추천 점수 상위 3개 선별
    let mut entries: Vec<_> = snapshot.predictions.values().collect();
    entries.sort_by(|a, b| {
        recommendation_score(b)
            .partial_cmp(&recommendation_score(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(3);

    let price_api = PriceApi::open(&config.database.daily_price_db_path)?;

    let mut verified = Vec::with_capacity(entries.len());
    let mut correct_count = 0usize;
    let mut checked_count = 0usize;
    let mut total_return = 0.0;

    for entry in &entries {
        let realized = price_api.close_on_or_after(&entry.ticker, snapshot.target_date)?;

        let (actual_return, correct) = match realized {
            Some((_, close)) if entry.current_price > 0.0 => {
                let ret = (close - entry.current_price) / entry.current_price;
                let was_correct = (entry.direction.prediction == 1) == (ret > 0.0);
                checked_count += 1;
                if was_correct {
                    correct_count += 1;
                }
                total_return += ret;
                (Some(ret), Some(was_correct))
            }
            _ => {
                warn!("{} 실제 종가를 찾을 수 없습니다 - 건너뜀", entry.ticker);
                (None, None)
            }
        };

        verified.push(VerifiedStock {
            ticker: entry.ticker.clone(),
            stock_name: entry.stock_name.clone(),
            score: recommendation_score(entry),
            predicted_direction: if entry.direction.prediction == 1 {
                "상승".to_string()
            } else {
                "하락".to_string()
            },
            actual_return,
            correct,
        });
    }

    let accuracy = if checked_count > 0 {
        correct_count as f64 / checked_count as f64
    } else {
        0.0
    };
    let avg_return = if checked_count > 0 {
        total_return / checked_count as f64
    } else {
        0.0
    };

    let result = json!({
        "recommendations": verified,
        "accuracy": accuracy,
        "total_return": total_return,
        "avg_return": avg_return,
        "prediction_date": snapshot.prediction_date,
        "target_date": snapshot.target_date,
        "verification_date": today,
        "prediction_file": file.to_string_lossy(),
    });

    println!("{}", serde_json::to_string_pretty(&result)?);

    info!(
        "✅ 검증 완료: {}/{}개 적중 (정확도 {:.1}%)",
        correct_count,
        checked_count,
        accuracy * 100.0
    );
    Ok(())
}
