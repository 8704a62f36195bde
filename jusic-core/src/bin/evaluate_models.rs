use clap::Parser;
use tracing::{info, warn};

use jusic_core::bundle::ModelBundle;
use jusic_core::config::{set_global_config, Config};
use jusic_core::data::{load_flow_cache, load_macro_cache, PriceApi};
use jusic_core::dataset::DatasetBuilder;
use jusic_core::errors::{JusicError, JusicResult};
use jusic_core::labels::{Horizon, Task};
use jusic_core::pipeline::evaluate_task;
use jusic_core::report::PerformanceReport;
use jusic_core::universe;

/// 저장된 번들을 최신 데이터로 재평가해 성능 보고서를 생성
/// Direction 라벨은 번들에 저장된 학습 시점 중앙값을 그대로 재사용한다
#[derive(Parser)]
#[command(name = "evaluate_models")]
#[command(about = "Evaluate the stored 12-model bundle against fresh data")]
struct Args {
    /// 설정 파일 경로 (기본값: config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// 보고서 출력 디렉토리 (기본값: reports)
    #[arg(long, default_value = "reports")]
    report_dir: String,
}

fn main() -> JusicResult<()> {
    let args = Args::parse();

    jusic_core::init_tracing()
        .map_err(|e| JusicError::general(format!("로그 시스템 초기화 실패: {}", e)))?;

    info!("📊 모델 재평가 시작");

    let config = Config::load_from_file(&args.config)?;
    set_global_config(config.clone())?;

    // 번들 로드는 전부-아니면-무: 키 하나라도 빠지면 여기서 즉시 실패
    let bundle = ModelBundle::load(&config.bundle.bundle_path)?;

    let price_api = PriceApi::open(&config.database.daily_price_db_path)?;
    let macro_data = load_macro_cache(&config.cache.macro_cache_path, config.cache.max_age_hours)?;
    let flow_data = load_flow_cache(&config.cache.flow_cache_path, config.cache.max_age_hours)?;

    let builder = DatasetBuilder::new(
        &price_api,
        macro_data.as_ref(),
        flow_data.as_ref(),
        config.prediction.retry_attempts,
    );

    let tickers = universe::tickers();
    let today = chrono::Local::now().date_naive();
    let mut report = PerformanceReport::new(today);

    for task in Task::ALL {
        for horizon in Horizon::ALL {
            // Direction 라벨은 학습 시점 중앙값을 재사용해야 같은 라벨 정의로 평가된다
            let fixed_threshold = if task == Task::Direction {
                Some(bundle.median(horizon)?)
            } else {
                None
            };

            let dataset = match builder.build_with_direction_threshold(
                &tickers,
                task,
                horizon,
                fixed_threshold,
            )? {
                Some(dataset) => dataset,
                None => {
                    // 데이터 부족 조합은 과제/기간만 기록하고 계속 진행
                    warn!(
                        "[{}/{}] 평가 데이터 없음 - 결측으로 기록",
                        task.as_str(),
                        horizon.as_str()
                    );
                    report.push(task, horizon, None);
                    continue;
                }
            };

            let model = bundle.get(task, horizon)?;
            match evaluate_task(&dataset, &model.classifier, &model.scaler, model.pca.as_ref()) {
                Ok(metrics) => {
                    info!(
                        "[{}/{}] Test Acc {:.3}, F1 {:.3}",
                        task.as_str(),
                        horizon.as_str(),
                        metrics.test.accuracy,
                        metrics.test.f1
                    );
                    report.push(task, horizon, Some(metrics));
                }
                Err(e) => {
                    warn!(
                        "[{}/{}] 평가 실패 - 결측으로 기록: {}",
                        task.as_str(),
                        horizon.as_str(),
                        e
                    );
                    report.push(task, horizon, None);
                }
            }
        }
    }

    let json_path = format!("{}/model_performance_report.json", args.report_dir);
    let csv_path = format!("{}/model_performance_report.csv", args.report_dir);
    report.write(&json_path, &csv_path)?;

    info!("✅ 재평가 완료");
    Ok(())
}
