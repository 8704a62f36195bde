use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{error, info};

use jusic_core::bundle::{ModelBundle, TaskModel};
use jusic_core::config::{set_global_config, Config};
use jusic_core::data::{load_flow_cache, load_macro_cache, PriceApi};
use jusic_core::dataset::DatasetBuilder;
use jusic_core::errors::{JusicError, JusicResult};
use jusic_core::labels::{Horizon, Task};
use jusic_core::pipeline::train_task;
use jusic_core::report::PerformanceReport;
use jusic_core::universe;

/// 12개 (과제 x 기간) 모델 전체 재학습
/// 번들은 통째로 생성되어 기존 번들을 원자적으로 교체한다
#[derive(Parser)]
#[command(name = "train_multitf")]
#[command(about = "Multi-timeframe model training (12 models)")]
struct Args {
    /// 설정 파일 경로 (기본값: config.toml)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// 번들 출력 경로 (기본값: 설정 파일의 bundle_path)
    #[arg(long)]
    output: Option<String>,
}

fn main() -> JusicResult<()> {
    let args = Args::parse();

    jusic_core::init_tracing()
        .map_err(|e| JusicError::general(format!("로그 시스템 초기화 실패: {}", e)))?;

    info!("🚀 멀티 타임프레임 학습 시작!");
    info!("📁 설정 파일: {}", args.config);

    let config = Config::load_from_file(&args.config)?;
    set_global_config(config.clone())?;

    let bundle_path = args.output.unwrap_or_else(|| config.bundle.bundle_path.clone());

    // 외부 데이터 연결
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
    let mut bundle = ModelBundle::new(today);
    let mut report = PerformanceReport::new(today);

    let total = (Task::ALL.len() * Horizon::ALL.len()) as u64;
    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map_err(|e| JusicError::general(format!("진행 표시줄 템플릿 오류: {}", e)))?
            .progress_chars("#>-"),
    );

    for task in Task::ALL {
        for horizon in Horizon::ALL {
            pb.set_message(format!("{}_{}", task.as_str(), horizon.as_str()));

            let dataset = builder.build(&tickers, task, horizon)?;
            let dataset = match dataset {
                Some(dataset) => dataset,
                None => {
                    // 번들은 12개 키가 전부 있어야 하므로 조합 하나라도 비면 학습 중단
                    error!(
                        "❌ [{}/{}] 학습 데이터가 없습니다 - 일봉 DB와 캐시를 확인하세요",
                        task.as_str(),
                        horizon.as_str()
                    );
                    return Err(JusicError::training(format!(
                        "{}_{} 코퍼스가 비어있어 번들을 완성할 수 없습니다",
                        task.as_str(),
                        horizon.as_str()
                    )));
                }
            };

            let trained = train_task(&dataset)?;

            if task == Task::Direction {
                let median = dataset.direction_median.ok_or_else(|| {
                    JusicError::training("Direction 코퍼스에 중앙값이 없습니다".to_string())
                })?;
                bundle.set_median(horizon, median);
            }

            report.push(task, horizon, Some(trained.metrics.clone()));
            bundle.insert(
                task,
                horizon,
                TaskModel {
                    classifier: trained.classifier,
                    scaler: trained.scaler,
                    pca: trained.pca,
                    feature_names: trained.feature_names,
                    metrics: trained.metrics,
                },
            );

            pb.inc(1);
        }
    }
    pb.finish_with_message("학습 완료");

    bundle.save(&bundle_path)?;

    report.write(
        "reports/model_performance_report.json",
        "reports/model_performance_report.csv",
    )?;

    info!("✅ 12개 모델 학습 및 번들 저장 완료: {}", bundle_path);
    Ok(())
}
