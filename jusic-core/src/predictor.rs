use chrono::NaiveDate;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::bundle::{ModelBundle, TaskModel};
use crate::config::Config;
use crate::data::{load_flow_cache, load_macro_cache, FlowData, FlowMerge, MacroData, PriceApi};
use crate::errors::{JusicError, JusicResult};
use crate::features::{
    add_interaction_features, compute_technical_features, merge_flow_features,
    merge_macro_features, FeatureFrame,
};
use crate::labels::{Horizon, Task};
use crate::universe;

/// 특징 계산에 필요한 최소 봉 수 (20봉 윈도우 + 1)
const MIN_BARS: usize = 21;

/// 과제 하나의 예측 신호 (이진 라벨 + 양성 클래스 확률)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskSignal {
    pub prediction: u8,
    pub probability: f64,
}

/// 한 종목, 한 기간의 통합 예측
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockPrediction {
    pub ticker: String,
    pub name: String,
    pub timeframe: Horizon,
    pub direction: TaskSignal,
    pub volatility: TaskSignal,
    pub risk: TaskSignal,
    pub score: f64,
    pub price: f64,
    /// Direction 모델의 테스트 정확도 (참고용)
    pub accuracy: f64,
    /// 수급 피처 출처 (실제 데이터 vs 기본 비율)
    pub flow: FlowMerge,
}

/// 세 신호를 하나의 투자 점수로 결합 (고정 가중치 - 학습하지 않음)
/// 낮은 변동성과 낮은 위험이 유리하므로 두 신호는 부호를 뒤집는다
pub fn calculate_score(direction: TaskSignal, volatility: TaskSignal, risk: TaskSignal) -> f64 {
    let dir_signal = (2.0 * direction.prediction as f64 - 1.0) * direction.probability;
    let vol_signal = -(2.0 * volatility.prediction as f64 - 1.0) * volatility.probability;
    let risk_signal = -(2.0 * risk.prediction as f64 - 1.0) * risk.probability;

    0.35 * dir_signal + 0.40 * vol_signal + 0.25 * risk_signal
}

/// 추천 등급 (점수의 고정 임계값 계단 함수, 경계는 이상(>=) 포함)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Recommendation {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.3 {
            Recommendation::StrongBuy
        } else if score >= 0.1 {
            Recommendation::Buy
        } else if score >= -0.1 {
            Recommendation::Hold
        } else if score >= -0.3 {
            Recommendation::Sell
        } else {
            Recommendation::StrongSell
        }
    }

    pub fn grade(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "강력 매수",
            Recommendation::Buy => "매수",
            Recommendation::Hold => "보유",
            Recommendation::Sell => "매도",
            Recommendation::StrongSell => "강력 매도",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "🚀",
            Recommendation::Buy => "📈",
            Recommendation::Hold => "⏸️",
            Recommendation::Sell => "📉",
            Recommendation::StrongSell => "🔻",
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "STRONG_BUY",
            Recommendation::Buy => "BUY",
            Recommendation::Hold => "HOLD",
            Recommendation::Sell => "SELL",
            Recommendation::StrongSell => "STRONG_SELL",
        }
    }
}

/// 12개 모델 번들 기반 추론기
/// 학습과 동일한 특징 엔진을 사용하고, 저장된 스케일러/PCA/특징 목록을 그대로 적용한다
pub struct Predictor {
    bundle: ModelBundle,
    price_api: PriceApi,
    macro_data: Option<MacroData>,
    flow_data: Option<FlowData>,
    window_days: i64,
    retry_attempts: u32,
}

impl Predictor {
    pub fn new(
        bundle: ModelBundle,
        price_api: PriceApi,
        macro_data: Option<MacroData>,
        flow_data: Option<FlowData>,
        window_days: i64,
        retry_attempts: u32,
    ) -> Self {
        Predictor {
            bundle,
            price_api,
            macro_data,
            flow_data,
            window_days,
            retry_attempts,
        }
    }

    /// 설정 파일로부터 번들/일봉 DB/캐시를 모두 연결
    pub fn from_config(config: &Config) -> JusicResult<Self> {
        let bundle = ModelBundle::load(&config.bundle.bundle_path)?;
        let price_api = PriceApi::open(&config.database.daily_price_db_path)?;
        let macro_data = load_macro_cache(&config.cache.macro_cache_path, config.cache.max_age_hours)?;
        let flow_data = load_flow_cache(&config.cache.flow_cache_path, config.cache.max_age_hours)?;

        Ok(Predictor::new(
            bundle,
            price_api,
            macro_data,
            flow_data,
            config.prediction.window_days,
            config.prediction.retry_attempts,
        ))
    }

    pub fn bundle(&self) -> &ModelBundle {
        &self.bundle
    }

    /// 단일 행 추론용 값 추출
    /// 마지막 행 기준: 앞값 채우기 후에도 값이 없으면 0.0, ±Inf도 0.0
    /// (학습 경로의 행 제거와 달리 추론은 행이 하나뿐이라 명시적 대체를 쓴다)
    fn last_row_value(frame: &FeatureFrame, name: &str, task: Task) -> JusicResult<f64> {
        let column = frame
            .column(name)
            .ok_or_else(|| JusicError::feature_mismatch(name, task.as_str()))?;

        let value = column
            .iter()
            .rev()
            .find(|v| v.is_finite())
            .copied()
            .unwrap_or(0.0);
        Ok(value)
    }

    /// 저장된 특징 목록 순서대로 1xF 행렬 구성
    fn feature_row(frame: &FeatureFrame, model: &TaskModel, task: Task) -> JusicResult<Array2<f64>> {
        let mut row = Array2::<f64>::zeros((1, model.feature_names.len()));
        for (j, name) in model.feature_names.iter().enumerate() {
            row[[0, j]] = Self::last_row_value(frame, name, task)?;
        }
        Ok(row)
    }

    /// 과제 하나의 신호 계산 (스케일러 → (PCA) → 분류기)
    fn task_signal(&self, frame: &FeatureFrame, task: Task, horizon: Horizon) -> JusicResult<TaskSignal> {
        let model = self.bundle.get(task, horizon)?;
        let row = Self::feature_row(frame, model, task)?;

        let scaled = model.scaler.transform(&row)?;
        let transformed = match &model.pca {
            Some(pca) => pca.transform(&scaled)?,
            None => scaled,
        };

        let prediction = model.classifier.predict(&transformed)?[0];
        let probability = model.classifier.predict_proba(&transformed)?[0];

        Ok(TaskSignal {
            prediction,
            probability,
        })
    }

    /// 한 종목의 (기간별) 통합 예측
    /// 가격 조회 실패나 데이터 부족은 오류로 반환 - 호출 루프가 해당 종목을 건너뛴다
    pub fn predict_stock(&self, ticker: &str, horizon: Horizon) -> JusicResult<StockPrediction> {
        let series = self.price_api.get_daily_prices_with_retry(
            ticker,
            self.window_days,
            self.retry_attempts,
        )?;

        if series.len() < MIN_BARS {
            return Err(JusicError::insufficient_history(ticker, series.len(), MIN_BARS));
        }

        let mut frame = compute_technical_features(&series);

        if let Some(macro_data) = &self.macro_data {
            merge_macro_features(&mut frame, macro_data);
        }
        let flow = merge_flow_features(
            &mut frame,
            self.flow_data.as_ref().and_then(|f| f.get(ticker)),
        );
        add_interaction_features(&mut frame);

        let direction = self.task_signal(&frame, Task::Direction, horizon)?;
        let volatility = self.task_signal(&frame, Task::Volatility, horizon)?;
        let risk = self.task_signal(&frame, Task::Risk, horizon)?;

        let score = calculate_score(direction, volatility, risk);
        let price = series
            .last_close()
            .ok_or_else(|| JusicError::prediction(format!("{} 종가가 없습니다", ticker)))?;

        let accuracy = self
            .bundle
            .get(Task::Direction, horizon)?
            .metrics
            .test
            .accuracy;

        debug!(
            "{} [{}] 예측: 방향 {}({:.3}), 변동성 {}({:.3}), 위험 {}({:.3}) -> 점수 {:+.3}",
            ticker,
            horizon.as_str(),
            direction.prediction,
            direction.probability,
            volatility.prediction,
            volatility.probability,
            risk.prediction,
            risk.probability,
            score
        );

        Ok(StockPrediction {
            ticker: ticker.to_string(),
            name: universe::stock_name(ticker).to_string(),
            timeframe: horizon,
            direction,
            volatility,
            risk,
            score,
            price,
            accuracy,
            flow,
        })
    }

    /// 전체 유니버스 예측 + 점수 내림차순 순위
    /// 개별 종목 실패는 경고 후 건너뜀 - 배치 전체를 중단하지 않는다
    /// 정렬은 안정 정렬이므로 동점은 입력(유니버스) 순서를 유지한다
    pub fn rank_universe(&self, horizon: Horizon) -> Vec<StockPrediction> {
        let tickers = universe::tickers();
        let mut results = Vec::with_capacity(tickers.len());

        for ticker in &tickers {
            match self.predict_stock(ticker, horizon) {
                Ok(prediction) => results.push(prediction),
                Err(e) => warn!("{} 예측 건너뜀: {}", ticker, e),
            }
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        info!(
            "🏆 [{}] 유니버스 예측 완료: {}/{}개 성공",
            horizon.as_str(),
            results.len(),
            tickers.len()
        );
        results
    }
}

// ---------- 예측 스냅샷 ----------

/// 스냅샷 내 과제 신호 JSON 표현
#[derive(Debug, Serialize, Deserialize)]
pub struct SignalJson {
    pub prediction: u8,
    pub probability: f64,
}

/// 스냅샷 내 종목 항목 (검증 작업이 읽는 필드 계약)
#[derive(Debug, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub ticker: String,
    #[serde(rename = "stockName")]
    pub stock_name: String,
    #[serde(rename = "currentPrice")]
    pub current_price: f64,
    pub direction: SignalJson,
    pub volatility: SignalJson,
    pub risk: SignalJson,
    pub score: f64,
    pub recommendation: String,
    pub accuracy: f64,
    pub flow: FlowMerge,
}

/// 하루치 예측 스냅샷 (기간별 파일 하나, 생성 후 불변)
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionSnapshot {
    pub prediction_date: NaiveDate,
    pub target_date: NaiveDate,
    pub timeframe: String,
    #[serde(rename = "totalStocks")]
    pub total_stocks: usize,
    pub predictions: BTreeMap<String, SnapshotEntry>,
}

impl PredictionSnapshot {
    pub fn build(
        horizon: Horizon,
        prediction_date: NaiveDate,
        predictions: &[StockPrediction],
    ) -> Self {
        let target_date = prediction_date + chrono::Duration::days(horizon.days() as i64);

        let mut entries = BTreeMap::new();
        for p in predictions {
            entries.insert(
                p.ticker.clone(),
                SnapshotEntry {
                    ticker: p.ticker.clone(),
                    stock_name: p.name.clone(),
                    current_price: p.price,
                    direction: SignalJson {
                        prediction: p.direction.prediction,
                        probability: p.direction.probability,
                    },
                    volatility: SignalJson {
                        prediction: p.volatility.prediction,
                        probability: p.volatility.probability,
                    },
                    risk: SignalJson {
                        prediction: p.risk.prediction,
                        probability: p.risk.probability,
                    },
                    score: p.score,
                    recommendation: Recommendation::from_score(p.score).grade().to_string(),
                    accuracy: p.accuracy,
                    flow: p.flow,
                },
            );
        }

        PredictionSnapshot {
            prediction_date,
            target_date,
            timeframe: horizon.as_str().to_string(),
            total_stocks: entries.len(),
            predictions: entries,
        }
    }

    pub fn load(path: &Path) -> JusicResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let snapshot = serde_json::from_str(&content)?;
        Ok(snapshot)
    }
}

/// 같은 디렉토리의 임시 파일에 쓴 뒤 rename (원자적 교체)
fn write_json_atomic(path: &Path, json: &str) -> JusicResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// 스냅샷 저장
/// 날짜별 파일은 불변 (이미 있으면 덮어쓰지 않음), 최신 파일은 원자적으로 교체
pub fn write_snapshot(
    output_dir: &str,
    snapshot: &PredictionSnapshot,
) -> JusicResult<(PathBuf, PathBuf)> {
    let dir = Path::new(output_dir);
    let dated_path = dir.join(format!(
        "predictions_{}_{}.json",
        snapshot.timeframe, snapshot.prediction_date
    ));
    let legacy_path = dir.join(format!("today_predictions_{}.json", snapshot.timeframe));

    let json = serde_json::to_string_pretty(snapshot)?;

    if dated_path.exists() {
        warn!(
            "날짜별 스냅샷이 이미 존재합니다 - 덮어쓰지 않음: {}",
            dated_path.display()
        );
    } else {
        write_json_atomic(&dated_path, &json)?;
    }

    write_json_atomic(&legacy_path, &json)?;

    info!(
        "💾 예측 스냅샷 저장: {} ({}개 종목)",
        dated_path.display(),
        snapshot.total_stocks
    );
    Ok((dated_path, legacy_path))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal(prediction: u8, probability: f64) -> TaskSignal {
        TaskSignal {
            prediction,
            probability,
        }
    }

    #[test]
    fn test_score_known_scenario() {
        // direction=(1,0.8), volatility=(0,0.7), risk=(0,0.9)
        // -> 0.35*0.8 + 0.40*0.7 + 0.25*0.9 = 0.785
        let score = calculate_score(signal(1, 0.8), signal(0, 0.7), signal(0, 0.9));
        assert!((score - 0.785).abs() < 1e-12);
        assert_eq!(Recommendation::from_score(score), Recommendation::StrongBuy);
    }

    #[test]
    fn test_score_monotonic_in_direction_prob() {
        // 상승 예측일 때 확률이 커지면 점수는 감소하지 않아야 함
        let vol = signal(1, 0.6);
        let risk = signal(1, 0.4);
        let mut prev = f64::NEG_INFINITY;
        for i in 0..=10 {
            let p = i as f64 / 10.0;
            let score = calculate_score(signal(1, p), vol, risk);
            assert!(score >= prev);
            prev = score;
        }
    }

    #[test]
    fn test_score_bounds() {
        // 확률이 [0,1]이면 점수는 [-1,1] 범위 안
        for d in [0u8, 1] {
            for v in [0u8, 1] {
                for r in [0u8, 1] {
                    for p in [0.0, 0.3, 0.5, 0.7, 1.0] {
                        let score =
                            calculate_score(signal(d, p), signal(v, 1.0 - p), signal(r, p));
                        assert!((-1.0..=1.0).contains(&score));
                    }
                }
            }
        }
    }

    #[test]
    fn test_recommendation_boundaries() {
        // 경계값은 이상(>=) 포함
        assert_eq!(Recommendation::from_score(0.3), Recommendation::StrongBuy);
        assert_eq!(Recommendation::from_score(0.0999), Recommendation::Buy);
        assert_eq!(Recommendation::from_score(0.1), Recommendation::Buy);
        assert_eq!(Recommendation::from_score(-0.1), Recommendation::Hold);
        assert_eq!(Recommendation::from_score(0.0), Recommendation::Hold);
        assert_eq!(Recommendation::from_score(-0.3), Recommendation::Sell);
        assert_eq!(Recommendation::from_score(-0.31), Recommendation::StrongSell);
    }

    #[test]
    fn test_recommendation_labels() {
        assert_eq!(Recommendation::StrongBuy.grade(), "강력 매수");
        assert_eq!(Recommendation::StrongBuy.action(), "STRONG_BUY");
        assert_eq!(Recommendation::Hold.emoji(), "⏸️");
    }

    #[test]
    fn test_snapshot_build_and_dates() {
        let prediction = StockPrediction {
            ticker: "005930.KS".to_string(),
            name: "삼성전자".to_string(),
            timeframe: Horizon::D5,
            direction: signal(1, 0.8),
            volatility: signal(0, 0.7),
            risk: signal(0, 0.9),
            score: 0.785,
            price: 71000.0,
            accuracy: 0.548,
            flow: FlowMerge::Default,
        };

        let date = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");
        let snapshot = PredictionSnapshot::build(Horizon::D5, date, &[prediction]);

        assert_eq!(snapshot.total_stocks, 1);
        assert_eq!(snapshot.timeframe, "5day");
        assert_eq!(
            snapshot.target_date,
            NaiveDate::from_ymd_opt(2024, 6, 8).expect("date")
        );

        let entry = snapshot.predictions.get("005930.KS").expect("entry");
        assert_eq!(entry.recommendation, "강력 매수");
        assert_eq!(entry.stock_name, "삼성전자");
    }

    #[test]
    fn test_snapshot_json_field_contract() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");
        let snapshot = PredictionSnapshot::build(Horizon::D1, date, &[]);
        let json = serde_json::to_string(&snapshot).expect("json");

        // 검증 작업이 의존하는 필드명 계약
        assert!(json.contains("\"prediction_date\""));
        assert!(json.contains("\"target_date\""));
        assert!(json.contains("\"totalStocks\""));
        assert!(json.contains("\"timeframe\":\"1day\""));
    }

    mod end_to_end {
        use super::*;
        use crate::model::{
            Classifier, LogisticRegression, PartitionMetrics, RobustScaler, TaskMetrics,
        };
        use ndarray::Array2;

        fn tiny_metrics() -> TaskMetrics {
            let p = PartitionMetrics {
                accuracy: 0.548,
                f1: 0.52,
                auc: Some(0.56),
                n: 200,
                pos_rate: 0.5,
            };
            TaskMetrics {
                train: p.clone(),
                val: p.clone(),
                test: p,
            }
        }

        /// 주어진 특징 목록 폭에 맞는 간단한 로지스틱 모델
        fn tiny_model(feature_names: &[&str]) -> TaskModel {
            let f = feature_names.len();
            let n = 40;
            let mut x = Array2::<f64>::zeros((n, f));
            let mut y = Vec::with_capacity(n);
            for i in 0..n {
                let sign = if i % 2 == 0 { 1.0 } else { -1.0 };
                for j in 0..f {
                    x[[i, j]] = sign * (1.0 + j as f64 * 0.1) + (i % 5) as f64 * 0.01;
                }
                y.push(if sign > 0.0 { 1.0 } else { 0.0 });
            }

            let scaler = RobustScaler::fit(&x).expect("scaler");
            let scaled = scaler.transform(&x).expect("transform");
            let mut logistic = LogisticRegression::l2(1.0);
            logistic.fit(&scaled, &y).expect("fit");

            TaskModel {
                classifier: Classifier::Logistic(logistic),
                scaler,
                pca: None,
                feature_names: feature_names.iter().map(|s| s.to_string()).collect(),
                metrics: tiny_metrics(),
            }
        }

        /// 거시경제 캐시 없이 동작하는 12키 번들 (Direction은 기술적 특징 8개)
        fn tiny_bundle() -> ModelBundle {
            let technical = [
                "MA_Ratio", "RSI", "Price_Change", "Volume_Ratio", "Volatility",
                "MACD", "BB_Position", "Momentum_5",
            ];
            let volatility = [
                "MA_Ratio", "RSI", "Price_Change", "Volume_Ratio", "Volatility",
                "Institution_Ratio", "Foreign_Ratio", "Individual_Ratio",
            ];
            let risk = [
                "MA_Ratio", "RSI", "Price_Change", "Volume_Ratio", "Volatility",
                "MACD", "BB_Position", "Momentum_5",
                "RSI_x_Volume", "Trend_Strength", "BB_Momentum", "Volatility_x_RSI",
                "MACD_x_Volume", "Price_Momentum", "RSI_MACD", "BB_Volatility",
            ];

            let date = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");
            let mut bundle = ModelBundle::new(date);
            for horizon in Horizon::ALL {
                bundle.insert(Task::Direction, horizon, tiny_model(&technical));
                bundle.insert(Task::Volatility, horizon, tiny_model(&volatility));
                bundle.insert(Task::Risk, horizon, tiny_model(&risk));
                bundle.set_median(horizon, 0.0);
            }
            bundle
        }

        fn seeded_price_api(ticker: &str, bars: usize) -> PriceApi {
            let api = PriceApi::open_in_memory().expect("open db");
            api.create_table(ticker).expect("create table");
            let today = chrono::Local::now().date_naive();
            let start = today - chrono::Duration::days(bars as i64 - 1);
            for i in 0..bars {
                let date = start + chrono::Duration::days(i as i64);
                let close = 70000.0 + ((i as f64) * 0.9).sin() * 1500.0 + (i % 11) as f64 * 40.0;
                api.insert_bar(
                    ticker,
                    date,
                    close,
                    close * 1.01,
                    close * 0.99,
                    close,
                    100000.0 + (i % 9) as f64 * 5000.0,
                )
                .expect("insert bar");
            }
            api
        }

        #[test]
        fn test_predict_stock_full_path() {
            let api = seeded_price_api("005930.KS", 40);
            let predictor = Predictor::new(tiny_bundle(), api, None, None, 45, 1);

            let pred = predictor
                .predict_stock("005930.KS", Horizon::D5)
                .expect("prediction");

            assert_eq!(pred.ticker, "005930.KS");
            assert_eq!(pred.name, "삼성전자");
            assert_eq!(pred.flow, FlowMerge::Default);
            assert!(pred.price > 0.0);
            assert!((0.0..=1.0).contains(&pred.direction.probability));
            assert!((0.0..=1.0).contains(&pred.volatility.probability));
            assert!((0.0..=1.0).contains(&pred.risk.probability));
            assert!((-1.0..=1.0).contains(&pred.score));
            assert!((pred.accuracy - 0.548).abs() < 1e-12);
        }

        #[test]
        fn test_predict_missing_ticker_is_error() {
            let api = seeded_price_api("005930.KS", 40);
            let predictor = Predictor::new(tiny_bundle(), api, None, None, 45, 1);
            assert!(predictor.predict_stock("000660.KS", Horizon::D1).is_err());
        }

        #[test]
        fn test_predict_short_history_is_error() {
            let api = seeded_price_api("005930.KS", 10);
            let predictor = Predictor::new(tiny_bundle(), api, None, None, 45, 1);
            let result = predictor.predict_stock("005930.KS", Horizon::D1);
            assert!(matches!(
                result,
                Err(JusicError::InsufficientHistory { .. })
            ));
        }

        #[test]
        fn test_missing_feature_is_mismatch_error() {
            let api = seeded_price_api("005930.KS", 40);

            // 저장된 특징 목록에 프레임에 없는 이름이 들어있는 번들
            let mut bundle = tiny_bundle();
            for horizon in Horizon::ALL {
                bundle.insert(
                    Task::Direction,
                    horizon,
                    tiny_model(&["MA_Ratio", "KOSPI_Change"]),
                );
            }

            let predictor = Predictor::new(bundle, api, None, None, 45, 1);
            let result = predictor.predict_stock("005930.KS", Horizon::D5);
            assert!(matches!(
                result,
                Err(JusicError::FeatureMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_write_snapshot_dated_file_immutable() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = dir.path().to_str().expect("path");
        let date = NaiveDate::from_ymd_opt(2024, 6, 3).expect("date");

        let first = PredictionSnapshot::build(Horizon::D1, date, &[]);
        let (dated, legacy) = write_snapshot(out, &first).expect("write");
        assert!(dated.exists());
        assert!(legacy.exists());

        let original = std::fs::read_to_string(&dated).expect("read");

        // 같은 날짜로 다시 쓰면 날짜별 파일은 보존되어야 함
        let second = PredictionSnapshot::build(Horizon::D1, date, &[]);
        write_snapshot(out, &second).expect("write again");
        let after = std::fs::read_to_string(&dated).expect("read");
        assert_eq!(original, after);

        // 로드 왕복
        let loaded = PredictionSnapshot::load(&dated).expect("load");
        assert_eq!(loaded.timeframe, "1day");
    }
}
