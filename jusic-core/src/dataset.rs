use chrono::NaiveDate;
use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::data::{FlowData, MacroData, PriceApi};
use crate::errors::{JusicError, JusicResult};
use crate::features::{
    add_interaction_features, compute_technical_features, merge_flow_features,
    merge_macro_features, FeatureFrame,
};
use crate::labels::{future_returns, make_labels, nan_median, Horizon, Task};

/// (과제, 기간)별 학습 코퍼스
/// 전 종목의 행을 합쳐 날짜 오름차순으로 정렬한 상태 (서로 다른 종목의 같은 날짜 행이 섞일 수 있음)
#[derive(Debug)]
pub struct TaskDataset {
    pub task: Task,
    pub horizon: Horizon,
    pub feature_names: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub tickers: Vec<String>,
    pub x: Array2<f64>,
    pub y: Vec<f64>,
    /// Direction 전용: 학습 코퍼스 전체 미래 수익률의 중앙값 (라벨 임계값)
    pub direction_median: Option<f64>,
}

impl TaskDataset {
    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }
}

/// 학습 코퍼스 빌더
/// 종목 단위 실패는 경고 후 건너뛰며, 전 종목이 실패해야만 None (데이터 부족)
pub struct DatasetBuilder<'a> {
    price_api: &'a PriceApi,
    macro_data: Option<&'a MacroData>,
    flow_data: Option<&'a FlowData>,
    retry_attempts: u32,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(
        price_api: &'a PriceApi,
        macro_data: Option<&'a MacroData>,
        flow_data: Option<&'a FlowData>,
        retry_attempts: u32,
    ) -> Self {
        DatasetBuilder {
            price_api,
            macro_data,
            flow_data,
            retry_attempts,
        }
    }

    /// 과제별 특징 프레임 준비 (기술적 지표 + 과제별 외부 데이터)
    fn prepare_frame(&self, ticker: &str, task: Task, lookback_days: i64) -> JusicResult<FeatureFrame> {
        let series =
            self.price_api
                .get_daily_prices_with_retry(ticker, lookback_days, self.retry_attempts)?;

        let mut frame = compute_technical_features(&series);

        match task {
            Task::Direction => {
                if let Some(macro_data) = self.macro_data {
                    merge_macro_features(&mut frame, macro_data);
                }
            }
            Task::Volatility => {
                let flow = self.flow_data.and_then(|f| f.get(ticker));
                merge_flow_features(&mut frame, flow);
            }
            Task::Risk => {
                add_interaction_features(&mut frame);
            }
        }

        Ok(frame)
    }

    /// 프레임에 실제로 존재하는 과제 특징 목록
    /// Direction은 거시경제 캐시가 없으면 기술적 특징 8개만으로 구성된다
    fn available_features(frame: &FeatureFrame, task: Task) -> Vec<String> {
        task.feature_names()
            .into_iter()
            .filter(|name| frame.has(name))
            .map(|name| name.to_string())
            .collect()
    }

    /// 전체 유니버스에 대한 (과제, 기간) 코퍼스 생성
    /// Direction 임계값은 코퍼스 전체 미래 수익률의 중앙값으로 계산한다 (학습 경로)
    /// 반환 None은 "데이터 부족" - 호출자가 오류가 아닌 결측으로 처리해야 한다
    pub fn build(
        &self,
        tickers: &[&str],
        task: Task,
        horizon: Horizon,
    ) -> JusicResult<Option<TaskDataset>> {
        self.build_with_direction_threshold(tickers, task, horizon, None)
    }

    /// Direction 임계값을 외부에서 고정하는 변형 (평가 경로)
    /// 번들에 저장된 학습 시점 중앙값을 넘겨 라벨 정의를 재현 가능하게 유지한다
    /// 다른 상수를 넘기면 라벨 의미 자체가 달라지므로 반드시 명시적으로 사용할 것
    pub fn build_with_direction_threshold(
        &self,
        tickers: &[&str],
        task: Task,
        horizon: Horizon,
        fixed_direction_threshold: Option<f64>,
    ) -> JusicResult<Option<TaskDataset>> {
        let lookback_days = task.lookback_days();
        info!(
            "📊 [{}/{}] 코퍼스 생성 시작 ({}개 종목, {}일 수집)",
            task.as_str(),
            horizon.as_str(),
            tickers.len(),
            lookback_days
        );

        // 1차: 종목별 특징 프레임 수집
        let mut frames: Vec<(String, FeatureFrame)> = Vec::with_capacity(tickers.len());
        for &ticker in tickers {
            match self.prepare_frame(ticker, task, lookback_days) {
                Ok(frame) => frames.push((ticker.to_string(), frame)),
                Err(e) => {
                    warn!("{} 건너뜀: {}", ticker, e);
                }
            }
        }

        if frames.is_empty() {
            warn!(
                "[{}/{}] 유효한 종목이 없습니다 - 데이터 부족",
                task.as_str(),
                horizon.as_str()
            );
            return Ok(None);
        }

        // Direction 라벨 임계값: 고정값이 없으면 코퍼스 전체 미래 수익률의 중앙값
        let direction_median = if task == Task::Direction {
            match fixed_direction_threshold {
                Some(threshold) => Some(threshold),
                None => {
                    let mut pooled: Vec<f64> = Vec::new();
                    for (_, frame) in &frames {
                        if let Some(closes) = frame.column("Close") {
                            pooled.extend(future_returns(closes, horizon.days()));
                        }
                    }
                    let median = nan_median(&pooled).ok_or_else(|| {
                        JusicError::training(
                            "Direction 임계값 계산 실패: 미래 수익률이 없습니다".to_string(),
                        )
                    })?;
                    debug!(
                        "[direction/{}] 라벨 임계값 (중앙값): {:.6}",
                        horizon.as_str(),
                        median
                    );
                    Some(median)
                }
            }
        } else {
            None
        };

        // 특징 목록은 첫 프레임 기준 (외부 데이터 유무는 전 종목 공통)
        let feature_names = Self::available_features(&frames[0].1, task);
        if feature_names.is_empty() {
            return Ok(None);
        }

        // 2차: 라벨 계산 + 유효 행 수집
        struct Row {
            date: NaiveDate,
            ticker: String,
            features: Vec<f64>,
            label: f64,
        }
        let mut rows: Vec<Row> = Vec::new();
        let mut contributing = 0usize;

        for (ticker, frame) in &frames {
            let labels = match make_labels(frame, task, horizon, direction_median) {
                Ok(labels) => labels,
                Err(e) => {
                    warn!("{} 라벨 계산 실패 - 건너뜀: {}", ticker, e);
                    continue;
                }
            };

            let columns: Vec<&[f64]> = match feature_names
                .iter()
                .map(|name| frame.column(name))
                .collect::<Option<Vec<_>>>()
            {
                Some(cols) => cols,
                None => {
                    warn!("{} 특징 컬럼 누락 - 건너뜀", ticker);
                    continue;
                }
            };

            let before = rows.len();
            for i in 0..frame.len() {
                let label = labels[i];
                if !label.is_finite() {
                    continue;
                }
                let features: Vec<f64> = columns.iter().map(|col| col[i]).collect();
                if features.iter().any(|v| !v.is_finite()) {
                    continue;
                }
                rows.push(Row {
                    date: frame.dates()[i],
                    ticker: ticker.clone(),
                    features,
                    label,
                });
            }
            if rows.len() > before {
                contributing += 1;
            }
        }

        if rows.is_empty() {
            warn!(
                "[{}/{}] 유효 행이 없습니다 - 데이터 부족",
                task.as_str(),
                horizon.as_str()
            );
            return Ok(None);
        }

        // 시간 순 정렬 (안정 정렬 - 같은 날짜의 종목 간 순서는 입력 순서 유지)
        rows.sort_by_key(|row| row.date);

        let n = rows.len();
        let f = feature_names.len();
        let mut x = Array2::<f64>::zeros((n, f));
        let mut y = Vec::with_capacity(n);
        let mut dates = Vec::with_capacity(n);
        let mut row_tickers = Vec::with_capacity(n);

        for (i, row) in rows.into_iter().enumerate() {
            for (j, value) in row.features.into_iter().enumerate() {
                x[[i, j]] = value;
            }
            y.push(row.label);
            dates.push(row.date);
            row_tickers.push(row.ticker);
        }

        info!(
            "✅ [{}/{}] 코퍼스 생성 완료: {}개 샘플 ({}/{}개 종목 기여)",
            task.as_str(),
            horizon.as_str(),
            n,
            contributing,
            tickers.len()
        );

        Ok(Some(TaskDataset {
            task,
            horizon,
            feature_names,
            dates,
            tickers: row_tickers,
            x,
            y,
            direction_median,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed_ticker(api: &PriceApi, ticker: &str, days: usize) {
        api.create_table(ticker).expect("create table");
        let today = chrono::Local::now().date_naive();
        let start = today - chrono::Duration::days(days as i64);
        for i in 0..days {
            let date = start + chrono::Duration::days(i as i64);
            let close = 100.0 + ((i as f64) * 0.7).sin() * 8.0 + (i % 13) as f64 * 0.3;
            api.insert_bar(
                ticker,
                date,
                close,
                close * 1.02,
                close * 0.98,
                close,
                1000.0 + (i % 7) as f64 * 120.0,
            )
            .expect("insert bar");
        }
    }

    #[test]
    fn test_build_skips_failed_ticker() {
        // 3종목 중 1종목 조회 실패 - 나머지 2종목으로 코퍼스 생성, 예외 없음
        let api = PriceApi::open_in_memory().expect("open db");
        seed_ticker(&api, "A.KS", 120);
        seed_ticker(&api, "B.KS", 120);

        let builder = DatasetBuilder::new(&api, None, None, 1);
        let dataset = builder
            .build(&["A.KS", "B.KS", "없는종목.KS"], Task::Risk, Horizon::D5)
            .expect("build")
            .expect("dataset present");

        assert!(!dataset.is_empty());
        assert!(dataset.tickers.iter().any(|t| t == "A.KS"));
        assert!(dataset.tickers.iter().any(|t| t == "B.KS"));
        assert!(!dataset.tickers.iter().any(|t| t == "없는종목.KS"));
    }

    #[test]
    fn test_build_empty_universe_is_none() {
        let api = PriceApi::open_in_memory().expect("open db");
        let builder = DatasetBuilder::new(&api, None, None, 1);
        let dataset = builder
            .build(&["X.KS", "Y.KS"], Task::Volatility, Horizon::D1)
            .expect("build");
        assert!(dataset.is_none());
    }

    #[test]
    fn test_build_sorted_by_date() {
        let api = PriceApi::open_in_memory().expect("open db");
        seed_ticker(&api, "A.KS", 120);
        seed_ticker(&api, "B.KS", 120);

        let builder = DatasetBuilder::new(&api, None, None, 1);
        let dataset = builder
            .build(&["A.KS", "B.KS"], Task::Volatility, Horizon::D3)
            .expect("build")
            .expect("dataset present");

        for pair in dataset.dates.windows(2) {
            assert!(pair[0] <= pair[1], "날짜 정렬 위반");
        }
        // 수급 캐시가 없으므로 기본 비율 컬럼이 포함됨
        assert!(dataset
            .feature_names
            .iter()
            .any(|n| n == "Institution_Ratio"));
        assert_eq!(dataset.feature_names.len(), 8);
    }

    #[test]
    fn test_no_nan_rows_in_output() {
        let api = PriceApi::open_in_memory().expect("open db");
        seed_ticker(&api, "A.KS", 100);

        let builder = DatasetBuilder::new(&api, None, None, 1);
        let dataset = builder
            .build(&["A.KS"], Task::Risk, Horizon::D5)
            .expect("build")
            .expect("dataset present");

        assert_eq!(dataset.feature_names.len(), 16);
        for value in dataset.x.iter() {
            assert!(value.is_finite());
        }
        for label in &dataset.y {
            assert!(*label == 0.0 || *label == 1.0);
        }
    }

    #[test]
    fn test_direction_median_stored() {
        let api = PriceApi::open_in_memory().expect("open db");
        seed_ticker(&api, "A.KS", 150);

        let builder = DatasetBuilder::new(&api, None, None, 1);
        let dataset = builder
            .build(&["A.KS"], Task::Direction, Horizon::D5)
            .expect("build")
            .expect("dataset present");

        assert!(dataset.direction_median.is_some());
        // 거시경제 캐시 없음 - 기술적 특징 8개만
        assert_eq!(dataset.feature_names.len(), 8);
    }
}
