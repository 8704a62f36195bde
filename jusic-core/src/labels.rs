use serde::{Deserialize, Serialize};

use crate::errors::{JusicError, JusicResult};
use crate::features::{pct_change, rolling_min, rolling_std, FeatureFrame};

/// 예측 과제
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Task {
    Direction,
    Volatility,
    Risk,
}

impl Task {
    pub const ALL: [Task; 3] = [Task::Direction, Task::Volatility, Task::Risk];

    pub fn as_str(&self) -> &'static str {
        match self {
            Task::Direction => "direction",
            Task::Volatility => "volatility",
            Task::Risk => "risk",
        }
    }

    /// 과제별 학습 데이터 수집 기간 (달력일)
    /// 과제별로 튜닝된 하이퍼파라미터 - Direction 6년, Volatility 2년, Risk 5년
    pub fn lookback_days(&self) -> i64 {
        match self {
            Task::Direction => 365 * 6,
            Task::Volatility => 365 * 2,
            Task::Risk => 365 * 5,
        }
    }

    /// 과제별 고정 특징 목록
    /// Direction: 기술 8 + 거시경제 5 = 13
    /// Volatility: 기술 5 + 수급 3 = 8
    /// Risk: 기술 8 + 상호작용 8 = 16
    pub fn feature_names(&self) -> Vec<&'static str> {
        match self {
            Task::Direction => vec![
                "MA_Ratio", "RSI", "Price_Change", "Volume_Ratio", "Volatility",
                "MACD", "BB_Position", "Momentum_5",
                "KOSPI_Change", "USD_KRW_Change", "VIX", "VIX_Change", "SP500_Change",
            ],
            Task::Volatility => vec![
                "MA_Ratio", "RSI", "Price_Change", "Volume_Ratio", "Volatility",
                "Institution_Ratio", "Foreign_Ratio", "Individual_Ratio",
            ],
            Task::Risk => vec![
                "MA_Ratio", "RSI", "Price_Change", "Volume_Ratio", "Volatility",
                "MACD", "BB_Position", "Momentum_5",
                "RSI_x_Volume", "Trend_Strength", "BB_Momentum", "Volatility_x_RSI",
                "MACD_x_Volume", "Price_Momentum", "RSI_MACD", "BB_Volatility",
            ],
        }
    }
}

/// 예측 기간 (거래일 기준)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Horizon {
    D1,
    D3,
    D5,
    D10,
}

impl Horizon {
    pub const ALL: [Horizon; 4] = [Horizon::D1, Horizon::D3, Horizon::D5, Horizon::D10];

    pub fn days(&self) -> usize {
        match self {
            Horizon::D1 => 1,
            Horizon::D3 => 3,
            Horizon::D5 => 5,
            Horizon::D10 => 10,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Horizon::D1 => "1day",
            Horizon::D3 => "3day",
            Horizon::D5 => "5day",
            Horizon::D10 => "10day",
        }
    }

    pub fn parse(s: &str) -> JusicResult<Horizon> {
        match s {
            "1day" => Ok(Horizon::D1),
            "3day" => Ok(Horizon::D3),
            "5day" => Ok(Horizon::D5),
            "10day" => Ok(Horizon::D10),
            _ => Err(JusicError::parsing(
                "타임프레임",
                format!("지원하지 않는 값: {} (1day/3day/5day/10day)", s),
            )),
        }
    }
}

/// n봉 후 수익률을 현재 행에 정렬: out[i] = close[i+n] / close[i] - 1
/// 미래 윈도우가 없는 꼬리 n개 행은 NaN
pub fn future_returns(closes: &[f64], horizon_n: usize) -> Vec<f64> {
    let changed = pct_change(closes, horizon_n);
    shift_back(&changed, horizon_n)
}

/// NaN을 제외한 중앙값
/// Direction 라벨 임계값 계산용 - 학습 코퍼스 전체의 미래 수익률에 대해 한 번 계산하고
/// 번들에 저장해 평가/재라벨링 시 그대로 재사용한다
pub fn nan_median(xs: &[f64]) -> Option<f64> {
    let mut values: Vec<f64> = xs.iter().copied().filter(|v| v.is_finite()).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}

/// 시리즈를 n만큼 앞으로 당김 (pandas shift(-n))
fn shift_back(xs: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; xs.len()];
    for i in 0..xs.len().saturating_sub(n) {
        out[i] = xs[i + n];
    }
    out
}

/// (과제, 기간)별 이진 라벨 생성
/// 라벨은 행 i 기준 미래 i+1..=i+n 봉만의 함수이며, 미래 윈도우가 불완전한 행은 NaN
/// (학습 전 반드시 제거 - 절대 대체값을 넣지 않는다)
pub fn make_labels(
    frame: &FeatureFrame,
    task: Task,
    horizon: Horizon,
    direction_threshold: Option<f64>,
) -> JusicResult<Vec<f64>> {
    let closes = frame
        .column("Close")
        .ok_or_else(|| JusicError::general("Close 컬럼이 없습니다"))?;
    let n = horizon.days();

    let labels = match task {
        Task::Direction => {
            let rets = future_returns(closes, n);
            let threshold = match direction_threshold {
                Some(t) => t,
                // 임계값 미지정 시 해당 윈도우의 중앙값 (클래스 균형 ~50:50)
                None => nan_median(&rets).ok_or_else(|| {
                    JusicError::general("미래 수익률이 모두 NaN이라 중앙값을 계산할 수 없습니다")
                })?,
            };
            rets.iter()
                .map(|&r| {
                    if r.is_nan() {
                        f64::NAN
                    } else if r > threshold {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect()
        }
        Task::Volatility => {
            let current_vol = frame
                .column("Volatility")
                .ok_or_else(|| JusicError::general("Volatility 컬럼이 없습니다"))?;
            let returns = pct_change(closes, 1);
            let future_vol = shift_back(&rolling_std(&returns, n), n);
            future_vol
                .iter()
                .zip(current_vol.iter())
                .map(|(&f, &c)| {
                    if f.is_nan() || c.is_nan() {
                        f64::NAN
                    } else if f > c {
                        1.0
                    } else {
                        0.0
                    }
                })
                .collect()
        }
        Task::Risk => {
            let future_min = shift_back(&rolling_min(closes, n), n);
            future_min
                .iter()
                .zip(closes.iter())
                .map(|(&m, &c)| {
                    if m.is_nan() || c == 0.0 {
                        f64::NAN
                    } else {
                        let max_drawdown = (m - c) / c;
                        if max_drawdown < -0.03 {
                            1.0
                        } else {
                            0.0
                        }
                    }
                })
                .collect()
        }
    };

    Ok(labels)
}
