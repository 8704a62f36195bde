use chrono::NaiveDate;
use std::collections::HashMap;

use crate::data::{FlowMerge, FlowPoint, MacroData, MacroPoint, PriceSeries};

/// 컬럼 지향 특징 프레임
/// 모든 컬럼은 dates와 같은 길이의 f64 벡터이며, 윈도우가 완성되지 않은 구간은 NaN
/// 학습 경로는 NaN/Inf 행을 버리고, 단일 행 추론 경로는 0.0으로 대체한다
#[derive(Debug, Clone)]
pub struct FeatureFrame {
    dates: Vec<NaiveDate>,
    names: Vec<String>,
    cols: HashMap<String, Vec<f64>>,
}

impl FeatureFrame {
    pub fn new(dates: Vec<NaiveDate>) -> Self {
        FeatureFrame {
            dates,
            names: Vec::new(),
            cols: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    /// 컬럼 삽입 (같은 이름이면 교체, 삽입 순서 유지)
    pub fn insert(&mut self, name: &str, values: Vec<f64>) {
        debug_assert_eq!(values.len(), self.dates.len(), "컬럼 길이 불일치: {}", name);
        if !self.cols.contains_key(name) {
            self.names.push(name.to_string());
        }
        self.cols.insert(name.to_string(), values);
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.cols.get(name).map(|v| v.as_slice())
    }

    pub fn has(&self, name: &str) -> bool {
        self.cols.contains_key(name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// 마지막 행의 값
    pub fn last_value(&self, name: &str) -> Option<f64> {
        self.cols.get(name).and_then(|v| v.last().copied())
    }
}

// ---------- 롤링 윈도우 커널 ----------

/// n봉 변화율: out[i] = xs[i] / xs[i-n] - 1
pub fn pct_change(xs: &[f64], n: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; xs.len()];
    for i in n..xs.len() {
        let base = xs[i - n];
        if base != 0.0 && base.is_finite() && xs[i].is_finite() {
            out[i] = xs[i] / base - 1.0;
        }
    }
    out
}

/// 윈도우 단순 평균 (윈도우에 NaN이 있으면 NaN)
pub fn rolling_mean(xs: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; xs.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..xs.len() {
        let slice = &xs[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = slice.iter().sum::<f64>() / window as f64;
    }
    out
}

/// 윈도우 표본 표준편차 (ddof=1)
pub fn rolling_std(xs: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; xs.len()];
    if window < 2 {
        return out;
    }
    for i in (window - 1)..xs.len() {
        let slice = &xs[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>()
            / (window as f64 - 1.0);
        out[i] = var.sqrt();
    }
    out
}

/// 윈도우 최소값
pub fn rolling_min(xs: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; xs.len()];
    if window == 0 {
        return out;
    }
    for i in (window - 1)..xs.len() {
        let slice = &xs[i + 1 - window..=i];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        out[i] = slice.iter().fold(f64::INFINITY, |m, &v| m.min(v));
    }
    out
}

/// 지수이동평균 (span 기준, 평활 계수 α = 2/(span+1))
pub fn ewm_mean(xs: &[f64], span: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; xs.len()];
    if xs.is_empty() || span == 0 {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut ema: Option<f64> = None;
    for (i, &x) in xs.iter().enumerate() {
        if x.is_nan() {
            out[i] = ema.unwrap_or(f64::NAN);
            continue;
        }
        ema = Some(match ema {
            Some(prev) => alpha * x + (1.0 - alpha) * prev,
            None => x,
        });
        out[i] = ema.unwrap_or(f64::NAN);
    }
    out
}

/// 1봉 차분: out[i] = xs[i] - xs[i-1]
pub fn diff(xs: &[f64]) -> Vec<f64> {
    let mut out = vec![f64::NAN; xs.len()];
    for i in 1..xs.len() {
        out[i] = xs[i] - xs[i - 1];
    }
    out
}

/// 앞값 채우기 (선두 NaN은 그대로 둠 — 이 단계에서 뒤값 채우기는 하지 않는다)
pub fn forward_fill(xs: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(xs.len());
    let mut last = f64::NAN;
    for &x in xs {
        if !x.is_nan() {
            last = x;
        }
        out.push(last);
    }
    out
}

fn elementwise_mul(a: &[f64], b: &[f64]) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(&x, &y)| x * y).collect()
}

// ---------- 기술적 지표 ----------

/// 일봉 시계열로부터 기술적 지표 프레임 생성
/// 20봉 미만 입력도 오류 없이 선두 NaN으로 처리 — 불완전 행 제거는 호출자 책임
pub fn compute_technical_features(prices: &PriceSeries) -> FeatureFrame {
    let mut frame = FeatureFrame::new(prices.dates.clone());
    let close = &prices.closes;
    let volume = &prices.volumes;

    frame.insert("Close", close.clone());

    // 1. 이동평균
    let ma5 = rolling_mean(close, 5);
    let ma20 = rolling_mean(close, 20);
    let ma_ratio: Vec<f64> = ma5
        .iter()
        .zip(ma20.iter())
        .map(|(&a, &b)| if b != 0.0 { a / b } else { f64::NAN })
        .collect();
    frame.insert("MA_5", ma5);
    frame.insert("MA_20", ma20);
    frame.insert("MA_Ratio", ma_ratio);

    // 2. RSI (14) - loss가 0인 경우를 명시적으로 처리 (inf 전파에 의존하지 않음)
    let deltas = diff(close);
    let gains: Vec<f64> = deltas
        .iter()
        .map(|&d| if d.is_nan() { f64::NAN } else { d.max(0.0) })
        .collect();
    let losses: Vec<f64> = deltas
        .iter()
        .map(|&d| if d.is_nan() { f64::NAN } else { (-d).max(0.0) })
        .collect();
    let avg_gain = rolling_mean(&gains, 14);
    let avg_loss = rolling_mean(&losses, 14);
    let rsi: Vec<f64> = avg_gain
        .iter()
        .zip(avg_loss.iter())
        .map(|(&g, &l)| {
            if g.is_nan() || l.is_nan() {
                f64::NAN
            } else if l == 0.0 {
                // 상승만 있으면 100, 상승도 하락도 없으면 정의되지 않음
                if g > 0.0 {
                    100.0
                } else {
                    f64::NAN
                }
            } else {
                100.0 - 100.0 / (1.0 + g / l)
            }
        })
        .collect();
    frame.insert("RSI", rsi);

    // 3. 가격 변화율
    let price_change = pct_change(close, 1);
    frame.insert("Price_Change", price_change.clone());

    // 4. 거래량 비율
    let vol_ma20 = rolling_mean(volume, 20);
    let volume_ratio: Vec<f64> = volume
        .iter()
        .zip(vol_ma20.iter())
        .map(|(&v, &m)| if m != 0.0 { v / m } else { f64::NAN })
        .collect();
    frame.insert("Volume_Ratio", volume_ratio);

    // 5. 변동성 (10봉 수익률 표준편차)
    frame.insert("Volatility", rolling_std(&price_change, 10));

    // 6. MACD
    let ema12 = ewm_mean(close, 12);
    let ema26 = ewm_mean(close, 26);
    let macd: Vec<f64> = ema12
        .iter()
        .zip(ema26.iter())
        .map(|(&a, &b)| a - b)
        .collect();
    frame.insert("MACD", macd);

    // 7. 볼린저밴드 위치
    let bb_middle = rolling_mean(close, 20);
    let bb_std = rolling_std(close, 20);
    let bb_upper: Vec<f64> = bb_middle
        .iter()
        .zip(bb_std.iter())
        .map(|(&m, &s)| m + 2.0 * s)
        .collect();
    let bb_lower: Vec<f64> = bb_middle
        .iter()
        .zip(bb_std.iter())
        .map(|(&m, &s)| m - 2.0 * s)
        .collect();
    let bb_position: Vec<f64> = close
        .iter()
        .zip(bb_upper.iter().zip(bb_lower.iter()))
        .map(|(&c, (&u, &l))| {
            let width = u - l;
            if width != 0.0 && width.is_finite() {
                (c - l) / width
            } else {
                // 밴드 폭이 0이면 (종가 불변) 위치가 정의되지 않음
                f64::NAN
            }
        })
        .collect();
    frame.insert("BB_Upper", bb_upper);
    frame.insert("BB_Lower", bb_lower);
    frame.insert("BB_Position", bb_position);

    // 8. 모멘텀
    frame.insert("Momentum_5", pct_change(close, 5));

    frame
}

/// Risk 모델용 상호작용 특징 8개 (기본 특징이 있을 때만 계산)
pub fn add_interaction_features(frame: &mut FeatureFrame) {
    let pairs: [(&str, &str, &str); 8] = [
        ("RSI_x_Volume", "RSI", "Volume_Ratio"),
        ("Trend_Strength", "MA_Ratio", "Momentum_5"),
        ("BB_Momentum", "BB_Position", "Momentum_5"),
        ("Volatility_x_RSI", "Volatility", "RSI"),
        ("MACD_x_Volume", "MACD", "Volume_Ratio"),
        ("Price_Momentum", "Price_Change", "Momentum_5"),
        ("RSI_MACD", "RSI", "MACD"),
        ("BB_Volatility", "BB_Position", "Volatility"),
    ];

    for (name, a, b) in pairs {
        let product = match (frame.column(a), frame.column(b)) {
            (Some(xs), Some(ys)) => elementwise_mul(xs, ys),
            _ => continue,
        };
        frame.insert(name, product);
    }
}

// ---------- 외부 데이터 병합 ----------

/// 거시경제 시리즈의 1봉 변화율을 날짜 기준 맵으로 변환
fn change_by_date(points: &[MacroPoint]) -> HashMap<NaiveDate, f64> {
    let mut map = HashMap::new();
    for pair in points.windows(2) {
        if pair[0].close != 0.0 {
            map.insert(pair[1].date, pair[1].close / pair[0].close - 1.0);
        }
    }
    map
}

fn level_by_date(points: &[MacroPoint]) -> HashMap<NaiveDate, f64> {
    points.iter().map(|p| (p.date, p.close)).collect()
}

fn join_by_date(dates: &[NaiveDate], map: &HashMap<NaiveDate, f64>) -> Vec<f64> {
    let joined: Vec<f64> = dates
        .iter()
        .map(|d| map.get(d).copied().unwrap_or(f64::NAN))
        .collect();
    // 휴장일/주말 공백은 앞값으로 채움 (이 단계에서 뒤값 채우기는 금지)
    forward_fill(&joined)
}

/// 거시경제 피처 병합 (Direction 모델용)
/// 시리즈가 비어있으면 해당 컬럼을 추가하지 않는다
pub fn merge_macro_features(frame: &mut FeatureFrame, macro_data: &MacroData) {
    let dates: Vec<NaiveDate> = frame.dates().to_vec();

    if !macro_data.kospi.is_empty() {
        let changes = change_by_date(&macro_data.kospi);
        frame.insert("KOSPI_Change", join_by_date(&dates, &changes));
    }
    if !macro_data.usd_krw.is_empty() {
        let changes = change_by_date(&macro_data.usd_krw);
        frame.insert("USD_KRW_Change", join_by_date(&dates, &changes));
    }
    if !macro_data.vix.is_empty() {
        let levels = level_by_date(&macro_data.vix);
        let changes = change_by_date(&macro_data.vix);
        frame.insert("VIX", join_by_date(&dates, &levels));
        frame.insert("VIX_Change", join_by_date(&dates, &changes));
    }
    if !macro_data.sp500.is_empty() {
        let changes = change_by_date(&macro_data.sp500);
        frame.insert("SP500_Change", join_by_date(&dates, &changes));
    }
}

/// 투자자 수급 피처 병합 (Volatility 모델용)
/// 순매수 절대값 합 + 1로 정규화 (0 나눗셈 방지)
/// 수급 데이터가 없는 종목은 문서화된 기본 비율 (0.33/0.33/0.34)로 채우고 Default를 반환
pub fn merge_flow_features(frame: &mut FeatureFrame, flow: Option<&[FlowPoint]>) -> FlowMerge {
    let n = frame.len();

    match flow {
        Some(points) if !points.is_empty() => {
            let mut inst_map = HashMap::new();
            let mut foreign_map = HashMap::new();
            let mut indiv_map = HashMap::new();

            for p in points {
                let total = p.institution.abs() + p.foreign.abs() + p.individual.abs() + 1.0;
                inst_map.insert(p.date, p.institution / total);
                foreign_map.insert(p.date, p.foreign / total);
                indiv_map.insert(p.date, p.individual / total);
            }

            let dates: Vec<NaiveDate> = frame.dates().to_vec();
            frame.insert("Institution_Ratio", join_by_date(&dates, &inst_map));
            frame.insert("Foreign_Ratio", join_by_date(&dates, &foreign_map));
            frame.insert("Individual_Ratio", join_by_date(&dates, &indiv_map));
            FlowMerge::Real
        }
        _ => {
            frame.insert("Institution_Ratio", vec![0.33; n]);
            frame.insert("Foreign_Ratio", vec![0.33; n]);
            frame.insert("Individual_Ratio", vec![0.34; n]);
            FlowMerge::Default
        }
    }
}
