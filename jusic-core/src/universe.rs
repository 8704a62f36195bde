use once_cell::sync::Lazy;
use std::collections::HashMap;

/// 예측 대상 종목 정보
#[derive(Debug, Clone)]
pub struct StockInfo {
    pub ticker: &'static str,
    pub name: &'static str,
}

/// 고정 30종목 유니버스 (KOSPI 대형주)
/// 학습/예측/챗봇이 모두 이 목록을 기준으로 동작한다
pub static UNIVERSE: Lazy<Vec<StockInfo>> = Lazy::new(|| {
    vec![
        StockInfo { ticker: "005930.KS", name: "삼성전자" },
        StockInfo { ticker: "000660.KS", name: "SK하이닉스" },
        StockInfo { ticker: "051910.KS", name: "LG화학" },
        StockInfo { ticker: "035420.KS", name: "NAVER" },
        StockInfo { ticker: "035720.KS", name: "카카오" },
        StockInfo { ticker: "005380.KS", name: "현대차" },
        StockInfo { ticker: "000270.KS", name: "기아" },
        StockInfo { ticker: "068270.KS", name: "셀트리온" },
        StockInfo { ticker: "207940.KS", name: "삼성바이오로직스" },
        StockInfo { ticker: "005490.KS", name: "POSCO" },
        StockInfo { ticker: "006400.KS", name: "삼성SDI" },
        StockInfo { ticker: "051900.KS", name: "LG생활건강" },
        StockInfo { ticker: "028260.KS", name: "삼성물산" },
        StockInfo { ticker: "012330.KS", name: "현대모비스" },
        StockInfo { ticker: "066570.KS", name: "LG전자" },
        StockInfo { ticker: "003550.KS", name: "LG" },
        StockInfo { ticker: "096770.KS", name: "SK이노베이션" },
        StockInfo { ticker: "017670.KS", name: "SK텔레콤" },
        StockInfo { ticker: "009150.KS", name: "삼성전기" },
        StockInfo { ticker: "034730.KS", name: "SK" },
        StockInfo { ticker: "000720.KS", name: "현대건설" },
        StockInfo { ticker: "003490.KS", name: "대한항공" },
        StockInfo { ticker: "011200.KS", name: "HMM" },
        StockInfo { ticker: "012450.KS", name: "한화에어로스페이스" },
        StockInfo { ticker: "015760.KS", name: "한국전력" },
        StockInfo { ticker: "016360.KS", name: "삼성생명" },
        StockInfo { ticker: "017800.KS", name: "현대엘리베이" },
        StockInfo { ticker: "018880.KS", name: "한온시스템" },
        StockInfo { ticker: "020150.KS", name: "일동제약" },
        StockInfo { ticker: "021240.KS", name: "코웨이" },
    ]
});

/// 종목명 → 티커 역매핑
pub static NAME_TO_TICKER: Lazy<HashMap<&'static str, &'static str>> =
    Lazy::new(|| UNIVERSE.iter().map(|s| (s.name, s.ticker)).collect());

/// 챗봇용 별칭 테이블 (축약어 → 티커)
pub static ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("삼성", "005930.KS");
    map.insert("하이닉스", "000660.KS");
    map.insert("엘지", "051910.KS");
    map.insert("네이버", "035420.KS");
    map.insert("카톡", "035720.KS");
    map.insert("현차", "005380.KS");
    map
});

/// 티커로 종목명 조회 (없으면 티커 그대로 반환)
pub fn stock_name(ticker: &str) -> &str {
    UNIVERSE
        .iter()
        .find(|s| s.ticker == ticker)
        .map(|s| s.name)
        .unwrap_or(ticker)
}

/// 유니버스 티커 목록
pub fn tickers() -> Vec<&'static str> {
    UNIVERSE.iter().map(|s| s.ticker).collect()
}
