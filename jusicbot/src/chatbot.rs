use serde::Serialize;
use tracing::warn;

use jusic_core::labels::Horizon;
use jusic_core::predictor::{Predictor, Recommendation, StockPrediction};
use jusic_core::universe;

/// 차트 렌더링용 구조화 데이터
#[derive(Debug, Serialize)]
pub struct ChartData {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub colors: Vec<String>,
}

/// 추천 목록 항목 (웹 프론트 계약)
#[derive(Debug, Serialize)]
pub struct RecommendationEntry {
    pub ticker: String,
    pub name: String,
    pub score: f64,
    pub recommendation: String,
    pub emoji: String,
    pub price: f64,
    #[serde(rename = "directionProb")]
    pub direction_prob: f64,
    #[serde(rename = "volatilityPred")]
    pub volatility_pred: u8,
    #[serde(rename = "riskPred")]
    pub risk_pred: u8,
}

#[derive(Debug, Serialize)]
pub struct ComparisonSide {
    pub name: String,
    pub score: f64,
    #[serde(rename = "directionProb")]
    pub direction_prob: f64,
}

#[derive(Debug, Serialize)]
pub struct Comparison {
    pub stock1: ComparisonSide,
    pub stock2: ComparisonSide,
}

/// 챗봇 응답 (항상 JSON으로 직렬화 가능)
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub success: bool,
    pub message: String,
    pub timeframe: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Vec<RecommendationEntry>>,
    #[serde(rename = "chartData", skip_serializing_if = "Option::is_none")]
    pub chart_data: Option<ChartData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comparison: Option<Comparison>,
}

impl ChatReply {
    fn text(message: String, timeframe: Horizon) -> Self {
        ChatReply {
            success: true,
            message,
            timeframe: timeframe.as_str().to_string(),
            recommendations: None,
            chart_data: None,
            comparison: None,
        }
    }
}

fn score_color(score: f64) -> &'static str {
    if score >= 0.3 {
        "#4caf50"
    } else if score >= 0.1 {
        "#8bc34a"
    } else if score >= -0.1 {
        "#ff9800"
    } else {
        "#f44336"
    }
}

/// 규칙 기반 한국어 챗봇
/// 키워드 매칭으로 의도/종목/기간을 뽑아 12개 모델 예측기를 호출한다
pub struct Chatbot {
    predictor: Predictor,
}

impl Chatbot {
    pub fn new(predictor: Predictor) -> Self {
        Chatbot { predictor }
    }

    /// 타임프레임 자동 감지 (명시 키워드 없으면 5일)
    pub fn detect_timeframe(message: &str) -> Horizon {
        if message.contains("1일") || message.contains("내일") || message.contains("오늘") {
            Horizon::D1
        } else if message.contains("3일") {
            Horizon::D3
        } else if message.contains("5일") || message.contains("이번주") || message.contains("일주일")
        {
            Horizon::D5
        } else if message.contains("10일") || message.contains("다음주") || message.contains("2주") {
            Horizon::D10
        } else {
            Horizon::D5
        }
    }

    /// 종목 추출: 티커 직접 입력 → 정식 종목명 → 별칭 순
    pub fn extract_ticker(message: &str) -> Option<String> {
        if let Some(ticker) = Self::find_ticker_code(message) {
            return Some(ticker);
        }

        for stock in universe::UNIVERSE.iter() {
            if message.contains(stock.name) {
                return Some(stock.ticker.to_string());
            }
        }

        for (alias, ticker) in universe::ALIASES.iter() {
            if message.contains(alias) {
                return Some((*ticker).to_string());
            }
        }

        None
    }

    /// "005930.KS" 형태의 티커 코드 스캔 (연속 숫자 6자리 + ".KS")
    fn find_ticker_code(message: &str) -> Option<String> {
        let bytes = message.as_bytes();
        let mut run = 0usize;
        for (i, &b) in bytes.iter().enumerate() {
            if b.is_ascii_digit() {
                run += 1;
                if run >= 6 && message[i + 1..].starts_with(".KS") {
                    let start = i + 1 - 6;
                    return Some(format!("{}.KS", &message[start..=i]));
                }
            } else {
                run = 0;
            }
        }
        None
    }

    /// 비교 요청에서 두 종목 추출 ("vs" 또는 " 대 " 구분)
    pub fn extract_pair(message: &str) -> Option<(String, String)> {
        let lower = message.to_lowercase();
        let separator = if lower.contains(" vs ") {
            " vs "
        } else if lower.contains(" vs. ") {
            " vs. "
        } else if message.contains(" 대 ") {
            " 대 "
        } else {
            return None;
        };

        let split_at = lower.find(separator)?;
        let (left, right_with_sep) = message.split_at(split_at);
        let right = &right_with_sep[separator.len()..];

        match (Self::extract_ticker(left), Self::extract_ticker(right)) {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        }
    }

    fn tf_korean(horizon: Horizon) -> &'static str {
        match horizon {
            Horizon::D1 => "내일",
            Horizon::D3 => "3일 후",
            Horizon::D5 => "5일 후",
            Horizon::D10 => "10일 후",
        }
    }

    /// 단일 종목 분석 응답
    fn response_single_stock(&self, ticker: &str, horizon: Horizon) -> ChatReply {
        let pred = match self.predictor.predict_stock(ticker, horizon) {
            Ok(pred) => pred,
            Err(e) => {
                warn!("{} 분석 실패: {}", ticker, e);
                return ChatReply::text("❌ 종목 분석에 실패했습니다.".to_string(), horizon);
            }
        };

        let rec = Recommendation::from_score(pred.score);
        let mut message = format!("📊 **{}** ({} 예측)\n\n", pred.name, Self::tf_korean(horizon));
        message.push_str("[개별 예측]\n");
        message.push_str(&format!(
            "  방향성: {} (확률: {:.1}%)\n",
            if pred.direction.prediction == 1 { "상승" } else { "하락" },
            pred.direction.probability * 100.0
        ));
        message.push_str(&format!(
            "  변동성: {} (확률: {:.1}%)\n",
            if pred.volatility.prediction == 1 { "높음" } else { "낮음" },
            pred.volatility.probability * 100.0
        ));
        message.push_str(&format!(
            "  위험도: {} (확률: {:.1}%)\n\n",
            if pred.risk.prediction == 1 { "위험" } else { "안전" },
            pred.risk.probability * 100.0
        ));
        message.push_str("[종합 분석]\n");
        message.push_str(&format!("  {} **{}**\n", rec.emoji(), rec.grade()));
        message.push_str(&format!("  투자 점수: {:+.3} / ±1.00\n\n", pred.score));
        message.push_str("[기본 정보]\n");
        message.push_str(&format!("  현재가: {:.0}원\n", pred.price));
        message.push_str(&format!("  모델 정확도: {:.1}%\n", pred.accuracy * 100.0));

        ChatReply::text(message, horizon)
    }

    /// 추천 순위 응답 (TOP 5 + 차트 데이터)
    fn response_top_stocks(&self, horizon: Horizon, top_n: usize) -> ChatReply {
        let tf_korean = match horizon {
            Horizon::D1 => "내일",
            Horizon::D3 => "3일 후",
            Horizon::D5 => "이번주",
            Horizon::D10 => "다음주",
        };

        let ranked = self.predictor.rank_universe(horizon);
        if ranked.is_empty() {
            return ChatReply::text("❌ 종목 분석에 실패했습니다.".to_string(), horizon);
        }

        let top: Vec<&StockPrediction> = ranked.iter().take(top_n).collect();

        let mut message = format!("🏆 **{} 투자 추천 TOP {}**\n\n", tf_korean, top_n);
        let mut recommendations = Vec::with_capacity(top.len());
        let mut labels = Vec::with_capacity(top.len());
        let mut values = Vec::with_capacity(top.len());
        let mut colors = Vec::with_capacity(top.len());

        for (i, pred) in top.iter().enumerate() {
            let rec = Recommendation::from_score(pred.score);
            message.push_str(&format!("{}. **{}** {}\n", i + 1, pred.name, rec.emoji()));
            message.push_str(&format!(
                "   점수: {:+.3} | 현재가: {:.0}원\n",
                pred.score, pred.price
            ));
            message.push_str(&format!(
                "   상승: {:.0}% | 변동성: {}\n\n",
                pred.direction.probability * 100.0,
                if pred.volatility.prediction == 0 { "낮음" } else { "높음" }
            ));

            recommendations.push(RecommendationEntry {
                ticker: pred.ticker.clone(),
                name: pred.name.clone(),
                score: pred.score,
                recommendation: rec.grade().to_string(),
                emoji: rec.emoji().to_string(),
                price: pred.price,
                direction_prob: pred.direction.probability,
                volatility_pred: pred.volatility.prediction,
                risk_pred: pred.risk.prediction,
            });
            labels.push(pred.name.clone());
            values.push((pred.score * 1000.0).round() / 1000.0);
            colors.push(score_color(pred.score).to_string());
        }

        ChatReply {
            success: true,
            message,
            timeframe: horizon.as_str().to_string(),
            recommendations: Some(recommendations),
            chart_data: Some(ChartData {
                labels,
                values,
                colors,
            }),
            comparison: None,
        }
    }

    /// 종목 비교 응답
    fn response_comparison(&self, ticker1: &str, ticker2: &str, horizon: Horizon) -> ChatReply {
        let pred1 = self.predictor.predict_stock(ticker1, horizon);
        let pred2 = self.predictor.predict_stock(ticker2, horizon);

        let (pred1, pred2) = match (pred1, pred2) {
            (Ok(a), Ok(b)) => (a, b),
            _ => return ChatReply::text("❌ 종목 분석에 실패했습니다.".to_string(), horizon),
        };

        let mut message = format!("⚖️ **종목 비교** ({})\n\n", Self::tf_korean(horizon));
        for (marker, pred) in [("🔵", &pred1), ("🔴", &pred2)] {
            let rec = Recommendation::from_score(pred.score);
            message.push_str(&format!("{} **{}**\n", marker, pred.name));
            message.push_str(&format!(
                "   추천: {} {} (점수: {:+.3})\n",
                rec.emoji(),
                rec.grade(),
                pred.score
            ));
            message.push_str(&format!(
                "   상승 확률: {:.1}%\n",
                pred.direction.probability * 100.0
            ));
            message.push_str(&format!("   현재가: {:.0}원\n\n", pred.price));
        }

        let winner = if pred1.score > pred2.score { &pred1 } else { &pred2 };
        message.push_str(&format!("💡 **결론:** {}이(가) 더 유망합니다!\n", winner.name));

        ChatReply {
            success: true,
            message,
            timeframe: horizon.as_str().to_string(),
            recommendations: None,
            chart_data: Some(ChartData {
                labels: vec![pred1.name.clone(), pred2.name.clone()],
                values: vec![pred1.score, pred2.score],
                colors: vec!["#2196f3".to_string(), "#f44336".to_string()],
            }),
            comparison: Some(Comparison {
                stock1: ComparisonSide {
                    name: pred1.name.clone(),
                    score: pred1.score,
                    direction_prob: pred1.direction.probability,
                },
                stock2: ComparisonSide {
                    name: pred2.name.clone(),
                    score: pred2.score,
                    direction_prob: pred2.direction.probability,
                },
            }),
        }
    }

    /// 위험 종목 응답 (점수 -0.2 미만 상위 5개)
    fn response_risky_stocks(&self, horizon: Horizon) -> ChatReply {
        let ranked = self.predictor.rank_universe(horizon);
        let risky: Vec<&StockPrediction> =
            ranked.iter().filter(|p| p.score < -0.2).take(5).collect();

        if risky.is_empty() {
            return ChatReply::text(
                "✅ 현재 특별히 위험한 종목은 없습니다.".to_string(),
                horizon,
            );
        }

        let mut message = "⚠️ **매도 고려 종목 (위험도 높음)**\n\n".to_string();
        for (i, pred) in risky.iter().enumerate() {
            let rec = Recommendation::from_score(pred.score);
            message.push_str(&format!("{}. **{}** {}\n", i + 1, pred.name, rec.emoji()));
            message.push_str(&format!(
                "   점수: {:+.3} | 위험: {:.0}%\n\n",
                pred.score,
                pred.risk.probability * 100.0
            ));
        }

        ChatReply::text(message, horizon)
    }

    fn help_message(horizon: Horizon) -> ChatReply {
        let message = "🤖 **안전한 낚시터 챗봇 사용법**

질문 예시:
1. \"내일 삼성전자 어때?\" - 단일 종목 분석
2. \"이번주 추천 종목은?\" - TOP 5 추천
3. \"삼성전자 vs SK하이닉스\" - 종목 비교
4. \"위험한 종목은?\" - 매도 고려 종목
5. \"다음주 NAVER 분석해줘\" - 특정 기간 분석

지원 기간: 내일(1일), 3일 후, 이번주(5일), 다음주(10일)
지원 종목: 30개 (삼성전자, SK하이닉스, LG화학 등)
"
        .to_string();
        ChatReply::text(message, horizon)
    }

    /// 메인 챗봇 로직: 비교 → 위험 → 추천 → 단일 종목 → 도움말 순으로 의도 판정
    pub fn chat(&self, message: &str) -> ChatReply {
        let horizon = Self::detect_timeframe(message);

        // 1. 비교 요청
        if let Some((a, b)) = Self::extract_pair(message) {
            return self.response_comparison(&a, &b, horizon);
        }

        // 2. 위험 종목 요청
        if ["위험", "매도", "피해야", "조심"]
            .iter()
            .any(|word| message.contains(word))
        {
            return self.response_risky_stocks(horizon);
        }

        // 3. 추천 순위 요청 (특정 종목이 없을 때만)
        if ["추천", "순위", "좋은", "어떤", "뭐"]
            .iter()
            .any(|word| message.contains(word))
            && Self::extract_ticker(message).is_none()
        {
            return self.response_top_stocks(horizon, 5);
        }

        // 4. 단일 종목 분석
        if let Some(ticker) = Self::extract_ticker(message) {
            return self.response_single_stock(&ticker, horizon);
        }

        // 5. 기본 응답
        Self::help_message(horizon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_timeframe() {
        assert_eq!(Chatbot::detect_timeframe("내일 삼성전자 어때?"), Horizon::D1);
        assert_eq!(Chatbot::detect_timeframe("3일 뒤 전망"), Horizon::D3);
        assert_eq!(Chatbot::detect_timeframe("이번주 추천 종목은?"), Horizon::D5);
        assert_eq!(Chatbot::detect_timeframe("다음주 네이버 분석해줘"), Horizon::D10);
        // 키워드 없음 -> 기본값 5일
        assert_eq!(Chatbot::detect_timeframe("삼성전자 분석"), Horizon::D5);
    }

    #[test]
    fn test_extract_ticker_code() {
        assert_eq!(
            Chatbot::extract_ticker("005930.KS 어때?"),
            Some("005930.KS".to_string())
        );
    }

    #[test]
    fn test_extract_ticker_name_and_alias() {
        assert_eq!(
            Chatbot::extract_ticker("내일 삼성전자 어때?"),
            Some("005930.KS".to_string())
        );
        assert_eq!(
            Chatbot::extract_ticker("하이닉스 전망 알려줘"),
            Some("000660.KS".to_string())
        );
        assert_eq!(Chatbot::extract_ticker("오늘 날씨 어때?"), None);
    }

    #[test]
    fn test_extract_pair() {
        let pair = Chatbot::extract_pair("삼성전자 vs SK하이닉스").expect("pair");
        assert_eq!(pair.0, "005930.KS");
        assert_eq!(pair.1, "000660.KS");

        let pair = Chatbot::extract_pair("카카오 대 NAVER 비교").expect("pair");
        assert_eq!(pair.0, "035720.KS");
        assert_eq!(pair.1, "035420.KS");

        assert!(Chatbot::extract_pair("삼성전자 어때?").is_none());
    }

    #[test]
    fn test_score_color_buckets() {
        assert_eq!(score_color(0.5), "#4caf50");
        assert_eq!(score_color(0.15), "#8bc34a");
        assert_eq!(score_color(0.0), "#ff9800");
        assert_eq!(score_color(-0.5), "#f44336");
    }

    #[test]
    fn test_chat_reply_json_contract() {
        let reply = ChatReply::text("테스트 응답".to_string(), Horizon::D5);
        let json = serde_json::to_string(&reply).expect("json");

        assert!(json.contains("\"success\":true"));
        assert!(json.contains("\"timeframe\":\"5day\""));
        // 비어있는 선택 필드는 직렬화에서 제외
        assert!(!json.contains("recommendations"));
        assert!(!json.contains("chartData"));
        assert!(!json.contains("comparison"));
    }
}
