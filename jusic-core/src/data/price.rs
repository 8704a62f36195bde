use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::{debug, warn};

use crate::errors::{JusicError, JusicResult};

/// 한 종목의 일봉 시계열 (날짜 오름차순)
/// 다운스트림 단계는 이 시리즈를 수정하지 않고 파생 복사본만 만든다
#[derive(Debug, Clone)]
pub struct PriceSeries {
    pub ticker: String,
    pub dates: Vec<NaiveDate>,
    pub opens: Vec<f64>,
    pub highs: Vec<f64>,
    pub lows: Vec<f64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<f64>,
}

impl PriceSeries {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn last_close(&self) -> Option<f64> {
        self.closes.last().copied()
    }
}

/// 일봉 데이터베이스 어댑터
/// 종목별 테이블 (테이블명 = 티커), 컬럼: date(YYYYMMDD TEXT), open, high, low, close, volume
pub struct PriceApi {
    conn: Connection,
}

impl PriceApi {
    pub fn open(db_path: &str) -> JusicResult<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| JusicError::database("일봉 DB 열기", e.to_string()))?;
        Ok(PriceApi { conn })
    }

    /// 메모리 DB (테스트용)
    pub fn open_in_memory() -> JusicResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| JusicError::database("메모리 DB 열기", e.to_string()))?;
        Ok(PriceApi { conn })
    }

    /// 테이블 존재 여부 확인
    fn table_exists(&self, ticker: &str) -> JusicResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name = ?",
            rusqlite::params![ticker],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// 기준일 이후의 일봉 조회 (날짜 오름차순)
    pub fn get_daily_prices_from(
        &self,
        ticker: &str,
        from_date: NaiveDate,
    ) -> JusicResult<PriceSeries> {
        if !self.table_exists(ticker)? {
            return Err(JusicError::database_query(format!(
                "일봉 테이블이 존재하지 않습니다: {}",
                ticker
            )));
        }

        let query = format!(
            "SELECT date, open, high, low, close, volume FROM \"{}\" WHERE date >= ? ORDER BY date",
            ticker
        );
        let from_str = from_date.format("%Y%m%d").to_string();

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt.query_map([&from_str], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, f64>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, f64>(4)?,
                row.get::<_, f64>(5)?,
            ))
        })?;

        let mut series = PriceSeries {
            ticker: ticker.to_string(),
            dates: Vec::new(),
            opens: Vec::new(),
            highs: Vec::new(),
            lows: Vec::new(),
            closes: Vec::new(),
            volumes: Vec::new(),
        };

        for row in rows {
            let (date_str, open, high, low, close, volume) = row?;
            let date = NaiveDate::parse_from_str(&date_str, "%Y%m%d").map_err(|e| {
                JusicError::parsing("일봉 날짜", format!("{} ({})", e, date_str))
            })?;
            series.dates.push(date);
            series.opens.push(open);
            series.highs.push(high);
            series.lows.push(low);
            series.closes.push(close);
            series.volumes.push(volume);
        }

        debug!("{}: {}개 일봉 조회됨", ticker, series.len());
        Ok(series)
    }

    /// 최근 lookback_days 달력일 범위의 일봉 조회
    pub fn get_daily_prices(&self, ticker: &str, lookback_days: i64) -> JusicResult<PriceSeries> {
        let today = chrono::Local::now().date_naive();
        let from_date = today - chrono::Duration::days(lookback_days);
        let series = self.get_daily_prices_from(ticker, from_date)?;

        if series.is_empty() {
            return Err(JusicError::data_unavailable(ticker, lookback_days));
        }

        Ok(series)
    }

    /// 제한 횟수 재시도 후 실패하면 오류 반환 (호출 루프가 해당 종목을 건너뜀)
    pub fn get_daily_prices_with_retry(
        &self,
        ticker: &str,
        lookback_days: i64,
        attempts: u32,
    ) -> JusicResult<PriceSeries> {
        let mut last_err = JusicError::data_unavailable(ticker, lookback_days);
        for attempt in 1..=attempts {
            match self.get_daily_prices(ticker, lookback_days) {
                Ok(series) => return Ok(series),
                Err(e) => {
                    warn!("{} 일봉 조회 실패 ({}/{}): {}", ticker, attempt, attempts, e);
                    last_err = e;
                }
            }
        }
        Err(last_err)
    }

    /// 지정일 이후 첫 종가 조회 (예측 검증용)
    pub fn close_on_or_after(
        &self,
        ticker: &str,
        date: NaiveDate,
    ) -> JusicResult<Option<(NaiveDate, f64)>> {
        if !self.table_exists(ticker)? {
            return Ok(None);
        }

        let query = format!(
            "SELECT date, close FROM \"{}\" WHERE date >= ? ORDER BY date LIMIT 1",
            ticker
        );
        let from_str = date.format("%Y%m%d").to_string();

        let mut stmt = self.conn.prepare(&query)?;
        let mut rows = stmt.query_map([&from_str], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        match rows.next() {
            Some(row) => {
                let (date_str, close) = row?;
                let date = NaiveDate::parse_from_str(&date_str, "%Y%m%d").map_err(|e| {
                    JusicError::parsing("일봉 날짜", format!("{} ({})", e, date_str))
                })?;
                Ok(Some((date, close)))
            }
            None => Ok(None),
        }
    }

    /// 일봉 테이블 생성 (수집기/테스트용)
    pub fn create_table(&self, ticker: &str) -> JusicResult<()> {
        let query = format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (
                date TEXT PRIMARY KEY,
                open REAL NOT NULL,
                high REAL NOT NULL,
                low REAL NOT NULL,
                close REAL NOT NULL,
                volume REAL NOT NULL
            )",
            ticker
        );
        self.conn.execute(&query, [])?;
        Ok(())
    }

    /// 일봉 삽입 (수집기/테스트용)
    pub fn insert_bar(
        &self,
        ticker: &str,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> JusicResult<()> {
        let query = format!(
            "INSERT OR REPLACE INTO \"{}\" (date, open, high, low, close, volume) VALUES (?, ?, ?, ?, ?, ?)",
            ticker
        );
        self.conn.execute(
            &query,
            rusqlite::params![
                date.format("%Y%m%d").to_string(),
                open,
                high,
                low,
                close,
                volume
            ],
        )?;
        Ok(())
    }
}
