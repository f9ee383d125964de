//! Common test utilities and helpers


pub use database::init_fresh_test_database;

/// Test data utilities
pub mod test_data {
    use chrono::NaiveDate;
    use polygon_collector::models::{
        AggregateBar, Dividend, MarketHoliday, NewsArticle, Snapshot, StockSplit, TickerRecord,
        Timespan,
    };

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Midnight UTC of the given date, in Unix milliseconds
    pub fn millis(y: i32, m: u32, d: u32) -> i64 {
        date(y, m, d).and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp_millis()
    }

    pub fn create_test_ticker(symbol: &str, name: &str) -> TickerRecord {
        TickerRecord {
            ticker: symbol.to_string(),
            name: Some(name.to_string()),
            market: Some("stocks".to_string()),
            locale: Some("us".to_string()),
            primary_exchange: Some("XNAS".to_string()),
            ticker_type: Some("CS".to_string()),
            active: Some(true),
            currency_name: Some("usd".to_string()),
            cik: None,
            composite_figi: None,
            share_class_figi: None,
            last_updated_utc: None,
        }
    }

    pub fn create_test_bar(ticker: &str, timestamp: i64, close: f64) -> AggregateBar {
        AggregateBar {
            ticker: ticker.to_string(),
            timestamp,
            open: Some(close - 1.0),
            high: Some(close + 2.0),
            low: Some(close - 3.0),
            close: Some(close),
            volume: Some(1_000_000),
            vwap: Some(close - 0.5),
            timespan: Timespan::Day,
            multiplier: 1,
            transactions: Some(5_000),
        }
    }

    pub fn create_test_snapshot(ticker: &str, timestamp: i64, close: f64) -> Snapshot {
        Snapshot {
            ticker: ticker.to_string(),
            timestamp,
            open: Some(close),
            high: Some(close),
            low: Some(close),
            close: Some(close),
            volume: Some(10),
            prev_close: None,
            change: None,
            change_percent: None,
            updated_at: timestamp / 1000,
        }
    }

    pub fn create_test_article(id: &str, title: &str) -> NewsArticle {
        NewsArticle {
            id: id.to_string(),
            ticker: Some("ABC".to_string()),
            title: Some(title.to_string()),
            author: None,
            published_utc: None,
            article_url: None,
            amp_url: None,
            image_url: None,
            description: None,
            keywords: "[]".to_string(),
        }
    }

    pub fn create_test_dividend(ticker: &str, ex_date: NaiveDate, amount: f64) -> Dividend {
        Dividend {
            ticker: ticker.to_string(),
            ex_dividend_date: ex_date,
            payment_date: None,
            record_date: None,
            declared_date: None,
            amount: Some(amount),
            flag: Some("CD".to_string()),
            currency: Some("USD".to_string()),
        }
    }

    pub fn create_test_split(ticker: &str, execution_date: NaiveDate, from: f64, to: f64) -> StockSplit {
        StockSplit {
            ticker: ticker.to_string(),
            execution_date,
            split_from: Some(from),
            split_to: Some(to),
        }
    }

    pub fn create_test_holiday(date: NaiveDate, exchange: &str) -> MarketHoliday {
        MarketHoliday {
            date,
            name: Some("Market Holiday".to_string()),
            exchange: Some(exchange.to_string()),
            status: Some("closed".to_string()),
        }
    }
}

/// Logging utilities for tests
pub mod logging {
    use tracing::{debug, info};

    /// Log test step
    pub fn log_test_step(step: &str) {
        info!("🧪 Test Step: {}", step);
    }

    /// Log test data
    pub fn log_test_data<T: std::fmt::Debug>(label: &str, data: &T) {
        debug!("📊 {}: {:?}", label, data);
    }
}
