use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CollectorError;

pub mod polygon;

/// Reference metadata for one listed symbol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerRecord {
    pub ticker: String,
    pub name: Option<String>,
    pub market: Option<String>,
    pub locale: Option<String>,
    pub primary_exchange: Option<String>,
    pub ticker_type: Option<String>,
    pub active: Option<bool>,
    pub currency_name: Option<String>,
    pub cik: Option<String>,
    pub composite_figi: Option<String>,
    pub share_class_figi: Option<String>,
    pub last_updated_utc: Option<DateTime<Utc>>,
}

/// One OHLCV bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateBar {
    pub ticker: String,
    pub timestamp: i64, // Unix milliseconds, bar start
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub vwap: Option<f64>,
    pub timespan: Timespan,
    pub multiplier: i64,
    pub transactions: Option<i64>,
}

/// Current-session quote state for a ticker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub ticker: String,
    pub timestamp: i64, // Unix milliseconds
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<i64>,
    pub prev_close: Option<f64>,
    pub change: Option<f64>,
    pub change_percent: Option<f64>,
    pub updated_at: i64, // Unix seconds, collection time
}

/// One value of a technical indicator series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorPoint {
    pub ticker: String,
    pub timestamp: i64,
    pub indicator: IndicatorKind,
    pub value: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub id: String,
    pub ticker: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_utc: Option<DateTime<Utc>>,
    pub article_url: Option<String>,
    pub amp_url: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    /// JSON array of keywords
    pub keywords: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub ticker: String,
    pub ex_dividend_date: NaiveDate,
    pub payment_date: Option<NaiveDate>,
    pub record_date: Option<NaiveDate>,
    pub declared_date: Option<NaiveDate>,
    pub amount: Option<f64>,
    pub flag: Option<String>,
    pub currency: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockSplit {
    pub ticker: String,
    pub execution_date: NaiveDate,
    pub split_from: Option<f64>,
    pub split_to: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketHoliday {
    pub date: NaiveDate,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub status: Option<String>,
}

/// Bar size unit accepted by the aggregates endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timespan {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl Timespan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timespan::Second => "second",
            Timespan::Minute => "minute",
            Timespan::Hour => "hour",
            Timespan::Day => "day",
            Timespan::Week => "week",
            Timespan::Month => "month",
            Timespan::Quarter => "quarter",
            Timespan::Year => "year",
        }
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timespan {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "second" => Ok(Timespan::Second),
            "minute" => Ok(Timespan::Minute),
            "hour" => Ok(Timespan::Hour),
            "day" => Ok(Timespan::Day),
            "week" => Ok(Timespan::Week),
            "month" => Ok(Timespan::Month),
            "quarter" => Ok(Timespan::Quarter),
            "year" => Ok(Timespan::Year),
            other => Err(CollectorError::Config(format!("unknown timespan: {}", other))),
        }
    }
}

/// Technical indicators collected per ticker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorKind {
    Sma,
    Ema,
    Rsi,
    Macd,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 4] = [
        IndicatorKind::Sma,
        IndicatorKind::Ema,
        IndicatorKind::Rsi,
        IndicatorKind::Macd,
    ];

    /// Path segment of the indicator endpoint, also the stored `indicator_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            IndicatorKind::Sma => "sma",
            IndicatorKind::Ema => "ema",
            IndicatorKind::Rsi => "rsi",
            IndicatorKind::Macd => "macd",
        }
    }

    /// Fixed window parameters sent with each request
    pub fn window_params(&self) -> Vec<(&'static str, u32)> {
        match self {
            IndicatorKind::Sma | IndicatorKind::Ema => vec![("window", 20)],
            IndicatorKind::Rsi => vec![("window", 14)],
            IndicatorKind::Macd => vec![
                ("short_window", 12),
                ("long_window", 26),
                ("signal_window", 9),
            ],
        }
    }

    /// Only MACD produces signal and histogram series
    pub fn has_signal(&self) -> bool {
        matches!(self, IndicatorKind::Macd)
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IndicatorKind {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sma" => Ok(IndicatorKind::Sma),
            "ema" => Ok(IndicatorKind::Ema),
            "rsi" => Ok(IndicatorKind::Rsi),
            "macd" => Ok(IndicatorKind::Macd),
            other => Err(CollectorError::Config(format!("unknown indicator: {}", other))),
        }
    }
}

/// Storage tables, in report order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Tickers,
    Aggregates,
    Snapshots,
    TechnicalIndicators,
    News,
    Dividends,
    StockSplits,
    MarketHolidays,
}

impl Table {
    pub const ALL: [Table; 8] = [
        Table::Tickers,
        Table::Aggregates,
        Table::Snapshots,
        Table::TechnicalIndicators,
        Table::News,
        Table::Dividends,
        Table::StockSplits,
        Table::MarketHolidays,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Tickers => "tickers",
            Table::Aggregates => "aggregates",
            Table::Snapshots => "snapshots",
            Table::TechnicalIndicators => "technical_indicators",
            Table::News => "news",
            Table::Dividends => "dividends",
            Table::StockSplits => "stock_splits",
            Table::MarketHolidays => "market_holidays",
        }
    }

    /// Short label used in the summary report
    pub fn label(&self) -> &'static str {
        match self {
            Table::Tickers => "tickers",
            Table::Aggregates => "aggregates",
            Table::Snapshots => "snapshots",
            Table::TechnicalIndicators => "indicators",
            Table::News => "news",
            Table::Dividends => "dividends",
            Table::StockSplits => "splits",
            Table::MarketHolidays => "holidays",
        }
    }
}

/// Inclusive date window for a collection run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Window ending on `today` and reaching `days_back` days into the past
    ///
    /// `None` when `days_back` is negative or reaches before the calendar's start.
    pub fn last_days(today: NaiveDate, days_back: i64) -> Option<Self> {
        let days = u64::try_from(days_back).ok()?;
        let start = today.checked_sub_days(Days::new(days))?;

        Some(Self { start, end: today })
    }

    pub fn days_count(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Configuration for the collector
#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub database_path: String,
    pub log_file: String,
    /// Explicit universe; `None` means fetch all tickers and take `ticker_limit`
    pub tickers: Option<Vec<String>>,
    pub ticker_limit: usize,
    pub days_back: i64,
    pub ticker_delay_ms: u64,
    pub news_limit: u32,
    pub ticker_news_limit: u32,
    /// Cap on `next_url` pages per paginated call; `None` follows every page
    pub max_pages: Option<usize>,
    pub request_timeout_secs: u64,
}

pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// Upper bound accepted for `DAYS_BACK` (about a century)
pub const MAX_DAYS_BACK: i64 = 36_500;

impl Config {
    /// Configuration with default values for everything except the credential
    pub fn new(api_key: impl Into<String>) -> Self {
        Config {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            database_path: "polygon_market_data.db".to_string(),
            log_file: "polygon_data_collection.log".to_string(),
            tickers: None,
            ticker_limit: 100,
            days_back: 30,
            ticker_delay_ms: 100,
            news_limit: 1000,
            ticker_news_limit: 50,
            max_pages: None,
            request_timeout_secs: 30,
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> crate::error::Result<Self> {
        dotenvy::dotenv().ok(); // Load .env file if it exists

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> crate::error::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("POLYGON_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                CollectorError::Config("POLYGON_API_KEY environment variable required".to_string())
            })?;

        let mut config = Config::new(api_key);

        if let Some(base_url) = lookup("POLYGON_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            config.database_path = path;
        }
        if let Some(path) = lookup("LOG_FILE") {
            config.log_file = path;
        }

        config.tickers = lookup("COLLECT_TICKERS")
            .map(|list| {
                list.split(',')
                    .map(|t| t.trim().to_uppercase())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|tickers| !tickers.is_empty());

        config.ticker_limit = parse_or(&lookup, "TICKER_UNIVERSE_LIMIT", config.ticker_limit);
        if let Some(raw) = lookup("DAYS_BACK") {
            config.days_back = raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|days| (0..=MAX_DAYS_BACK).contains(days))
                .ok_or_else(|| {
                    CollectorError::Config(format!(
                        "DAYS_BACK must be a whole number between 0 and {}, got {:?}",
                        MAX_DAYS_BACK, raw
                    ))
                })?;
        }
        config.ticker_delay_ms = parse_or(&lookup, "TICKER_DELAY_MS", config.ticker_delay_ms);
        config.news_limit = parse_or(&lookup, "NEWS_LIMIT", config.news_limit);
        config.ticker_news_limit = parse_or(&lookup, "TICKER_NEWS_LIMIT", config.ticker_news_limit);
        // 0 means no cap, same as leaving it unset
        config.max_pages = lookup("MAX_PAGES")
            .and_then(|v| v.trim().parse().ok())
            .filter(|max: &usize| *max > 0);
        config.request_timeout_secs =
            parse_or(&lookup, "REQUEST_TIMEOUT_SECS", config.request_timeout_secs);

        Ok(config)
    }

    pub fn ticker_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.ticker_delay_ms)
    }
}

/// Parse a value from the lookup, falling back to the default when unset or malformed
fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
