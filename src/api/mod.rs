use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::models::polygon::{
    PolygonAgg, PolygonDividend, PolygonIndicatorValue, PolygonMarketHoliday, PolygonNewsArticle,
    PolygonSplit, PolygonTicker, PolygonTickerSnapshot,
};
use crate::models::{IndicatorKind, Timespan};

pub mod polygon_client;
pub use polygon_client::PolygonClient;

/// Reference ticker listing filter
#[derive(Debug, Clone, PartialEq)]
pub struct TickerQuery {
    pub market: String,
    pub ticker_type: String,
    pub active: bool,
    pub limit: u32,
}

impl Default for TickerQuery {
    /// Active US common stocks, 1000 per page
    fn default() -> Self {
        Self {
            market: "stocks".to_string(),
            ticker_type: "CS".to_string(),
            active: true,
            limit: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregateRequest {
    pub ticker: String,
    pub multiplier: i64,
    pub timespan: Timespan,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub adjusted: bool,
    pub limit: u32,
}

impl AggregateRequest {
    pub fn new(ticker: &str, multiplier: i64, timespan: Timespan, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            ticker: ticker.to_string(),
            multiplier,
            timespan,
            from,
            to,
            adjusted: true,
            limit: 50_000, // vendor maximum
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotQuery {
    /// `None` requests the whole market
    pub tickers: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorRequest {
    pub ticker: String,
    pub kind: IndicatorKind,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub timespan: Timespan,
    pub limit: u32,
}

impl IndicatorRequest {
    pub fn daily(ticker: &str, kind: IndicatorKind, from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            ticker: ticker.to_string(),
            kind,
            from,
            to,
            timespan: Timespan::Day,
            limit: 5000,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewsQuery {
    pub ticker: Option<String>,
    pub limit: u32,
}

/// Filter for the dividends and splits listings
#[derive(Debug, Clone, PartialEq)]
pub struct CorporateActionQuery {
    pub ticker: Option<String>,
    pub limit: u32,
}

impl CorporateActionQuery {
    pub fn new(ticker: Option<&str>) -> Self {
        Self {
            ticker: ticker.map(str::to_string),
            limit: 1000,
        }
    }
}

/// Source of market data consumed by the collector
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn list_tickers(&self, query: &TickerQuery) -> Result<Vec<PolygonTicker>>;

    async fn list_aggregates(&self, request: &AggregateRequest) -> Result<Vec<PolygonAgg>>;

    async fn get_snapshots(&self, query: &SnapshotQuery) -> Result<Vec<PolygonTickerSnapshot>>;

    async fn get_indicator(&self, request: &IndicatorRequest) -> Result<Vec<PolygonIndicatorValue>>;

    async fn list_news(&self, query: &NewsQuery) -> Result<Vec<PolygonNewsArticle>>;

    async fn list_dividends(&self, query: &CorporateActionQuery) -> Result<Vec<PolygonDividend>>;

    async fn list_splits(&self, query: &CorporateActionQuery) -> Result<Vec<PolygonSplit>>;

    async fn get_market_holidays(&self) -> Result<Vec<PolygonMarketHoliday>>;
}
