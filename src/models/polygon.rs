//! Response shapes of the Polygon.io REST API.
//!
//! Every field is optional: the vendor omits keys freely, and a missing
//! value must become a NULL column rather than a failed collection.

use serde::Deserialize;

/// Envelope shared by the v2/v3 list endpoints
#[derive(Debug, Deserialize)]
pub struct PagedResponse<T> {
    pub status: Option<String>,
    pub results: Option<Vec<T>>,
    /// Absolute URL of the next page, absent on the last one
    pub next_url: Option<String>,
}

/// `/v3/reference/tickers` item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolygonTicker {
    pub ticker: Option<String>,
    pub name: Option<String>,
    pub market: Option<String>,
    pub locale: Option<String>,
    pub primary_exchange: Option<String>,
    #[serde(rename = "type")]
    pub ticker_type: Option<String>,
    pub active: Option<bool>,
    pub currency_name: Option<String>,
    pub cik: Option<String>,
    pub composite_figi: Option<String>,
    pub share_class_figi: Option<String>,
    pub last_updated_utc: Option<String>,
}

/// Aggregate bar, used by `/v2/aggs` and by the snapshot `day`/`prevDay` blocks
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolygonAgg {
    #[serde(rename = "o")]
    pub open: Option<f64>,
    #[serde(rename = "h")]
    pub high: Option<f64>,
    #[serde(rename = "l")]
    pub low: Option<f64>,
    #[serde(rename = "c")]
    pub close: Option<f64>,
    #[serde(rename = "v")]
    pub volume: Option<f64>,
    #[serde(rename = "vw")]
    pub vwap: Option<f64>,
    #[serde(rename = "t")]
    pub timestamp: Option<i64>,
    #[serde(rename = "n")]
    pub transactions: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct PolygonSnapshotResponse {
    pub status: Option<String>,
    pub tickers: Option<Vec<PolygonTickerSnapshot>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolygonTickerSnapshot {
    pub ticker: Option<String>,
    #[serde(rename = "todaysChange")]
    pub todays_change: Option<f64>,
    #[serde(rename = "todaysChangePerc")]
    pub todays_change_percent: Option<f64>,
    /// Nanoseconds since epoch
    pub updated: Option<i64>,
    pub day: Option<PolygonAgg>,
    #[serde(rename = "prevDay")]
    pub prev_day: Option<PolygonAgg>,
}

#[derive(Debug, Deserialize)]
pub struct PolygonIndicatorResponse {
    pub status: Option<String>,
    pub results: Option<PolygonIndicatorResults>,
}

#[derive(Debug, Deserialize)]
pub struct PolygonIndicatorResults {
    pub values: Option<Vec<PolygonIndicatorValue>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolygonIndicatorValue {
    pub timestamp: Option<i64>,
    pub value: Option<f64>,
    pub signal: Option<f64>,
    pub histogram: Option<f64>,
}

/// `/v2/reference/news` item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolygonNewsArticle {
    pub id: Option<String>,
    pub tickers: Option<Vec<String>>,
    pub title: Option<String>,
    pub author: Option<String>,
    pub published_utc: Option<String>,
    pub article_url: Option<String>,
    pub amp_url: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub keywords: Option<Vec<String>>,
}

/// `/v3/reference/dividends` item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolygonDividend {
    pub ticker: Option<String>,
    pub ex_dividend_date: Option<String>,
    pub pay_date: Option<String>,
    pub record_date: Option<String>,
    pub declaration_date: Option<String>,
    pub cash_amount: Option<f64>,
    pub dividend_type: Option<String>,
    pub currency: Option<String>,
}

/// `/v3/reference/splits` item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolygonSplit {
    pub ticker: Option<String>,
    pub execution_date: Option<String>,
    pub split_from: Option<f64>,
    pub split_to: Option<f64>,
}

/// `/v1/marketstatus/upcoming` item
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolygonMarketHoliday {
    pub date: Option<String>,
    pub name: Option<String>,
    pub exchange: Option<String>,
    pub status: Option<String>,
}
