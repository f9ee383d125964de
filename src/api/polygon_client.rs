use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Client,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::{
    AggregateRequest, CorporateActionQuery, IndicatorRequest, MarketDataProvider, NewsQuery,
    SnapshotQuery, TickerQuery,
};
use crate::error::{CollectorError, Result};
use crate::models::polygon::{
    PagedResponse, PolygonAgg, PolygonDividend, PolygonIndicatorResponse, PolygonIndicatorValue,
    PolygonMarketHoliday, PolygonNewsArticle, PolygonSnapshotResponse, PolygonSplit, PolygonTicker,
    PolygonTickerSnapshot,
};
use crate::models::Config;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Polygon.io REST client
///
/// One `reqwest::Client` carries the bearer credential for every call. The
/// raw indicator and news endpoints also get the key as an `apiKey` query
/// parameter. List endpoints are followed through their `next_url` cursor.
pub struct PolygonClient {
    client: Client,
    base_url: Url,
    api_key: String,
    max_pages: Option<usize>,
}

impl PolygonClient {
    /// Create a new Polygon client
    pub fn new(config: &Config) -> Result<Self> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", config.api_key))
            .map_err(|e| CollectorError::Config(format!("API key is not a valid header value: {}", e)))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent("polygon-collector/0.1")
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: Url::parse(&config.base_url)?,
            api_key: config.api_key.clone(),
            // Some(0) would still fetch one page
            max_pages: config.max_pages.filter(|max| *max > 0),
        })
    }

    /// Base URL with the given segments appended to its path (each one percent-encoded)
    ///
    /// A path prefix on the base URL, such as a proxy mount point, is kept.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CollectorError::Config(format!("base URL cannot hold a path: {}", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn tickers_url(&self, query: &TickerQuery) -> Result<Url> {
        let mut url = self.endpoint(&["v3", "reference", "tickers"])?;
        url.query_pairs_mut()
            .append_pair("market", &query.market)
            .append_pair("type", &query.ticker_type)
            .append_pair("active", &query.active.to_string())
            .append_pair("limit", &query.limit.to_string());
        Ok(url)
    }

    fn aggregates_url(&self, request: &AggregateRequest) -> Result<Url> {
        let multiplier = request.multiplier.to_string();
        let from = request.from.format(DATE_FORMAT).to_string();
        let to = request.to.format(DATE_FORMAT).to_string();

        let mut url = self.endpoint(&[
            "v2",
            "aggs",
            "ticker",
            &request.ticker,
            "range",
            &multiplier,
            request.timespan.as_str(),
            &from,
            &to,
        ])?;
        url.query_pairs_mut()
            .append_pair("adjusted", &request.adjusted.to_string())
            .append_pair("sort", "asc")
            .append_pair("limit", &request.limit.to_string());
        Ok(url)
    }

    fn snapshots_url(&self, query: &SnapshotQuery) -> Result<Url> {
        let mut url = self.endpoint(&["v2", "snapshot", "locale", "us", "markets", "stocks", "tickers"])?;
        if let Some(tickers) = query.tickers.as_ref().filter(|t| !t.is_empty()) {
            url.query_pairs_mut().append_pair("tickers", &tickers.join(","));
        }
        Ok(url)
    }

    fn indicator_url(&self, request: &IndicatorRequest) -> Result<Url> {
        let mut url = self.endpoint(&["v1", "indicators", request.kind.as_str(), &request.ticker])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("timestamp.gte", &request.from.format(DATE_FORMAT).to_string())
                .append_pair("timestamp.lte", &request.to.format(DATE_FORMAT).to_string())
                .append_pair("timespan", request.timespan.as_str())
                .append_pair("adjusted", "true")
                .append_pair("series_type", "close")
                .append_pair("limit", &request.limit.to_string());
            for (name, window) in request.kind.window_params() {
                pairs.append_pair(name, &window.to_string());
            }
            pairs.append_pair("apiKey", &self.api_key);
        }
        Ok(url)
    }

    fn news_url(&self, query: &NewsQuery) -> Result<Url> {
        let mut url = self.endpoint(&["v2", "reference", "news"])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("limit", &query.limit.to_string())
                .append_pair("sort", "published_utc")
                .append_pair("order", "desc");
            if let Some(ticker) = &query.ticker {
                pairs.append_pair("ticker", ticker);
            }
            pairs.append_pair("apiKey", &self.api_key);
        }
        Ok(url)
    }

    fn corporate_action_url(&self, resource: &str, query: &CorporateActionQuery) -> Result<Url> {
        let mut url = self.endpoint(&["v3", "reference", resource])?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("limit", &query.limit.to_string());
            if let Some(ticker) = &query.ticker {
                pairs.append_pair("ticker", ticker);
            }
        }
        Ok(url)
    }

    /// GET a URL and decode its JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        debug!("Making request to: {}", url.path());

        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CollectorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        debug!("API response received: {} bytes", body.len());
        Ok(serde_json::from_str(&body)?)
    }

    /// Collect `results` from a list endpoint, following `next_url` cursors
    async fn get_all_pages<T: DeserializeOwned>(&self, first: Url) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let mut next = Some(first);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let page: PagedResponse<T> = self.get_json(url).await?;
            pages += 1;
            items.extend(page.results.unwrap_or_default());

            if self.max_pages.map_or(false, |max| pages >= max) {
                debug!("Stopping pagination after {} pages", pages);
                break;
            }

            next = match page.next_url.filter(|u| !u.is_empty()) {
                Some(next_url) => Some(Url::parse(&next_url)?),
                None => None,
            };
        }

        debug!("Fetched {} records over {} pages", items.len(), pages);
        Ok(items)
    }
}

#[async_trait]
impl MarketDataProvider for PolygonClient {
    async fn list_tickers(&self, query: &TickerQuery) -> Result<Vec<PolygonTicker>> {
        self.get_all_pages(self.tickers_url(query)?).await
    }

    async fn list_aggregates(&self, request: &AggregateRequest) -> Result<Vec<PolygonAgg>> {
        self.get_all_pages(self.aggregates_url(request)?).await
    }

    async fn get_snapshots(&self, query: &SnapshotQuery) -> Result<Vec<PolygonTickerSnapshot>> {
        let response: PolygonSnapshotResponse = self.get_json(self.snapshots_url(query)?).await?;
        Ok(response.tickers.unwrap_or_default())
    }

    async fn get_indicator(&self, request: &IndicatorRequest) -> Result<Vec<PolygonIndicatorValue>> {
        let response: PolygonIndicatorResponse = self.get_json(self.indicator_url(request)?).await?;
        Ok(response
            .results
            .and_then(|results| results.values)
            .unwrap_or_default())
    }

    async fn list_news(&self, query: &NewsQuery) -> Result<Vec<PolygonNewsArticle>> {
        // Single page: `limit` bounds the result
        let page: PagedResponse<PolygonNewsArticle> = self.get_json(self.news_url(query)?).await?;
        Ok(page.results.unwrap_or_default())
    }

    async fn list_dividends(&self, query: &CorporateActionQuery) -> Result<Vec<PolygonDividend>> {
        self.get_all_pages(self.corporate_action_url("dividends", query)?).await
    }

    async fn list_splits(&self, query: &CorporateActionQuery) -> Result<Vec<PolygonSplit>> {
        self.get_all_pages(self.corporate_action_url("splits", query)?).await
    }

    async fn get_market_holidays(&self) -> Result<Vec<PolygonMarketHoliday>> {
        self.get_json(self.endpoint(&["v1", "marketstatus", "upcoming"])?).await
    }
}
