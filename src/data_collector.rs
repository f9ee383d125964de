use chrono::{DateTime, Utc};
use tracing::{debug, error, info};

use crate::api::{
    AggregateRequest, CorporateActionQuery, IndicatorRequest, MarketDataProvider, NewsQuery,
    SnapshotQuery, TickerQuery,
};
use crate::database::DatabaseManager;
use crate::error::Result;
use crate::models::polygon::{
    PolygonAgg, PolygonDividend, PolygonIndicatorValue, PolygonMarketHoliday, PolygonNewsArticle,
    PolygonSplit, PolygonTicker, PolygonTickerSnapshot,
};
use crate::models::{
    AggregateBar, DateRange, Dividend, IndicatorKind, IndicatorPoint, MarketHoliday, NewsArticle,
    Snapshot, StockSplit, TickerRecord, Timespan,
};
use crate::utils::{nanos_to_millis, parse_date, parse_utc};

/// Fetch-and-persist operations, one per data domain
///
/// Every `collect_*` method logs and swallows its own failures: the caller
/// only sees how many rows reached storage (0 on error or empty response).
pub struct DataCollector<P: MarketDataProvider> {
    provider: P,
    database: DatabaseManager,
}

impl<P: MarketDataProvider> DataCollector<P> {
    pub fn new(provider: P, database: DatabaseManager) -> Self {
        Self { provider, database }
    }

    pub fn database(&self) -> &DatabaseManager {
        &self.database
    }

    /// Fetch every active common stock and refresh the tickers table
    ///
    /// Returns the fetched tickers even if persisting them failed.
    pub async fn collect_all_tickers(&self) -> Vec<TickerRecord> {
        info!("Collecting all available tickers...");

        let tickers: Vec<TickerRecord> = match self.provider.list_tickers(&TickerQuery::default()).await {
            Ok(raw) => raw.into_iter().filter_map(ticker_row).collect(),
            Err(e) => {
                error!("Error collecting tickers: {}", e);
                return Vec::new();
            }
        };

        match self.database.save_tickers(&tickers).await {
            Ok(_) => info!("Collected {} tickers", tickers.len()),
            Err(e) => error!("Error collecting tickers: {}", e),
        }

        tickers
    }

    /// Collect bars of one resolution for a ticker
    pub async fn collect_aggregates(
        &self,
        ticker: &str,
        range: DateRange,
        timespan: Timespan,
        multiplier: i64,
    ) -> usize {
        info!(
            "Collecting {} aggregates for {} from {} to {}",
            timespan, ticker, range.start, range.end
        );

        match self.try_collect_aggregates(ticker, range, timespan, multiplier).await {
            Ok(saved) => {
                if saved > 0 {
                    info!("Saved {} aggregate records for {}", saved, ticker);
                }
                saved
            }
            Err(e) => {
                error!("Error collecting aggregates for {}: {}", ticker, e);
                0
            }
        }
    }

    async fn try_collect_aggregates(
        &self,
        ticker: &str,
        range: DateRange,
        timespan: Timespan,
        multiplier: i64,
    ) -> Result<usize> {
        let request = AggregateRequest::new(ticker, multiplier, timespan, range.start, range.end);
        let raw = self.provider.list_aggregates(&request).await?;

        let bars: Vec<AggregateBar> = raw
            .iter()
            .filter_map(|agg| aggregate_row(ticker, timespan, multiplier, agg))
            .collect();
        log_dropped("aggregate", raw.len(), bars.len());

        self.database.save_aggregates(&bars).await
    }

    /// Collect current-day snapshots, for the whole market or the given tickers
    pub async fn collect_snapshots(&self, tickers: Option<&[String]>) -> usize {
        info!("Collecting market snapshots...");

        match self.try_collect_snapshots(tickers).await {
            Ok(saved) => {
                if saved > 0 {
                    info!("Saved {} snapshot records", saved);
                }
                saved
            }
            Err(e) => {
                error!("Error collecting snapshots: {}", e);
                0
            }
        }
    }

    async fn try_collect_snapshots(&self, tickers: Option<&[String]>) -> Result<usize> {
        let query = SnapshotQuery {
            tickers: tickers.map(|t| t.to_vec()),
        };
        let raw = self.provider.get_snapshots(&query).await?;

        let collected_at = Utc::now();
        let snapshots: Vec<Snapshot> = raw
            .iter()
            .filter_map(|s| snapshot_row(s, collected_at))
            .collect();
        log_dropped("snapshot", raw.len(), snapshots.len());

        self.database.save_snapshots(&snapshots).await
    }

    /// Collect SMA, EMA, RSI and MACD series for a ticker
    ///
    /// Each indicator is fetched separately; one failing does not stop the rest.
    pub async fn collect_technical_indicators(&self, ticker: &str, range: DateRange) -> usize {
        info!("Collecting technical indicators for {}", ticker);

        let mut total = 0;
        for kind in IndicatorKind::ALL {
            match self.try_collect_indicator(ticker, kind, range).await {
                Ok(saved) => {
                    if saved > 0 {
                        info!("Saved {} data for {}", kind, ticker);
                    }
                    total += saved;
                }
                Err(e) => error!("Error collecting {} for {}: {}", kind, ticker, e),
            }
        }
        total
    }

    async fn try_collect_indicator(
        &self,
        ticker: &str,
        kind: IndicatorKind,
        range: DateRange,
    ) -> Result<usize> {
        let request = IndicatorRequest::daily(ticker, kind, range.start, range.end);
        let raw = self.provider.get_indicator(&request).await?;

        let points: Vec<IndicatorPoint> = raw
            .iter()
            .filter_map(|v| indicator_row(ticker, kind, v))
            .collect();
        log_dropped("indicator", raw.len(), points.len());

        self.database.save_indicators(&points).await
    }

    /// Collect the latest news, market-wide or scoped to one ticker
    ///
    /// Articles already stored are left as they are; returns how many were new.
    pub async fn collect_news(&self, ticker: Option<&str>, limit: u32) -> usize {
        match ticker {
            Some(t) => info!("Collecting news for {}...", t),
            None => info!("Collecting news for all tickers..."),
        }

        match self.try_collect_news(ticker, limit).await {
            Ok(saved) => {
                if saved > 0 {
                    info!("Saved {} news articles", saved);
                }
                saved
            }
            Err(e) => {
                error!("Error collecting news: {}", e);
                0
            }
        }
    }

    async fn try_collect_news(&self, ticker: Option<&str>, limit: u32) -> Result<usize> {
        let query = NewsQuery {
            ticker: ticker.map(str::to_string),
            limit,
        };
        let raw = self.provider.list_news(&query).await?;

        let articles: Vec<NewsArticle> = raw
            .iter()
            .filter_map(|a| news_row(a, ticker))
            .collect();
        log_dropped("news", raw.len(), articles.len());

        self.database.save_news(&articles).await
    }

    pub async fn collect_dividends(&self, ticker: Option<&str>) -> usize {
        match ticker {
            Some(t) => info!("Collecting dividends for {}...", t),
            None => info!("Collecting dividends..."),
        }

        match self.try_collect_dividends(ticker).await {
            Ok(saved) => {
                if saved > 0 {
                    info!("Saved {} dividend records", saved);
                }
                saved
            }
            Err(e) => {
                error!("Error collecting dividends: {}", e);
                0
            }
        }
    }

    async fn try_collect_dividends(&self, ticker: Option<&str>) -> Result<usize> {
        let raw = self
            .provider
            .list_dividends(&CorporateActionQuery::new(ticker))
            .await?;

        let dividends: Vec<Dividend> = raw.iter().filter_map(dividend_row).collect();
        log_dropped("dividend", raw.len(), dividends.len());

        self.database.save_dividends(&dividends).await
    }

    pub async fn collect_splits(&self, ticker: Option<&str>) -> usize {
        match ticker {
            Some(t) => info!("Collecting splits for {}...", t),
            None => info!("Collecting splits..."),
        }

        match self.try_collect_splits(ticker).await {
            Ok(saved) => {
                if saved > 0 {
                    info!("Saved {} split records", saved);
                }
                saved
            }
            Err(e) => {
                error!("Error collecting splits: {}", e);
                0
            }
        }
    }

    async fn try_collect_splits(&self, ticker: Option<&str>) -> Result<usize> {
        let raw = self
            .provider
            .list_splits(&CorporateActionQuery::new(ticker))
            .await?;

        let splits: Vec<StockSplit> = raw.iter().filter_map(split_row).collect();
        log_dropped("split", raw.len(), splits.len());

        self.database.save_splits(&splits).await
    }

    pub async fn collect_market_holidays(&self) -> usize {
        info!("Collecting market holidays...");

        match self.try_collect_market_holidays().await {
            Ok(saved) => {
                if saved > 0 {
                    info!("Saved {} holiday records", saved);
                }
                saved
            }
            Err(e) => {
                error!("Error collecting holidays: {}", e);
                0
            }
        }
    }

    async fn try_collect_market_holidays(&self) -> Result<usize> {
        let raw = self.provider.get_market_holidays().await?;

        let holidays: Vec<MarketHoliday> = raw.iter().filter_map(holiday_row).collect();
        log_dropped("holiday", raw.len(), holidays.len());

        self.database.save_holidays(&holidays).await
    }
}

fn log_dropped(kind: &str, received: usize, kept: usize) {
    if received > kept {
        debug!("Dropped {} {} records without a complete key", received - kept, kind);
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

fn ticker_row(t: PolygonTicker) -> Option<TickerRecord> {
    let ticker = non_empty(t.ticker.as_deref())?;

    Some(TickerRecord {
        ticker,
        last_updated_utc: parse_utc(t.last_updated_utc.as_deref()),
        name: t.name,
        market: t.market,
        locale: t.locale,
        primary_exchange: t.primary_exchange,
        ticker_type: t.ticker_type,
        active: t.active,
        currency_name: t.currency_name,
        cik: t.cik,
        composite_figi: t.composite_figi,
        share_class_figi: t.share_class_figi,
    })
}

fn aggregate_row(ticker: &str, timespan: Timespan, multiplier: i64, agg: &PolygonAgg) -> Option<AggregateBar> {
    Some(AggregateBar {
        ticker: ticker.to_string(),
        timestamp: agg.timestamp?,
        open: agg.open,
        high: agg.high,
        low: agg.low,
        close: agg.close,
        volume: agg.volume.map(|v| v.round() as i64),
        vwap: agg.vwap,
        timespan,
        multiplier,
        transactions: agg.transactions,
    })
}

/// Keyed by the day bar's start, else the vendor update time, else `collected_at`
fn snapshot_row(s: &PolygonTickerSnapshot, collected_at: DateTime<Utc>) -> Option<Snapshot> {
    let ticker = non_empty(s.ticker.as_deref())?;
    let day = s.day.as_ref()?;

    // Without a vendor timestamp the row has no stable key across runs
    let timestamp = day.timestamp.or_else(|| s.updated.map(nanos_to_millis))?;

    Some(Snapshot {
        ticker,
        timestamp,
        open: day.open,
        high: day.high,
        low: day.low,
        close: day.close,
        volume: day.volume.map(|v| v.round() as i64),
        prev_close: s.prev_day.as_ref().and_then(|p| p.close),
        change: s.todays_change,
        change_percent: s.todays_change_percent,
        updated_at: collected_at.timestamp(),
    })
}

fn indicator_row(ticker: &str, kind: IndicatorKind, v: &PolygonIndicatorValue) -> Option<IndicatorPoint> {
    let (signal, histogram) = if kind.has_signal() {
        (v.signal, v.histogram)
    } else {
        (None, None)
    };

    Some(IndicatorPoint {
        ticker: ticker.to_string(),
        timestamp: v.timestamp?,
        indicator: kind,
        value: v.value,
        signal,
        histogram,
    })
}

/// First listed ticker wins; falls back to the ticker the query was scoped to
fn news_row(a: &PolygonNewsArticle, scoped_ticker: Option<&str>) -> Option<NewsArticle> {
    let id = non_empty(a.id.as_deref())?;

    let ticker = a
        .tickers
        .as_ref()
        .and_then(|t| t.first().cloned())
        .or_else(|| scoped_ticker.map(str::to_string));

    let keywords = serde_json::to_string(a.keywords.as_deref().unwrap_or(&[]))
        .unwrap_or_else(|_| "[]".to_string());

    Some(NewsArticle {
        id,
        ticker,
        title: a.title.clone(),
        author: a.author.clone(),
        published_utc: parse_utc(a.published_utc.as_deref()),
        article_url: a.article_url.clone(),
        amp_url: a.amp_url.clone(),
        image_url: a.image_url.clone(),
        description: a.description.clone(),
        keywords,
    })
}

fn dividend_row(d: &PolygonDividend) -> Option<Dividend> {
    Some(Dividend {
        ticker: non_empty(d.ticker.as_deref())?,
        ex_dividend_date: parse_date(d.ex_dividend_date.as_deref())?,
        payment_date: parse_date(d.pay_date.as_deref()),
        record_date: parse_date(d.record_date.as_deref()),
        declared_date: parse_date(d.declaration_date.as_deref()),
        amount: d.cash_amount,
        flag: d.dividend_type.clone(),
        currency: d.currency.clone(),
    })
}

fn split_row(s: &PolygonSplit) -> Option<StockSplit> {
    Some(StockSplit {
        ticker: non_empty(s.ticker.as_deref())?,
        execution_date: parse_date(s.execution_date.as_deref())?,
        split_from: s.split_from,
        split_to: s.split_to,
    })
}

fn holiday_row(h: &PolygonMarketHoliday) -> Option<MarketHoliday> {
    Some(MarketHoliday {
        date: parse_date(h.date.as_deref())?,
        name: h.name.clone(),
        exchange: h.exchange.clone(),
        status: h.status.clone(),
    })
}
