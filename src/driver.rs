//! Fixed-sequence orchestration of a full collection run.

use chrono::Utc;
use std::time::{Duration, Instant};
use tracing::{error, info};

use crate::api::MarketDataProvider;
use crate::data_collector::DataCollector;
use crate::models::{Config, DateRange, Timespan};
use crate::report::generate_summary_report;

/// Resolutions collected for every ticker: (timespan, multiplier)
pub const AGGREGATE_RESOLUTIONS: [(Timespan, i64); 3] = [
    (Timespan::Day, 1),
    (Timespan::Hour, 1),
    (Timespan::Minute, 5),
];

/// Rows written during one run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub tickers_total: usize,
    pub tickers_processed: usize,
    pub holidays: usize,
    pub snapshots: usize,
    pub news: usize,
    pub dividends: usize,
    pub splits: usize,
    pub aggregates: usize,
    pub indicators: usize,
    pub elapsed: Duration,
}

impl RunStats {
    pub fn total_rows(&self) -> usize {
        self.holidays
            + self.snapshots
            + self.news
            + self.dividends
            + self.splits
            + self.aggregates
            + self.indicators
    }

    pub fn log_summary(&self) {
        info!(
            tickers = self.tickers_processed,
            holidays = self.holidays,
            snapshots = self.snapshots,
            news = self.news,
            dividends = self.dividends,
            splits = self.splits,
            aggregates = self.aggregates,
            indicators = self.indicators,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "Complete data collection finished!"
        );
    }
}

/// Run every domain over the last `config.days_back` days
///
/// Nothing is collected when `days_back` cannot form a window.
pub async fn run_complete_collection<P: MarketDataProvider>(
    collector: &DataCollector<P>,
    config: &Config,
) -> RunStats {
    match DateRange::last_days(Utc::now().date_naive(), config.days_back) {
        Some(window) => run_collection_window(collector, config, window).await,
        None => {
            error!(
                "Cannot build a collection window reaching {} days back, skipping run",
                config.days_back
            );
            RunStats::default()
        }
    }
}

/// Run every domain over an explicit window
///
/// Market-wide domains are collected once, then each ticker in turn with a
/// pause between tickers. Ends with the summary report.
pub async fn run_collection_window<P: MarketDataProvider>(
    collector: &DataCollector<P>,
    config: &Config,
    window: DateRange,
) -> RunStats {
    let started = Instant::now();
    let mut stats = RunStats::default();

    info!(
        "Starting complete data collection from {} to {}",
        window.start, window.end
    );

    let tickers: Vec<String> = match &config.tickers {
        Some(explicit) => explicit.clone(),
        None => collector
            .collect_all_tickers()
            .await
            .into_iter()
            .take(config.ticker_limit)
            .map(|t| t.ticker)
            .collect(),
    };
    stats.tickers_total = tickers.len();

    stats.holidays = collector.collect_market_holidays().await;
    stats.snapshots = collector.collect_snapshots(None).await;
    stats.news = collector.collect_news(None, config.news_limit).await;
    stats.dividends = collector.collect_dividends(None).await;
    stats.splits = collector.collect_splits(None).await;

    for (i, ticker) in tickers.iter().enumerate() {
        info!("Processing {} ({}/{})", ticker, i + 1, tickers.len());

        for (timespan, multiplier) in AGGREGATE_RESOLUTIONS {
            stats.aggregates += collector
                .collect_aggregates(ticker, window, timespan, multiplier)
                .await;
        }

        stats.indicators += collector.collect_technical_indicators(ticker, window).await;
        stats.news += collector
            .collect_news(Some(ticker), config.ticker_news_limit)
            .await;

        stats.tickers_processed += 1;
        tokio::time::sleep(config.ticker_delay()).await;
    }

    stats.elapsed = started.elapsed();
    stats.log_summary();

    match generate_summary_report(collector.database()).await {
        Ok(report) => report.log(),
        Err(e) => error!("Failed to generate summary report: {}", e),
    }

    stats
}
