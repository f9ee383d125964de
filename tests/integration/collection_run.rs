//! Collector and driver runs end to end against the mocked API

use chrono::NaiveDate;
use polygon_collector::driver::run_collection_window;
use polygon_collector::models::{DateRange, IndicatorKind, Table, Timespan};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_log::test;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::logging::log_test_step;
use crate::common::polygon_mock::{
    collector_for, indicator_values, mount_json, mount_status, news_page, test_config,
    three_daily_bars,
};
use crate::common::{init_fresh_test_database, test_data};

const DAILY_ABC: &str = "/v2/aggs/ticker/ABC/range/1/day/2024-01-01/2024-01-03";

fn window() -> DateRange {
    DateRange::new(
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
    )
}

#[test(tokio::test)]
async fn test_three_daily_bars_land_in_aggregates() {
    let server = MockServer::start().await;
    mount_json(&server, DAILY_ABC, three_daily_bars()).await;

    let (_temp_dir, database) = init_fresh_test_database().await;
    let collector = collector_for(&test_config(&server), database.clone());

    let saved = collector
        .collect_aggregates("ABC", window(), Timespan::Day, 1)
        .await;
    assert_eq!(saved, 3);

    let bars = database.get_aggregates("ABC", Timespan::Day, 1).await.unwrap();
    let keys: Vec<_> = bars
        .iter()
        .map(|b| (b.ticker.as_str(), b.timestamp, b.timespan.as_str(), b.multiplier))
        .collect();
    assert_eq!(
        keys,
        vec![
            ("ABC", test_data::millis(2024, 1, 1), "day", 1),
            ("ABC", test_data::millis(2024, 1, 2), "day", 1),
            ("ABC", test_data::millis(2024, 1, 3), "day", 1),
        ]
    );

    let first = &bars[0];
    assert_eq!(
        (first.open, first.high, first.low, first.close, first.volume),
        (Some(10.0), Some(11.0), Some(9.5), Some(10.5), Some(1000))
    );
    assert_eq!(first.vwap, Some(10.2));
    assert_eq!(first.transactions, Some(50));
    assert_eq!(bars[2].volume, Some(1500));

    log_test_step("Collect the same window again");
    collector
        .collect_aggregates("ABC", window(), Timespan::Day, 1)
        .await;
    assert_eq!(database.count_rows(Table::Aggregates).await.unwrap(), 3);
}

#[test(tokio::test)]
async fn test_failed_fetch_writes_nothing() {
    let server = MockServer::start().await;
    mount_status(&server, DAILY_ABC, 500).await;

    let (_temp_dir, database) = init_fresh_test_database().await;
    let collector = collector_for(&test_config(&server), database.clone());

    let saved = collector
        .collect_aggregates("ABC", window(), Timespan::Day, 1)
        .await;

    assert_eq!(saved, 0);
    assert_eq!(database.count_rows(Table::Aggregates).await.unwrap(), 0);
}

/// Market-wide endpoints with one row each, news shared with the ticker feed
async fn mount_market(server: &MockServer) {
    mount_json(
        server,
        "/v1/marketstatus/upcoming",
        json!([
            { "date": "2024-01-15", "exchange": "NYSE", "name": "Martin Luther King, Jr. Day", "status": "closed" },
            { "date": "2024-01-15", "exchange": "NASDAQ", "name": "Martin Luther King, Jr. Day", "status": "closed" }
        ]),
    )
    .await;
    mount_json(
        server,
        "/v2/snapshot/locale/us/markets/stocks/tickers",
        json!({
            "status": "OK",
            "tickers": [{
                "ticker": "ABC",
                "todaysChange": 0.5,
                "todaysChangePerc": 4.5,
                "updated": 1704240000000000000i64,
                "day": { "o": 11.0, "h": 11.8, "l": 10.9, "c": 11.5, "v": 1500.0 },
                "prevDay": { "c": 11.0 }
            }]
        }),
    )
    .await;
    mount_json(server, "/v2/reference/news", news_page(&["n1", "n2"])).await;
    mount_json(
        server,
        "/v3/reference/dividends",
        json!({
            "status": "OK",
            "results": [{
                "ticker": "ABC",
                "ex_dividend_date": "2024-02-09",
                "pay_date": "2024-02-15",
                "cash_amount": 0.24,
                "dividend_type": "CD",
                "currency": "USD"
            }]
        }),
    )
    .await;
    mount_json(
        server,
        "/v3/reference/splits",
        json!({
            "status": "OK",
            "results": [{ "ticker": "ABC", "execution_date": "2024-06-10", "split_from": 1.0, "split_to": 10.0 }]
        }),
    )
    .await;
}

#[test(tokio::test)]
async fn test_full_run_survives_a_failing_resolution() {
    let server = MockServer::start().await;
    mount_market(&server).await;

    mount_json(&server, DAILY_ABC, three_daily_bars()).await;
    mount_status(&server, "/v2/aggs/ticker/ABC/range/1/hour/2024-01-01/2024-01-03", 500).await;
    mount_json(
        &server,
        "/v2/aggs/ticker/ABC/range/5/minute/2024-01-01/2024-01-03",
        json!({
            "status": "OK",
            "results": [
                { "o": 10.0, "h": 10.1, "l": 9.9, "c": 10.05, "v": 100.0, "t": 1704205800000i64 },
                { "o": 10.05, "h": 10.2, "l": 10.0, "c": 10.15, "v": 80.0, "t": 1704206100000i64 }
            ]
        }),
    )
    .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/v1/indicators/(sma|ema|rsi)/ABC$"))
        .respond_with(ResponseTemplate::new(200).set_body_json(indicator_values(false)))
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/indicators/macd/ABC"))
        .respond_with(ResponseTemplate::new(200).set_body_json(indicator_values(true)))
        .expect(1)
        .mount(&server)
        .await;

    let (_temp_dir, database) = init_fresh_test_database().await;
    let mut config = test_config(&server);
    config.tickers = Some(vec!["ABC".to_string()]);
    let collector = collector_for(&config, database.clone());

    let stats = run_collection_window(&collector, &config, window()).await;

    assert_eq!(stats.tickers_processed, 1);
    assert_eq!(stats.aggregates, 5);
    assert_eq!(stats.indicators, 8);
    assert_eq!(stats.holidays, 2);
    assert_eq!(stats.snapshots, 1);
    assert_eq!(stats.dividends, 1);
    assert_eq!(stats.splits, 1);
    assert_eq!(stats.news, 2);

    let counts = database.table_counts().await.unwrap();
    assert_eq!(
        counts,
        vec![
            (Table::Tickers, 0),
            (Table::Aggregates, 5),
            (Table::Snapshots, 1),
            (Table::TechnicalIndicators, 8),
            (Table::News, 2),
            (Table::Dividends, 1),
            (Table::StockSplits, 1),
            (Table::MarketHolidays, 1),
        ]
    );

    assert!(database.get_aggregates("ABC", Timespan::Hour, 1).await.unwrap().is_empty());
    assert_eq!(database.get_aggregates("ABC", Timespan::Minute, 5).await.unwrap().len(), 2);

    let macd: Vec<_> = database
        .get_indicators("ABC")
        .await
        .unwrap()
        .into_iter()
        .filter(|p| p.indicator == IndicatorKind::Macd)
        .collect();
    assert_eq!(macd.len(), 2);
    assert_eq!(macd[0].signal, Some(0.25));
    assert_eq!(macd[0].histogram, Some(0.1));

    let article = database.get_news_article("n1").await.unwrap().unwrap();
    assert_eq!(article.ticker.as_deref(), Some("ABC"));
    assert_eq!(article.keywords, r#"["earnings","guidance"]"#);
}
