//! Upsert semantics of every table

use crate::common::{init_fresh_test_database, logging::log_test_step, test_data};
use polygon_collector::models::{IndicatorKind, IndicatorPoint, Table, Timespan};
use pretty_assertions::assert_eq;
use test_log::test;

#[test(tokio::test)]
async fn test_reopening_database_keeps_rows() {
    let (temp_dir, database) = init_fresh_test_database().await;
    database
        .save_aggregates(&[test_data::create_test_bar("ABC", test_data::millis(2024, 1, 2), 10.0)])
        .await
        .unwrap();

    log_test_step("Reopen the same file and run migrations again");
    let reopened = polygon_collector::DatabaseManager::new(database.path()).await.unwrap();

    assert_eq!(reopened.count_rows(Table::Aggregates).await.unwrap(), 1);
    drop(temp_dir);
}

#[test(tokio::test)]
async fn test_aggregates_replace_same_bar_and_keep_resolutions_apart() {
    let (_temp_dir, database) = init_fresh_test_database().await;
    let ts = test_data::millis(2024, 1, 2);

    let daily = test_data::create_test_bar("ABC", ts, 10.0);
    let mut hourly = daily.clone();
    hourly.timespan = Timespan::Hour;

    database.save_aggregates(&[daily.clone(), hourly]).await.unwrap();

    log_test_step("Write the daily bar again with a corrected close");
    let mut corrected = daily.clone();
    corrected.close = Some(10.75);
    database.save_aggregates(&[corrected.clone()]).await.unwrap();

    assert_eq!(database.count_rows(Table::Aggregates).await.unwrap(), 2);
    assert_eq!(
        database.get_aggregates("ABC", Timespan::Day, 1).await.unwrap(),
        vec![corrected]
    );
    assert_eq!(database.get_aggregates("ABC", Timespan::Hour, 1).await.unwrap().len(), 1);
    assert_eq!(
        database.aggregate_time_range().await.unwrap(),
        Some((ts, ts))
    );
}

#[test(tokio::test)]
async fn test_snapshots_keyed_by_ticker_and_timestamp() {
    let (_temp_dir, database) = init_fresh_test_database().await;
    let ts = test_data::millis(2024, 1, 2);

    database
        .save_snapshots(&[
            test_data::create_test_snapshot("ABC", ts, 10.0),
            test_data::create_test_snapshot("XYZ", ts, 20.0),
        ])
        .await
        .unwrap();
    database
        .save_snapshots(&[test_data::create_test_snapshot("ABC", ts, 10.5)])
        .await
        .unwrap();

    assert_eq!(database.count_rows(Table::Snapshots).await.unwrap(), 2);
}

#[test(tokio::test)]
async fn test_indicators_keyed_by_type() {
    let (_temp_dir, database) = init_fresh_test_database().await;
    let ts = test_data::millis(2024, 1, 2);

    let point = |indicator, value| IndicatorPoint {
        ticker: "ABC".to_string(),
        timestamp: ts,
        indicator,
        value: Some(value),
        signal: None,
        histogram: None,
    };

    database
        .save_indicators(&[point(IndicatorKind::Sma, 10.0), point(IndicatorKind::Rsi, 55.0)])
        .await
        .unwrap();
    database.save_indicators(&[point(IndicatorKind::Sma, 10.2)]).await.unwrap();

    let stored = database.get_indicators("ABC").await.unwrap();
    assert_eq!(stored, vec![point(IndicatorKind::Rsi, 55.0), point(IndicatorKind::Sma, 10.2)]);
}

#[test(tokio::test)]
async fn test_tickers_refresh_in_place() {
    let (_temp_dir, database) = init_fresh_test_database().await;

    database
        .save_tickers(&[
            test_data::create_test_ticker("ABC", "ABC Corp"),
            test_data::create_test_ticker("XYZ", "XYZ Inc"),
        ])
        .await
        .unwrap();

    let mut renamed = test_data::create_test_ticker("ABC", "ABC Holdings");
    renamed.active = Some(false);
    database.save_tickers(&[renamed]).await.unwrap();

    assert_eq!(database.count_rows(Table::Tickers).await.unwrap(), 2);
}

#[test(tokio::test)]
async fn test_news_first_write_wins() {
    let (_temp_dir, database) = init_fresh_test_database().await;

    let inserted = database
        .save_news(&[
            test_data::create_test_article("n1", "Original headline"),
            test_data::create_test_article("n2", "Second story"),
        ])
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    log_test_step("Resend n1 with a different title alongside a new article");
    let inserted = database
        .save_news(&[
            test_data::create_test_article("n1", "Rewritten headline"),
            test_data::create_test_article("n3", "Third story"),
        ])
        .await
        .unwrap();
    assert_eq!(inserted, 1);

    assert_eq!(database.count_rows(Table::News).await.unwrap(), 3);
    let stored = database.get_news_article("n1").await.unwrap().unwrap();
    assert_eq!(stored.title.as_deref(), Some("Original headline"));
    assert!(database.get_news_article("missing").await.unwrap().is_none());
}

#[test(tokio::test)]
async fn test_corporate_actions_keyed_by_date() {
    let (_temp_dir, database) = init_fresh_test_database().await;
    let ex_date = test_data::date(2024, 2, 9);

    database
        .save_dividends(&[
            test_data::create_test_dividend("ABC", ex_date, 0.24),
            test_data::create_test_dividend("ABC", test_data::date(2024, 5, 10), 0.25),
        ])
        .await
        .unwrap();
    database
        .save_dividends(&[test_data::create_test_dividend("ABC", ex_date, 0.26)])
        .await
        .unwrap();
    assert_eq!(database.count_rows(Table::Dividends).await.unwrap(), 2);

    let split_date = test_data::date(2024, 6, 10);
    database
        .save_splits(&[test_data::create_test_split("ABC", split_date, 1.0, 10.0)])
        .await
        .unwrap();
    database
        .save_splits(&[test_data::create_test_split("ABC", split_date, 1.0, 10.0)])
        .await
        .unwrap();
    assert_eq!(database.count_rows(Table::StockSplits).await.unwrap(), 1);
}

#[test(tokio::test)]
async fn test_holidays_one_row_per_date() {
    let (_temp_dir, database) = init_fresh_test_database().await;
    let date = test_data::date(2024, 12, 25);

    database
        .save_holidays(&[
            test_data::create_test_holiday(date, "NYSE"),
            test_data::create_test_holiday(date, "NASDAQ"),
        ])
        .await
        .unwrap();

    assert_eq!(database.count_rows(Table::MarketHolidays).await.unwrap(), 1);
}
