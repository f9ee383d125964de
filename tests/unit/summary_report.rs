//! Summary report over a populated store

use crate::common::{init_fresh_test_database, test_data};
use polygon_collector::models::Table;
use polygon_collector::report::generate_summary_report;
use pretty_assertions::assert_eq;
use test_log::test;

#[test(tokio::test)]
async fn test_empty_store_reports_zero_everywhere() {
    let (_temp_dir, database) = init_fresh_test_database().await;

    let report = generate_summary_report(&database).await.unwrap();

    assert_eq!(report.counts.len(), Table::ALL.len());
    assert!(report.counts.iter().all(|(_, count)| *count == 0));
    assert_eq!(report.aggregate_range, None);
    assert_eq!(report.lines().len(), 1 + Table::ALL.len());
}

#[test(tokio::test)]
async fn test_report_counts_and_date_range() {
    let (_temp_dir, database) = init_fresh_test_database().await;

    database
        .save_aggregates(&[
            test_data::create_test_bar("ABC", test_data::millis(2024, 1, 1), 10.0),
            test_data::create_test_bar("ABC", test_data::millis(2024, 1, 3), 11.0),
        ])
        .await
        .unwrap();
    database
        .save_news(&[test_data::create_test_article("n1", "Headline")])
        .await
        .unwrap();

    let report = generate_summary_report(&database).await.unwrap();

    assert_eq!(report.count(Table::Aggregates), 2);
    assert_eq!(report.count(Table::News), 1);
    assert_eq!(report.count(Table::Dividends), 0);

    let lines = report.lines();
    assert_eq!(lines[0], "=== Data Collection Summary ===");
    assert_eq!(lines[2], "aggregates: 2 records");
    assert_eq!(lines[5], "news: 1 records");
    assert_eq!(
        lines.last().unwrap(),
        "Date range: 2024-01-01 00:00:00 to 2024-01-03 00:00:00"
    );
}
