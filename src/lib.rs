//! Polygon.io market-data collector.
//!
//! Fetches tickers, aggregates, snapshots, technical indicators, news,
//! dividends, splits and market holidays, and upserts them into a local
//! SQLite file with one table per data type.

pub mod api;
pub mod data_collector;
pub mod database;
pub mod driver;
pub mod error;
pub mod models;
pub mod report;
pub mod utils;

pub use data_collector::DataCollector;
pub use database::DatabaseManager;
pub use error::{CollectorError, Result};
pub use models::Config;
