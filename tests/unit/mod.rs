//! Unit tests against the storage layer and the summary report

mod database_operations;
mod summary_report;
