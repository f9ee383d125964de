//! Read-only summary of what the store currently holds.

use std::fmt;
use tracing::info;

use crate::database::DatabaseManager;
use crate::error::Result;
use crate::models::Table;
use crate::utils::{format_millis, with_thousands};

#[derive(Debug, Clone, PartialEq)]
pub struct SummaryReport {
    pub counts: Vec<(Table, i64)>,
    /// Earliest and latest aggregate bar (Unix ms)
    pub aggregate_range: Option<(i64, i64)>,
}

impl SummaryReport {
    pub fn count(&self, table: Table) -> i64 {
        self.counts
            .iter()
            .find(|(t, _)| *t == table)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }

    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec!["=== Data Collection Summary ===".to_string()];

        for (table, count) in &self.counts {
            lines.push(format!("{}: {} records", table.label(), with_thousands(*count)));
        }

        if let Some((first, last)) = self.aggregate_range {
            lines.push(format!(
                "Date range: {} to {}",
                format_millis(first),
                format_millis(last)
            ));
        }

        lines
    }

    /// Emit the summary through the log
    pub fn log(&self) {
        for line in self.lines() {
            info!("{}", line);
        }
    }
}

impl fmt::Display for SummaryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

/// Count every table and read the aggregate time span
pub async fn generate_summary_report(database: &DatabaseManager) -> Result<SummaryReport> {
    Ok(SummaryReport {
        counts: database.table_counts().await?,
        aggregate_range: database.aggregate_time_range().await?,
    })
}
