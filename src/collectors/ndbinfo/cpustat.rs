use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const CPUSTAT_QUERY: &str = r"
    SELECT
        node_id,
        thr_no,
        OS_user,
        OS_system,
        OS_idle,
        thread_exec,
        thread_sleeping,
        thread_spinning,
        thread_send,
        thread_buffer_full,
        elapsed_time
    FROM ndbinfo.cpustat
";

/// Per-thread CPU usage over the last second.
#[derive(Clone)]
pub struct CpuStatScraper {
    mode: Arc<MetricDesc>,
    elapsed_time: Arc<MetricDesc>,
}

impl Default for CpuStatScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuStatScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            mode: static_desc(
                SUBSYSTEM,
                "cpustat",
                "The percentage of last second spend in each mode by node_id/thr_no/mode.",
                &["node_id", "thr_no", "mode"],
                ValueType::Gauge,
            ),
            elapsed_time: static_desc(
                SUBSYSTEM,
                "cpustat_elapsed_time",
                "The total time over which the CPU statistics were collected by node_id/thr_no.",
                &["node_id", "thr_no"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..2)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.mode.metric(row.uint_value(2)?, &with_label(&labels, "os_user"))?,
            self.mode.metric(row.uint_value(3)?, &with_label(&labels, "os_system"))?,
            self.mode.metric(row.uint_value(4)?, &with_label(&labels, "os_idle"))?,
            self.mode.metric(row.uint_value(5)?, &with_label(&labels, "thread_exec"))?,
            self.mode.metric(row.uint_value(6)?, &with_label(&labels, "thread_sleeping"))?,
            self.mode.metric(row.uint_value(7)?, &with_label(&labels, "thread_spinning"))?,
            self.mode.metric(row.uint_value(8)?, &with_label(&labels, "thread_send"))?,
            self.mode.metric(row.uint_value(9)?, &with_label(&labels, "thread_buffer_full"))?,
            self.elapsed_time.metric(row.uint_value(10)?, &labels)?,
        ])
    }
}

impl Scraper for CpuStatScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.cpustat"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.cpustat"
    }

    fn min_version(&self) -> EngineVersion {
        MIN_VERSION
    }

    fn scrape<'a>(
        &'a self,
        ctx: &'a ScrapeContext,
        db: &'a dyn Database,
        sink: &'a MetricSink,
    ) -> BoxFuture<'a, Result<(), ScrapeError>> {
        Box::pin(async move {
            scrape_rows(ctx, db, sink, CPUSTAT_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::collectors::database::Value;

    #[test]
    fn test_modes_then_elapsed_time() {
        let scraper = CpuStatScraper::new();
        let mut values = vec![Value::UInt(1), Value::UInt(0)];
        values.extend((1..=8).map(Value::UInt));
        values.push(Value::UInt(1_000_000));
        let row = Row::new((0..11).map(|i| format!("c{i}")).collect(), values);

        let metrics = scraper.row_metrics(&row).expect("valid row");

        assert_eq!(metrics.len(), 9);
        assert_eq!(metrics[0].label("mode"), Some("os_user"));
        assert_eq!(metrics[7].label("mode"), Some("thread_buffer_full"));
        assert_eq!(metrics[8].name(), "mysql_ndbinfo_cpustat_elapsed_time");
        assert!((metrics[8].value() - 1_000_000.0).abs() < f64::EPSILON);
    }
}
