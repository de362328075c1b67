use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const TABLE_DISTRIBUTION_STATUS_QUERY: &str = r"
    SELECT
        node_id,
        table_id,
        tab_copy_status,
        tab_update_status,
        tab_lcp_status,
        tab_status,
        tab_storage,
        tab_partitions,
        tab_fragments,
        current_scan_count,
        scan_count_wait,
        is_reorg_ongoing
    FROM ndbinfo.table_distribution_status
";

#[derive(Clone)]
pub struct TableDistributionStatusScraper {
    current_scan_count: Arc<MetricDesc>,
    scan_count_wait: Arc<MetricDesc>,
    is_reorg_ongoing: Arc<MetricDesc>,
}

impl Default for TableDistributionStatusScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl TableDistributionStatusScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = [
            "node_id",
            "table_id",
            "tab_copy_status",
            "tab_update_status",
            "tab_lcp_status",
            "tab_status",
            "tab_storage",
            "tab_partitions",
            "tab_fragments",
        ];
        Self {
            current_scan_count: static_desc(
                SUBSYSTEM,
                "table_distribution_status_current_scan_count",
                "The current number of active scans by node_id/table_id/tab_copy_status/tab_update_status/tab_lcp_status/tab_status/tab_storage/tab_partitions/tab_fragments.",
                &labels,
                ValueType::Gauge,
            ),
            scan_count_wait: static_desc(
                SUBSYSTEM,
                "table_distribution_status_scan_count_wait",
                "The current number of scans waiting to be performed before ALTER TABLE can complete by node_id/table_id/tab_copy_status/tab_update_status/tab_lcp_status/tab_status/tab_storage/tab_partitions/tab_fragments.",
                &labels,
                ValueType::Gauge,
            ),
            is_reorg_ongoing: static_desc(
                SUBSYSTEM,
                "table_distribution_status_is_reorg_ongoing",
                "Whether the table is currently being reorganized (1 if true) by node_id/table_id/tab_copy_status/tab_update_status/tab_lcp_status/tab_status/tab_storage/tab_partitions/tab_fragments.",
                &labels,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..9)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.current_scan_count.metric(row.uint_value(9)?, &labels)?,
            self.scan_count_wait.metric(row.uint_value(10)?, &labels)?,
            self.is_reorg_ongoing.metric(row.uint_value(11)?, &labels)?,
        ])
    }
}

impl Scraper for TableDistributionStatusScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.table_distribution_status"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.table_distribution_status"
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
            scrape_rows(ctx, db, sink, TABLE_DISTRIBUTION_STATUS_QUERY, |row| self.row_metrics(row))
                .await?;
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
    fn test_each_value_column_feeds_its_own_family() {
        let scraper = TableDistributionStatusScraper::new();
        let mut values: Vec<Value> = (0..9).map(|i| Value::from(format!("l{i}"))).collect();
        values.extend([Value::UInt(3), Value::UInt(2), Value::UInt(1)]);
        let row = Row::new((0..12).map(|i| format!("c{i}")).collect(), values);

        let metrics = scraper.row_metrics(&row).expect("valid row");

        let by_name: Vec<_> = metrics.iter().map(|m| (m.name(), m.value())).collect();
        assert_eq!(
            by_name,
            vec![
                ("mysql_ndbinfo_table_distribution_status_current_scan_count", 3.0),
                ("mysql_ndbinfo_table_distribution_status_scan_count_wait", 2.0),
                ("mysql_ndbinfo_table_distribution_status_is_reorg_ongoing", 1.0),
            ]
        );
        assert_eq!(metrics[0].label("tab_fragments"), Some("l8"));
    }
}
