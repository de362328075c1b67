use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const MEMORY_USAGE_QUERY: &str = r"
    SELECT
        node_id,
        memory_type,
        used,
        used_pages,
        total,
        total_pages
    FROM ndbinfo.memoryusage
";

/// Data and index memory usage per data node.
#[derive(Clone)]
pub struct MemoryUsageScraper {
    used_bytes: Arc<MetricDesc>,
    used_pages: Arc<MetricDesc>,
    available_bytes: Arc<MetricDesc>,
    available_pages: Arc<MetricDesc>,
}

impl Default for MemoryUsageScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUsageScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["node_id", "memory_type"];
        Self {
            used_bytes: static_desc(
                SUBSYSTEM,
                "memoryusage_used_bytes",
                "The amount of bytes currently used for data memory or index memory by node_id/memory_type.",
                &labels,
                ValueType::Gauge,
            ),
            used_pages: static_desc(
                SUBSYSTEM,
                "memoryusage_used_pages",
                "The amount of pages currently used for data memory or index memory by node_id/memory_type.",
                &labels,
                ValueType::Gauge,
            ),
            available_bytes: static_desc(
                SUBSYSTEM,
                "memoryusage_available_bytes",
                "Total number of bytes of data memory or index memory available by node_id/memory_type.",
                &labels,
                ValueType::Gauge,
            ),
            available_pages: static_desc(
                SUBSYSTEM,
                "memoryusage_available_pages",
                "The amount of memory pages available for data memory or index memory by node_id/memory_type.",
                &labels,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a numeric column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;
        let memory_type = row.text(1)?;
        let labels = [node_id.as_str(), memory_type.as_str()];

        Ok(vec![
            self.used_bytes.metric(row.uint_value(2)?, &labels)?,
            self.used_pages.metric(row.uint_value(3)?, &labels)?,
            self.available_bytes.metric(row.uint_value(4)?, &labels)?,
            self.available_pages.metric(row.uint_value(5)?, &labels)?,
        ])
    }
}

impl Scraper for MemoryUsageScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.memoryusage"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.memoryusage"
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
            scrape_rows(ctx, db, sink, MEMORY_USAGE_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
