use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const DISKSTAT_QUERY: &str = r"
    SELECT
        node_id,
        block_instance,
        pages_made_dirty,
        reads_issued,
        reads_completed,
        writes_issued,
        writes_completed,
        log_writes_issued,
        log_writes_completed,
        get_page_calls_issued,
        get_page_reqs_issued,
        get_page_reqs_completed
    FROM ndbinfo.diskstat
";

/// Disk activity of each PGMAN instance during the last second.
#[derive(Clone)]
pub struct DiskStatScraper {
    pages_made_dirty: Arc<MetricDesc>,
    reads: Arc<MetricDesc>,
    writes: Arc<MetricDesc>,
    log_writes: Arc<MetricDesc>,
    get_page_calls: Arc<MetricDesc>,
    get_page_reqs: Arc<MetricDesc>,
}

impl Default for DiskStatScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskStatScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages_made_dirty: static_desc(
                SUBSYSTEM,
                "diskstat_pages_made_dirty",
                "The amount of pages made dirty during the past second by node_id/block_instance.",
                &["node_id", "block_instance"],
                ValueType::Gauge,
            ),
            reads: static_desc(
                SUBSYSTEM,
                "diskstat_reads",
                "The amount of reads issued/completed during the past second by node_id/block_instance/action.",
                &["node_id", "block_instance", "action"],
                ValueType::Gauge,
            ),
            writes: static_desc(
                SUBSYSTEM,
                "diskstat_writes",
                "The amount of writes issued/completed during the past second by node_id/block_instance/action.",
                &["node_id", "block_instance", "action"],
                ValueType::Gauge,
            ),
            log_writes: static_desc(
                SUBSYSTEM,
                "diskstat_log_writes",
                "The amount of log writes issued/completed during the past second by node_id/block_instance/action.",
                &["node_id", "block_instance", "action"],
                ValueType::Gauge,
            ),
            get_page_calls: static_desc(
                SUBSYSTEM,
                "diskstat_get_page_calls",
                "The amount of get_page() call actions during the past second by node_id/block_instance/action.",
                &["node_id", "block_instance", "action"],
                ValueType::Gauge,
            ),
            get_page_reqs: static_desc(
                SUBSYSTEM,
                "diskstat_get_page_reqs",
                "The amount of get_page() requests issued/completed during the past second by node_id/block_instance/action.",
                &["node_id", "block_instance", "action"],
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
            self.pages_made_dirty.metric(row.uint_value(2)?, &labels)?,
            self.reads.metric(row.uint_value(3)?, &with_label(&labels, "issued"))?,
            self.reads.metric(row.uint_value(4)?, &with_label(&labels, "completed"))?,
            self.writes.metric(row.uint_value(5)?, &with_label(&labels, "issued"))?,
            self.writes.metric(row.uint_value(6)?, &with_label(&labels, "completed"))?,
            self.log_writes.metric(row.uint_value(7)?, &with_label(&labels, "issued"))?,
            self.log_writes.metric(row.uint_value(8)?, &with_label(&labels, "completed"))?,
            self.get_page_calls.metric(row.uint_value(9)?, &with_label(&labels, "issued"))?,
            self.get_page_reqs.metric(row.uint_value(10)?, &with_label(&labels, "issued"))?,
            self.get_page_reqs.metric(row.uint_value(11)?, &with_label(&labels, "completed"))?,
        ])
    }
}

impl Scraper for DiskStatScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.diskstat"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.diskstat"
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
            scrape_rows(ctx, db, sink, DISKSTAT_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
