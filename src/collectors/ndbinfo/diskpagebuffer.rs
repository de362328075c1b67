use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const DISKPAGEBUFFER_QUERY: &str = r"
    SELECT
        node_id,
        block_instance,
        pages_written,
        pages_written_lcp,
        pages_read,
        log_waits,
        page_requests_direct_return,
        page_requests_wait_queue,
        page_requests_wait_io
    FROM ndbinfo.diskpagebuffer
";

#[derive(Clone)]
pub struct DiskPageBufferScraper {
    pages_written: Arc<MetricDesc>,
    pages_written_lcp: Arc<MetricDesc>,
    pages_read: Arc<MetricDesc>,
    log_waits: Arc<MetricDesc>,
    direct_return: Arc<MetricDesc>,
    wait_queue: Arc<MetricDesc>,
    wait_io: Arc<MetricDesc>,
}

impl Default for DiskPageBufferScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskPageBufferScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["node_id", "block_instance"];
        Self {
            pages_written: static_desc(
                SUBSYSTEM,
                "diskpagebuffer_pages_written",
                "The amount of pages written to disk by node_id/block_instance.",
                &labels,
                ValueType::Gauge,
            ),
            pages_written_lcp: static_desc(
                SUBSYSTEM,
                "diskpagebuffer_pages_written_lcp",
                "The amount of pages written by local checkpoints by node_id/block_instance.",
                &labels,
                ValueType::Gauge,
            ),
            pages_read: static_desc(
                SUBSYSTEM,
                "diskpagebuffer_pages_read",
                "The amount of pages read from disk by node_id/block_instance.",
                &labels,
                ValueType::Gauge,
            ),
            log_waits: static_desc(
                SUBSYSTEM,
                "diskpagebuffer_log_waits",
                "The amount of page writes waiting for log to be written to disk by node_id/block_instance.",
                &labels,
                ValueType::Gauge,
            ),
            direct_return: static_desc(
                SUBSYSTEM,
                "diskpagebuffer_page_requests_direct_return",
                "The amount of requests for pages that were available in buffer by node_id/block_instance.",
                &labels,
                ValueType::Gauge,
            ),
            wait_queue: static_desc(
                SUBSYSTEM,
                "diskpagebuffer_page_requests_wait_queue",
                "The amount of requests that had to wait for pages to become available in buffer by node_id/block_instance.",
                &labels,
                ValueType::Gauge,
            ),
            wait_io: static_desc(
                SUBSYSTEM,
                "diskpagebuffer_page_requests_wait_io",
                "The amount of requests that had to be read from pages on disk (pages were unavailable in buffer) by node_id/block_instance.",
                &labels,
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
            self.pages_written.metric(row.uint_value(2)?, &labels)?,
            self.pages_written_lcp.metric(row.uint_value(3)?, &labels)?,
            self.pages_read.metric(row.uint_value(4)?, &labels)?,
            self.log_waits.metric(row.uint_value(5)?, &labels)?,
            self.direct_return.metric(row.uint_value(6)?, &labels)?,
            self.wait_queue.metric(row.uint_value(7)?, &labels)?,
            self.wait_io.metric(row.uint_value(8)?, &labels)?,
        ])
    }
}

impl Scraper for DiskPageBufferScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.diskpagebuffer"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.diskpagebuffer"
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
            scrape_rows(ctx, db, sink, DISKPAGEBUFFER_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
