use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const THREADBLOCKS_QUERY: &str = r"
    SELECT
        node_id,
        thr_no,
        block_name,
        block_instance
    FROM ndbinfo.threadblocks
";

/// Which kernel blocks run in which data node thread.
#[derive(Clone)]
pub struct ThreadBlocksScraper {
    blocks: Arc<MetricDesc>,
}

impl Default for ThreadBlocksScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadBlocksScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            blocks: static_desc(
                SUBSYSTEM,
                "threadblocks",
                "Returns 1 for every block assigned to a thread by node_id/thr_no/block_name/block_instance.",
                &["node_id", "thr_no", "block_name", "block_instance"],
                ValueType::Untyped,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a label column is missing.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..4)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![self.blocks.metric(1.0, &labels)?])
    }
}

impl Scraper for ThreadBlocksScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.threadblocks"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.threadblocks"
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
            scrape_rows(ctx, db, sink, THREADBLOCKS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
