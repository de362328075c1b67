use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const THREADS_QUERY: &str = r"
    SELECT
        node_id,
        thr_no,
        thread_name,
        thread_description
    FROM ndbinfo.threads
";

#[derive(Clone)]
pub struct ThreadsScraper {
    threads: Arc<MetricDesc>,
}

impl Default for ThreadsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            threads: static_desc(
                SUBSYSTEM,
                "threads",
                "Returns 1 for every data node thread by node_id/thr_no/thread_name/thread_description.",
                &["node_id", "thr_no", "thread_name", "thread_description"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a label column is missing.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..4)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![self.threads.metric(1.0, &labels)?])
    }
}

impl Scraper for ThreadsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.threads"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.threads"
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
            scrape_rows(ctx, db, sink, THREADS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
