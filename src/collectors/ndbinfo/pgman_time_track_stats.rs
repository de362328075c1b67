use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const PGMAN_TIME_TRACK_STATS_QUERY: &str = r"
    SELECT
        node_id,
        block_number,
        block_instance,
        upper_bound,
        page_reads,
        page_writes,
        log_waits,
        get_page
    FROM ndbinfo.pgman_time_track_stats
";

#[derive(Clone)]
pub struct PgmanTimeTrackStatsScraper {
    count: Arc<MetricDesc>,
}

impl Default for PgmanTimeTrackStatsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl PgmanTimeTrackStatsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: static_desc(
                SUBSYSTEM,
                "pgman_time_track_stats_count",
                "Based on duration of action latency by node_id/block_number/block_instance/upper_bound/action.",
                &["node_id", "block_number", "block_instance", "upper_bound", "action"],
                ValueType::Counter,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..4)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.count.metric(row.uint_value(4)?, &with_label(&labels, "page_reads"))?,
            self.count.metric(row.uint_value(5)?, &with_label(&labels, "page_writes"))?,
            self.count.metric(row.uint_value(6)?, &with_label(&labels, "log_waits"))?,
            self.count.metric(row.uint_value(7)?, &with_label(&labels, "get_page"))?,
        ])
    }
}

impl Scraper for PgmanTimeTrackStatsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.pgman_time_track_stats"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.pgman_time_track_stats"
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
            scrape_rows(ctx, db, sink, PGMAN_TIME_TRACK_STATS_QUERY, |row| self.row_metrics(row))
                .await?;
            Ok(())
        })
    }
}
