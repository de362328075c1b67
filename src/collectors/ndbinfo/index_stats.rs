use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const INDEX_STATS_QUERY: &str = r"
    SELECT
        index_id,
        index_version,
        sample_version,
        load_time,
        sample_count
    FROM ndbinfo.index_stats
";

#[derive(Clone)]
pub struct IndexStatsScraper {
    version: Arc<MetricDesc>,
    load_time: Arc<MetricDesc>,
    sample_count: Arc<MetricDesc>,
}

impl Default for IndexStatsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexStatsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: static_desc(
                SUBSYSTEM,
                "index_stats_version",
                "The current version of index by index_id/type.",
                &["index_id", "type"],
                ValueType::Gauge,
            ),
            load_time: static_desc(
                SUBSYSTEM,
                "index_stats_load_time",
                "The UNIX timestamp of last loaded statistics by index_id.",
                &["index_id"],
                ValueType::Gauge,
            ),
            sample_count: static_desc(
                SUBSYSTEM,
                "index_stats_sample_count",
                "The amount of samples collected for the index statistics by index_id.",
                &["index_id"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..1)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.version.metric(row.uint_value(1)?, &with_label(&labels, "index"))?,
            self.version.metric(row.uint_value(2)?, &with_label(&labels, "sample"))?,
            self.load_time.metric(row.uint_value(3)?, &labels)?,
            self.sample_count.metric(row.uint_value(4)?, &labels)?,
        ])
    }
}

impl Scraper for IndexStatsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.index_stats"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.index_stats"
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
            scrape_rows(ctx, db, sink, INDEX_STATS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
