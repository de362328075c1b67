use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const HASH_MAPS_QUERY: &str = r"
    SELECT
        id,
        version,
        state
    FROM ndbinfo.hash_maps
";

#[derive(Clone)]
pub struct HashMapsScraper {
    version: Arc<MetricDesc>,
    state: Arc<MetricDesc>,
}

impl Default for HashMapsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl HashMapsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["id"];
        Self {
            version: static_desc(
                SUBSYSTEM,
                "hash_maps_version",
                "The version of the hash map by id.",
                &labels,
                ValueType::Gauge,
            ),
            state: static_desc(
                SUBSYSTEM,
                "hash_maps_state",
                "The state of the hash map by id. For human presentation of states, see documentation.",
                &labels,
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
            self.version.metric(row.uint_value(1)?, &labels)?,
            self.state.metric(row.uint_value(2)?, &labels)?,
        ])
    }
}

impl Scraper for HashMapsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.hash_maps"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.hash_maps"
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
            scrape_rows(ctx, db, sink, HASH_MAPS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
