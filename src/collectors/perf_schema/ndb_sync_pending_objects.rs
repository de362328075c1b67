use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const PENDING_OBJECTS_QUERY: &str = r"
    SELECT
        IFNULL(SCHEMA_NAME, '') AS SCHEMA_NAME,
        IFNULL(NAME, '') AS NAME,
        TYPE
    FROM performance_schema.ndb_sync_pending_objects
";

/// Objects the binlog thread still has to synchronize with the data dictionary.
#[derive(Clone)]
pub struct NdbSyncPendingObjectsScraper {
    pending: Arc<MetricDesc>,
}

impl Default for NdbSyncPendingObjectsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl NdbSyncPendingObjectsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: static_desc(
                SUBSYSTEM,
                "ndb_sync_pending_objects",
                "Returns 1 if query is successful, 0 if error encountered.",
                &["schema_name", "name", "type"],
                ValueType::Untyped,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if the row is shorter than expected.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let schema_name = row.text(0)?;
        let name = row.text(1)?;
        let kind = row.text(2)?;

        Ok(vec![self.pending.metric(
            1.0,
            &[schema_name.as_str(), name.as_str(), kind.as_str()],
        )?])
    }
}

impl Scraper for NdbSyncPendingObjectsScraper {
    fn name(&self) -> &'static str {
        "perf_schema.ndb_sync_pending_objects"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from performance_schema.ndb_sync_pending_objects"
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
            scrape_rows(ctx, db, sink, PENDING_OBJECTS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
