use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const BACKUP_ID_QUERY: &str = r"
    SELECT
        id
    FROM ndbinfo.backup_id
";

#[derive(Clone)]
pub struct BackupIdScraper {
    backup_id: Arc<MetricDesc>,
}

impl Default for BackupIdScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl BackupIdScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            backup_id: static_desc(
                SUBSYSTEM,
                "backup_id",
                "The ID of the backup started most recently for this cluster.",
                &[],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if `id` is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        Ok(vec![self.backup_id.metric(row.uint_value(0)?, &[])?])
    }
}

impl Scraper for BackupIdScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.backup_id"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.backup_id"
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
            scrape_rows(ctx, db, sink, BACKUP_ID_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
