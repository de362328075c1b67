use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const LOG_SPACES_QUERY: &str = r"
    SELECT
        node_id,
        log_type,
        log_id,
        log_part,
        total,
        used
    FROM ndbinfo.logspaces
";

/// Redo and undo log space usage.
#[derive(Clone)]
pub struct LogSpacesScraper {
    available: Arc<MetricDesc>,
    used: Arc<MetricDesc>,
}

impl Default for LogSpacesScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSpacesScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["node_id", "log_type", "log_id", "log_part"];
        Self {
            available: static_desc(
                SUBSYSTEM,
                "logspaces_bytes_available",
                "The amount of total space available for this log in bytes by node_id/log_type/log_id/log_part.",
                &labels,
                ValueType::Gauge,
            ),
            used: static_desc(
                SUBSYSTEM,
                "logspaces_bytes_used",
                "The amount of space used by this log in bytes by node_id/log_type/log_id/log_part.",
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
        let log_type = row.text(1)?;
        let log_id = row.text(2)?;
        let log_part = row.text(3)?;
        let labels = [
            node_id.as_str(),
            log_type.as_str(),
            log_id.as_str(),
            log_part.as_str(),
        ];

        Ok(vec![
            self.available.metric(row.uint_value(4)?, &labels)?,
            self.used.metric(row.uint_value(5)?, &labels)?,
        ])
    }
}

impl Scraper for LogSpacesScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.logspaces"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.logspaces"
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
            scrape_rows(ctx, db, sink, LOG_SPACES_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
