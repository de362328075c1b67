use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const SERVER_LOCKS_QUERY: &str = r"
    SELECT
        mysql_connection_id,
        node_id,
        tableid,
        fragmentid,
        rowid,
        mode,
        state,
        detail,
        op,
        duration_millis,
        lock_num,
        IFNULL(waiting_for, '') AS waiting_for
    FROM ndbinfo.server_locks
";

/// Locks held or awaited on behalf of this SQL node's connections.
#[derive(Clone)]
pub struct ServerLocksScraper {
    duration_millis: Arc<MetricDesc>,
}

impl Default for ServerLocksScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerLocksScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            duration_millis: static_desc(
                SUBSYSTEM,
                "server_locks_duration_millis",
                "The amount of time spent waiting or holding lock in milliseconds by mysql_connection_id/node_id/tableid/fragmentid/rowid/mode/state/detail/op/lock_num/waiting_for.",
                &[
                    "mysql_connection_id",
                    "node_id",
                    "tableid",
                    "fragmentid",
                    "rowid",
                    "mode",
                    "state",
                    "detail",
                    "op",
                    "lock_num",
                    "waiting_for",
                ],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![self.duration_millis.metric(row.uint_value(9)?, &labels)?])
    }
}

impl Scraper for ServerLocksScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.server_locks"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.server_locks"
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
            scrape_rows(ctx, db, sink, SERVER_LOCKS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
