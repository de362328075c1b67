use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const CLUSTER_LOCKS_QUERY: &str = r"
    SELECT
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
    FROM ndbinfo.cluster_locks
";

/// Row locks currently held or waited for, labelled by lock identity.
#[derive(Clone)]
pub struct ClusterLocksScraper {
    duration_millis: Arc<MetricDesc>,
}

impl Default for ClusterLocksScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterLocksScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            duration_millis: static_desc(
                SUBSYSTEM,
                "cluster_locks_duration_millis",
                "The amount of time spent waiting or holding lock in milliseconds by node_id/tableid/fragmentid/rowid/mode/state/detail/op/lock_num/waiting_for.",
                &[
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
    /// Returns a decode error if `duration_millis` is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let duration = row.uint_value(8)?;

        let mut labels = Vec::with_capacity(10);
        for idx in (0..8).chain(9..11) {
            labels.push(row.text(idx)?);
        }
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![self.duration_millis.metric(duration, &labels)?])
    }
}

impl Scraper for ClusterLocksScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.cluster_locks"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.cluster_locks"
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
            scrape_rows(ctx, db, sink, CLUSTER_LOCKS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::collectors::database::Value;

    #[test]
    fn test_labels_skip_duration_column() {
        let scraper = ClusterLocksScraper::new();
        let columns = (0..11).map(|i| format!("c{i}")).collect();
        let row = Row::new(
            columns,
            vec![
                Value::UInt(1),
                Value::UInt(12),
                Value::UInt(0),
                Value::UInt(77),
                Value::from("X"),
                Value::from("W"),
                Value::from("*"),
                Value::from("UPDATE"),
                Value::UInt(1500),
                Value::UInt(9),
                Value::from(""),
            ],
        );

        let metrics = scraper.row_metrics(&row).expect("valid row");

        assert!((metrics[0].value() - 1500.0).abs() < f64::EPSILON);
        assert_eq!(metrics[0].label("op"), Some("UPDATE"));
        assert_eq!(metrics[0].label("lock_num"), Some("9"));
        assert_eq!(metrics[0].label("waiting_for"), Some(""));
    }
}
