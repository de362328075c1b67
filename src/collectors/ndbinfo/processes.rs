use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const PROCESSES_QUERY: &str = r"
    SELECT
        node_id,
        node_type,
        node_version,
        process_id,
        IFNULL(angel_process_id, 0) AS angel_process_id,
        process_name,
        service_URI
    FROM ndbinfo.processes
";

/// Angel process id per cluster process; `0` when the node has none.
#[derive(Clone)]
pub struct ProcessesScraper {
    angel_process_id: Arc<MetricDesc>,
}

impl Default for ProcessesScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessesScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            angel_process_id: static_desc(
                SUBSYSTEM,
                "processes_angel_process_id",
                "Process ID of this node's angel process by node_id/node_type/node_version/process_id/process_name/service_URI. Returns 0 if no angel process is set.",
                &[
                    "node_id",
                    "node_type",
                    "node_version",
                    "process_id",
                    "process_name",
                    "service_URI",
                ],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if `angel_process_id` is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;
        let node_type = row.text(1)?;
        let node_version = row.text(2)?;
        let process_id = row.text(3)?;
        let angel_process_id = row.uint_value(4)?;
        let process_name = row.text(5)?;
        let service_uri = row.text(6)?;

        Ok(vec![self.angel_process_id.metric(
            angel_process_id,
            &[
                node_id.as_str(),
                node_type.as_str(),
                node_version.as_str(),
                process_id.as_str(),
                process_name.as_str(),
                service_uri.as_str(),
            ],
        )?])
    }
}

impl Scraper for ProcessesScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.processes"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.processes"
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
            scrape_rows(ctx, db, sink, PROCESSES_QUERY, |row| self.row_metrics(row)).await?;
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
    fn test_missing_angel_reports_zero() {
        let scraper = ProcessesScraper::new();
        let columns = (0..7).map(|i| format!("c{i}")).collect();
        let row = Row::new(
            columns,
            vec![
                Value::UInt(49),
                Value::from("API"),
                Value::from("mysql-8.0.36 ndb-8.0.36"),
                Value::UInt(4242),
                Value::Null,
                Value::from("mysqld"),
                Value::Null,
            ],
        );

        let metrics = scraper.row_metrics(&row).expect("nulls coalesce");

        assert_eq!(metrics.len(), 1);
        assert!(metrics[0].value().abs() < f64::EPSILON);
        assert_eq!(metrics[0].label("service_URI"), Some(""));
        assert_eq!(metrics[0].label("process_id"), Some("4242"));
    }
}
