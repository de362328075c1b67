use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const NODES_QUERY: &str = r"
    SELECT
        node_id,
        uptime,
        status,
        start_phase,
        config_generation
    FROM ndbinfo.nodes
";

/// Per data node uptime and configuration generation.
#[derive(Clone)]
pub struct NodesScraper {
    uptime: Arc<MetricDesc>,
    config_generation: Arc<MetricDesc>,
}

impl Default for NodesScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl NodesScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["node_id", "status", "start_phase"];
        Self {
            uptime: static_desc(
                SUBSYSTEM,
                "nodes_uptime_total",
                "The time since the node was last started, in seconds by node_id/status/start_phase.",
                &labels,
                ValueType::Gauge,
            ),
            config_generation: static_desc(
                SUBSYSTEM,
                "nodes_config_generation",
                "The version of the cluster configuration file in use by node_id/status/start_phase.",
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
        let uptime = row.uint_value(1)?;
        let status = row.text(2)?;
        let start_phase = row.text(3)?;
        let config_generation = row.uint_value(4)?;

        let labels = [node_id.as_str(), status.as_str(), start_phase.as_str()];

        Ok(vec![
            self.uptime.metric(uptime, &labels)?,
            self.config_generation.metric(config_generation, &labels)?,
        ])
    }
}

impl Scraper for NodesScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.nodes"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.nodes"
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
            scrape_rows(ctx, db, sink, NODES_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::collectors::database::Value;

    fn row(values: Vec<Value>) -> Row {
        let columns = ["node_id", "uptime", "status", "start_phase", "config_generation"]
            .iter()
            .map(ToString::to_string)
            .collect();
        Row::new(columns, values)
    }

    #[test]
    fn test_row_metrics() {
        let scraper = NodesScraper::new();
        let metrics = scraper
            .row_metrics(&row(vec![
                Value::UInt(1),
                Value::UInt(3600),
                Value::from("STARTED"),
                Value::UInt(0),
                Value::UInt(2),
            ]))
            .expect("valid row");

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].name(), "mysql_ndbinfo_nodes_uptime_total");
        assert!((metrics[0].value() - 3600.0).abs() < f64::EPSILON);
        assert_eq!(metrics[0].label("status"), Some("STARTED"));
        assert_eq!(metrics[1].label("start_phase"), Some("0"));
    }

    #[test]
    fn test_null_status_becomes_empty_label() {
        let scraper = NodesScraper::new();
        let metrics = scraper
            .row_metrics(&row(vec![
                Value::UInt(2),
                Value::Null,
                Value::Null,
                Value::UInt(0),
                Value::Null,
            ]))
            .expect("nulls coalesce");

        assert_eq!(metrics[0].label("status"), Some(""));
        assert!(metrics[0].value().abs() < f64::EPSILON);
    }

    #[test]
    fn test_bad_uptime_is_decode_error() {
        let scraper = NodesScraper::new();
        let result = scraper.row_metrics(&row(vec![
            Value::UInt(1),
            Value::from("soon"),
            Value::from("STARTED"),
            Value::UInt(0),
            Value::UInt(2),
        ]));

        assert!(matches!(result, Err(ScrapeError::Decode { .. })));
    }
}
