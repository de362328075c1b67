use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const LABELS: [&str; 10] = [
    "node_id",
    "block_instance",
    "operation_type",
    "state",
    "tableid",
    "fragmentid",
    "client_node_id",
    "tc_node_id",
    "tc_block_no",
    "tc_block_instance",
];

const CLUSTER_OPERATIONS_QUERY: &str = r"
    SELECT
        node_id,
        block_instance,
        operation_type,
        IFNULL(state, '') AS state,
        tableid,
        fragmentid,
        client_node_id,
        tc_node_id,
        tc_block_no,
        tc_block_instance,
        COUNT(*) AS current_ops
    FROM ndbinfo.cluster_operations
    GROUP BY node_id, block_instance, operation_type, state, tableid, fragmentid,
        client_node_id, tc_node_id, tc_block_no, tc_block_instance
";

const SERVER_OPERATIONS_QUERY: &str = r"
    SELECT
        node_id,
        block_instance,
        operation_type,
        IFNULL(state, '') AS state,
        tableid,
        fragmentid,
        client_node_id,
        tc_node_id,
        tc_block_no,
        tc_block_instance,
        COUNT(*) AS current_ops
    FROM ndbinfo.server_operations
    GROUP BY node_id, block_instance, operation_type, state, tableid, fragmentid,
        client_node_id, tc_node_id, tc_block_no, tc_block_instance
";

/// Both operation views group to the same ten labels plus a count.
fn current_ops(desc: &Arc<MetricDesc>, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
    let labels = row.texts(0..10)?;
    let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

    Ok(vec![desc.metric(row.uint_value(10)?, &labels)?])
}

/// Operation records on all data nodes, counted per operation identity.
#[derive(Clone)]
pub struct ClusterOperationsScraper {
    current: Arc<MetricDesc>,
}

impl Default for ClusterOperationsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterOperationsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: static_desc(
                SUBSYSTEM,
                "cluster_operations_current",
                "The amount of current cluster operations by node_id/block_instance/operation_type/state/tableid/fragmentid/client_node_id/tc_node_id/tc_block_no/tc_block_instance.",
                &LABELS,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if `current_ops` is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        current_ops(&self.current, row)
    }
}

impl Scraper for ClusterOperationsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.cluster_operations"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.cluster_operations"
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
            scrape_rows(ctx, db, sink, CLUSTER_OPERATIONS_QUERY, |row| self.row_metrics(row))
                .await?;
            Ok(())
        })
    }
}

/// Operation records started by this SQL node.
#[derive(Clone)]
pub struct ServerOperationsScraper {
    current: Arc<MetricDesc>,
}

impl Default for ServerOperationsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerOperationsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            current: static_desc(
                SUBSYSTEM,
                "server_operations_current",
                "The amount of current server operations by node_id/block_instance/operation_type/state/tableid/fragmentid/client_node_id/tc_node_id/tc_block_no/tc_block_instance.",
                &LABELS,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if `current_ops` is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        current_ops(&self.current, row)
    }
}

impl Scraper for ServerOperationsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.server_operations"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.server_operations"
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
            scrape_rows(ctx, db, sink, SERVER_OPERATIONS_QUERY, |row| self.row_metrics(row))
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::collectors::database::Value;

    fn operation_row(state: Value, count: u64) -> Row {
        Row::new(
            (0..11).map(|i| format!("c{i}")).collect(),
            vec![
                Value::UInt(1),
                Value::UInt(0),
                Value::from("READ"),
                state,
                Value::UInt(17),
                Value::UInt(2),
                Value::UInt(50),
                Value::UInt(1),
                Value::UInt(245),
                Value::UInt(0),
                Value::UInt(count),
            ],
        )
    }

    #[test]
    fn test_count_is_the_value() {
        let scraper = ClusterOperationsScraper::new();

        let metrics = scraper
            .row_metrics(&operation_row(Value::from("Prepared"), 4))
            .expect("valid row");

        assert_eq!(metrics.len(), 1);
        assert!((metrics[0].value() - 4.0).abs() < f64::EPSILON);
        assert_eq!(metrics[0].label("state"), Some("Prepared"));
        assert_eq!(metrics[0].label("tc_block_no"), Some("245"));
    }

    #[test]
    fn test_null_state_becomes_empty_label() {
        let scraper = ServerOperationsScraper::new();

        let metrics = scraper
            .row_metrics(&operation_row(Value::Null, 1))
            .expect("valid row");

        assert_eq!(metrics[0].name(), "mysql_ndbinfo_server_operations_current");
        assert_eq!(metrics[0].label("state"), Some(""));
    }
}
