use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const CLUSTER_TRANSACTIONS_QUERY: &str = r"
    SELECT
        node_id,
        state,
        SUM(count_operations) AS total_count_operations,
        SUM(outstanding_operations) AS total_outstanding_operations,
        MAX(inactive_seconds) AS max_inactive_seconds,
        client_node_id,
        COUNT(*) AS total_transactions
    FROM ndbinfo.cluster_transactions
    GROUP BY node_id, state, client_node_id
";

/// Transactions on all data nodes, aggregated per node, state and client.
#[derive(Clone)]
pub struct ClusterTransactionsScraper {
    count_operations: Arc<MetricDesc>,
    outstanding_operations: Arc<MetricDesc>,
    max_inactive_seconds: Arc<MetricDesc>,
    transactions: Arc<MetricDesc>,
}

impl Default for ClusterTransactionsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ClusterTransactionsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["node_id", "state", "client_node_id"];
        Self {
            count_operations: static_desc(
                SUBSYSTEM,
                "cluster_transactions_total_count_operations",
                "The amount of stateful primary key operations in transaction (includes reads with locks, as well as DML operations) by node_id/state/client_node_id.",
                &labels,
                ValueType::Gauge,
            ),
            outstanding_operations: static_desc(
                SUBSYSTEM,
                "cluster_transactions_total_outstanding_operations",
                "The amount of operations still being executed in local data management blocks by node_id/state/client_node_id.",
                &labels,
                ValueType::Gauge,
            ),
            max_inactive_seconds: static_desc(
                SUBSYSTEM,
                "cluster_transactions_max_inactive_seconds",
                "The maximum inactivity seconds by node_id/state/client_node_id.",
                &labels,
                ValueType::Gauge,
            ),
            transactions: static_desc(
                SUBSYSTEM,
                "cluster_transactions_total_transactions",
                "The total amount of transactions by node_id/state/client_node_id.",
                &labels,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 1, 5])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.count_operations.metric(row.uint_value(2)?, &labels)?,
            self.outstanding_operations.metric(row.uint_value(3)?, &labels)?,
            self.max_inactive_seconds.metric(row.uint_value(4)?, &labels)?,
            self.transactions.metric(row.uint_value(6)?, &labels)?,
        ])
    }
}

impl Scraper for ClusterTransactionsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.cluster_transactions"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.cluster_transactions"
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
            scrape_rows(ctx, db, sink, CLUSTER_TRANSACTIONS_QUERY, |row| self.row_metrics(row))
                .await?;
            Ok(())
        })
    }
}
