use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const SERVER_TRANSACTIONS_QUERY: &str = r"
    SELECT
        node_id,
        state,
        SUM(count_operations) AS total_count_operations,
        SUM(outstanding_operations) AS total_outstanding_operations,
        MAX(inactive_seconds) AS max_inactive_seconds,
        client_node_id,
        COUNT(*) AS total_transactions
    FROM ndbinfo.server_transactions
    GROUP BY node_id, state, client_node_id
";

/// Transactions of this SQL node, aggregated per node, state and client.
#[derive(Clone)]
pub struct ServerTransactionsScraper {
    total: Arc<MetricDesc>,
    max_inactive_seconds: Arc<MetricDesc>,
}

impl Default for ServerTransactionsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerTransactionsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            total: static_desc(
                SUBSYSTEM,
                "server_transactions_total",
                "The total amount of operations by node_id/state/client_node_id/action.",
                &["node_id", "state", "client_node_id", "action"],
                ValueType::Gauge,
            ),
            max_inactive_seconds: static_desc(
                SUBSYSTEM,
                "server_transactions_max_inactive_seconds",
                "The maximum inactivity seconds by node_id/state/client_node_id.",
                &["node_id", "state", "client_node_id"],
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
            self.total.metric(row.uint_value(2)?, &with_label(&labels, "count"))?,
            self.total.metric(row.uint_value(3)?, &with_label(&labels, "outstanding"))?,
            self.total.metric(row.uint_value(6)?, &with_label(&labels, "transactions"))?,
            self.max_inactive_seconds.metric(row.uint_value(4)?, &labels)?,
        ])
    }
}

impl Scraper for ServerTransactionsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.server_transactions"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.server_transactions"
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
            scrape_rows(ctx, db, sink, SERVER_TRANSACTIONS_QUERY, |row| self.row_metrics(row))
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

    #[test]
    fn test_aggregates_decode_from_decimal_text() {
        let scraper = ServerTransactionsScraper::new();
        let row = Row::new(
            (0..7).map(|i| format!("c{i}")).collect(),
            vec![
                Value::UInt(1),
                Value::from("Started"),
                Value::from("12"),
                Value::from("3"),
                Value::UInt(40),
                Value::UInt(50),
                Value::Int(2),
            ],
        );

        let metrics = scraper.row_metrics(&row).expect("valid row");

        assert!((metrics[0].value() - 12.0).abs() < f64::EPSILON);
        assert_eq!(metrics[2].label("action"), Some("transactions"));
        assert!((metrics[2].value() - 2.0).abs() < f64::EPSILON);
        assert_eq!(metrics[3].label("client_node_id"), Some("50"));
    }
}
