use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const TABLE_REPLICAS_QUERY: &str = r"
    SELECT
        node_id,
        table_id,
        fragment_id,
        initial_gci,
        replica_node_id,
        is_lcp_ongoing,
        num_crashed_replicas,
        last_max_gci_started,
        last_max_gci_completed,
        last_lcp_id,
        prev_lcp_id,
        prev_max_gci_started,
        prev_max_gci_completed,
        last_create_gci,
        last_replica_gci,
        is_replica_alive
    FROM ndbinfo.table_replicas
";

#[derive(Clone)]
pub struct TableReplicasScraper {
    is_replica_alive: Arc<MetricDesc>,
    num_crashed: Arc<MetricDesc>,
    is_lcp_ongoing: Arc<MetricDesc>,
    lcp: Arc<MetricDesc>,
    gci: Arc<MetricDesc>,
}

impl Default for TableReplicasScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl TableReplicasScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            is_replica_alive: static_desc(
                SUBSYSTEM,
                "table_replicas_is_replica_alive",
                "Indicates if the replica is alive (1) or not (0) by node_id/table_id/fragment_id/initial_gci/replica_node_id.",
                &["node_id", "table_id", "fragment_id", "initial_gci", "replica_node_id"],
                ValueType::Gauge,
            ),
            num_crashed: static_desc(
                SUBSYSTEM,
                "table_replicas_num_crashed",
                "Number of crashed replicas by node_id/table_id/fragment_id/initial_gci/replica_node_id.",
                &["node_id", "table_id", "fragment_id", "initial_gci", "replica_node_id"],
                ValueType::Gauge,
            ),
            is_lcp_ongoing: static_desc(
                SUBSYSTEM,
                "table_replicas_is_lcp_ongoing",
                "Is 1 if LCP is ongoing on this fragment, 0 otherwise by node_id/table_id/fragment_id/initial_gci/replica_node_id.",
                &["node_id", "table_id", "fragment_id", "initial_gci", "replica_node_id"],
                ValueType::Gauge,
            ),
            lcp: static_desc(
                SUBSYSTEM,
                "table_replicas_lcp",
                "Last / previous LCP ID by node_id/table_id/fragment_id/initial_gci/replica_node_id/type.",
                &["node_id", "table_id", "fragment_id", "initial_gci", "replica_node_id", "type"],
                ValueType::Gauge,
            ),
            gci: static_desc(
                SUBSYSTEM,
                "table_replicas_gci",
                "Highest / Last GCI started by node_id/table_id/fragment_id/initial_gci/replica_node_id/type.",
                &["node_id", "table_id", "fragment_id", "initial_gci", "replica_node_id", "type"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..5)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.is_replica_alive.metric(row.uint_value(15)?, &labels)?,
            self.num_crashed.metric(row.uint_value(6)?, &labels)?,
            self.is_lcp_ongoing.metric(row.uint_value(5)?, &labels)?,
            self.lcp.metric(row.uint_value(9)?, &with_label(&labels, "last_lcp_id"))?,
            self.lcp.metric(row.uint_value(10)?, &with_label(&labels, "prev_lcp_id"))?,
            self.gci.metric(row.uint_value(7)?, &with_label(&labels, "last_max_gci_started"))?,
            self.gci.metric(row.uint_value(8)?, &with_label(&labels, "last_max_gci_completed"))?,
            self.gci.metric(row.uint_value(11)?, &with_label(&labels, "prev_max_gci_started"))?,
            self.gci.metric(row.uint_value(12)?, &with_label(&labels, "prev_max_gci_completed"))?,
            self.gci.metric(row.uint_value(13)?, &with_label(&labels, "last_create_gci"))?,
            self.gci.metric(row.uint_value(14)?, &with_label(&labels, "last_replica_gci"))?,
        ])
    }
}

impl Scraper for TableReplicasScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.table_replicas"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.table_replicas"
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
            scrape_rows(ctx, db, sink, TABLE_REPLICAS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
