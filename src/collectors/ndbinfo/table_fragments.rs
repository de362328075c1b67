use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const TABLE_FRAGMENTS_QUERY: &str = r"
    SELECT
        node_id,
        table_id,
        partition_id,
        fragment_id,
        partition_order,
        log_part_id,
        no_of_replicas,
        current_primary,
        preferred_primary,
        current_first_backup,
        current_second_backup,
        current_third_backup,
        num_alive_replicas,
        num_dead_replicas,
        num_lcp_replicas
    FROM ndbinfo.table_fragments
";

/// Replica placement and health of every table fragment.
#[derive(Clone)]
pub struct TableFragmentsScraper {
    num_replicas: Arc<MetricDesc>,
    primary: Arc<MetricDesc>,
    current_backup: Arc<MetricDesc>,
}

impl Default for TableFragmentsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFragmentsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            num_replicas: static_desc(
                SUBSYSTEM,
                "table_fragments_num_replicas",
                "The current/total number of replicas by node_id/table_id/partition_id/fragment_id/partition_order/log_part_id/status.",
                &[
                    "node_id",
                    "table_id",
                    "partition_id",
                    "fragment_id",
                    "partition_order",
                    "log_part_id",
                    "status",
                ],
                ValueType::Gauge,
            ),
            primary: static_desc(
                SUBSYSTEM,
                "table_fragments_primary",
                "The primary node ID by node_id/table_id/partition_id/fragment_id/partition_order/log_part_id/type.",
                &[
                    "node_id",
                    "table_id",
                    "partition_id",
                    "fragment_id",
                    "partition_order",
                    "log_part_id",
                    "type",
                ],
                ValueType::Gauge,
            ),
            current_backup: static_desc(
                SUBSYSTEM,
                "table_fragments_current_backup",
                "The current backup node ID by node_id/table_id/partition_id/fragment_id/partition_order/log_part_id/order.",
                &[
                    "node_id",
                    "table_id",
                    "partition_id",
                    "fragment_id",
                    "partition_order",
                    "log_part_id",
                    "order",
                ],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..6)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.num_replicas.metric(row.uint_value(6)?, &with_label(&labels, "total"))?,
            self.primary.metric(row.uint_value(7)?, &with_label(&labels, "current"))?,
            self.primary.metric(row.uint_value(8)?, &with_label(&labels, "preferred"))?,
            self.current_backup.metric(row.uint_value(9)?, &with_label(&labels, "first"))?,
            self.current_backup.metric(row.uint_value(10)?, &with_label(&labels, "second"))?,
            self.current_backup.metric(row.uint_value(11)?, &with_label(&labels, "third"))?,
            self.num_replicas.metric(row.uint_value(12)?, &with_label(&labels, "alive"))?,
            self.num_replicas.metric(row.uint_value(13)?, &with_label(&labels, "dead"))?,
            self.num_replicas.metric(row.uint_value(14)?, &with_label(&labels, "lcp"))?,
        ])
    }
}

impl Scraper for TableFragmentsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.table_fragments"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.table_fragments"
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
            scrape_rows(ctx, db, sink, TABLE_FRAGMENTS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
