use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const TABLE_INFO_QUERY: &str = r"
    SELECT
        table_id,
        logged_table,
        row_contains_gci,
        row_contains_checksum,
        read_backup,
        fully_replicated,
        storage_type,
        hashmap_id,
        partition_balance,
        create_gci
    FROM ndbinfo.table_info
";

#[derive(Clone)]
pub struct TableInfoScraper {
    flags: Arc<MetricDesc>,
    create_gci: Arc<MetricDesc>,
}

impl Default for TableInfoScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl TableInfoScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            flags: static_desc(
                SUBSYSTEM,
                "table_info",
                "Whether table is contains info (1) or not (0) by table_id/storage_type/hashmap_id/partition_balance/info.",
                &["table_id", "storage_type", "hashmap_id", "partition_balance", "info"],
                ValueType::Gauge,
            ),
            create_gci: static_desc(
                SUBSYSTEM,
                "table_info_create_gci",
                "GCI from which table was created by table_id/storage_type/hashmap_id/partition_balance.",
                &["table_id", "storage_type", "hashmap_id", "partition_balance"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 6, 7, 8])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.flags.metric(row.uint_value(1)?, &with_label(&labels, "logged_table"))?,
            self.flags.metric(row.uint_value(2)?, &with_label(&labels, "row_contains_gci"))?,
            self.flags.metric(row.uint_value(3)?, &with_label(&labels, "row_contains_checksum"))?,
            self.flags.metric(row.uint_value(4)?, &with_label(&labels, "read_backup"))?,
            self.flags.metric(row.uint_value(5)?, &with_label(&labels, "fully_replicated"))?,
            self.create_gci.metric(row.uint_value(9)?, &labels)?,
        ])
    }
}

impl Scraper for TableInfoScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.table_info"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.table_info"
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
            scrape_rows(ctx, db, sink, TABLE_INFO_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
