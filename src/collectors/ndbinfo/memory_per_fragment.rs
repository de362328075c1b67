use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const MEMORY_PER_FRAGMENT_QUERY: &str = r"
    SELECT
        table_id,
        node_id,
        fragment_num,
        fixed_elem_alloc_bytes,
        fixed_elem_free_bytes,
        fixed_elem_size_bytes,
        fixed_elem_count,
        fixed_elem_free_count,
        var_elem_alloc_bytes,
        var_elem_free_bytes,
        var_elem_count,
        hash_index_alloc_bytes
    FROM ndbinfo.memory_per_fragment
";

#[derive(Clone)]
pub struct MemoryPerFragmentScraper {
    alloc_bytes: Arc<MetricDesc>,
    elem_free_bytes: Arc<MetricDesc>,
    elem_count: Arc<MetricDesc>,
    elem_size_bytes: Arc<MetricDesc>,
    elem_free_count: Arc<MetricDesc>,
}

impl Default for MemoryPerFragmentScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryPerFragmentScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["table_id", "node_id", "fragment_num", "type"];
        Self {
            alloc_bytes: static_desc(
                SUBSYSTEM,
                "memory_per_fragment_alloc_bytes",
                "The amount of bytes allocated for type by table_id/node_id/fragment_num/type.",
                &labels,
                ValueType::Gauge,
            ),
            elem_free_bytes: static_desc(
                SUBSYSTEM,
                "memory_per_fragment_elem_free_bytes",
                "The amount of free bytes remaining in pages allocated to elements by table_id/node_id/fragment_num/type.",
                &labels,
                ValueType::Gauge,
            ),
            elem_count: static_desc(
                SUBSYSTEM,
                "memory_per_fragment_elem_count",
                "The amount of elements by table_id/node_id/fragment_num/type.",
                &labels,
                ValueType::Gauge,
            ),
            elem_size_bytes: static_desc(
                SUBSYSTEM,
                "memory_per_fragment_elem_size_bytes",
                "The length of each element in bytes by table_id/node_id/fragment_num/type.",
                &labels,
                ValueType::Gauge,
            ),
            elem_free_count: static_desc(
                SUBSYSTEM,
                "memory_per_fragment_elem_free_count",
                "The amount of free rows for elements by table_id/node_id/fragment_num/type.",
                &labels,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..3)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.alloc_bytes.metric(row.uint_value(3)?, &with_label(&labels, "fixed"))?,
            self.alloc_bytes.metric(row.uint_value(8)?, &with_label(&labels, "var"))?,
            self.alloc_bytes.metric(row.uint_value(11)?, &with_label(&labels, "hash_index"))?,
            self.elem_free_bytes.metric(row.uint_value(4)?, &with_label(&labels, "fixed"))?,
            self.elem_free_bytes.metric(row.uint_value(9)?, &with_label(&labels, "var"))?,
            self.elem_count.metric(row.uint_value(6)?, &with_label(&labels, "fixed"))?,
            self.elem_count.metric(row.uint_value(10)?, &with_label(&labels, "var"))?,
            self.elem_size_bytes.metric(row.uint_value(5)?, &with_label(&labels, "fixed"))?,
            self.elem_free_count.metric(row.uint_value(7)?, &with_label(&labels, "fixed"))?,
        ])
    }
}

impl Scraper for MemoryPerFragmentScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.memory_per_fragment"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.memory_per_fragment"
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
            scrape_rows(ctx, db, sink, MEMORY_PER_FRAGMENT_QUERY, |row| self.row_metrics(row))
                .await?;
            Ok(())
        })
    }
}
