use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const FILES_QUERY: &str = r"
    SELECT
        id,
        type,
        name,
        parent,
        parent_name,
        free_extents,
        total_extents,
        (extent_size * 1024 * 1024) AS extent_size_bytes,
        initial_size,
        maximum_size,
        autoextend_size
    FROM ndbinfo.files
";

/// Extents and sizes of disk data files.
#[derive(Clone)]
pub struct FilesScraper {
    extents: Arc<MetricDesc>,
    size_bytes: Arc<MetricDesc>,
}

impl Default for FilesScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl FilesScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            extents: static_desc(
                SUBSYSTEM,
                "files_extents",
                "The amount of free extents by id/type/name/parent/parent_name/amount_type.",
                &["id", "type", "name", "parent", "parent_name", "amount_type"],
                ValueType::Gauge,
            ),
            size_bytes: static_desc(
                SUBSYSTEM,
                "files_size_bytes",
                "The extent size in bytes by id/type/name/parent/parent_name/size_type.",
                &["id", "type", "name", "parent", "parent_name", "size_type"],
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
            self.extents.metric(row.uint_value(5)?, &with_label(&labels, "free"))?,
            self.extents.metric(row.uint_value(6)?, &with_label(&labels, "total"))?,
            self.size_bytes.metric(row.uint_value(7)?, &with_label(&labels, "extent"))?,
            self.size_bytes.metric(row.uint_value(8)?, &with_label(&labels, "initial"))?,
            self.size_bytes.metric(row.uint_value(9)?, &with_label(&labels, "maximum"))?,
            self.size_bytes.metric(row.uint_value(10)?, &with_label(&labels, "autoextend"))?,
        ])
    }
}

impl Scraper for FilesScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.files"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.files"
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
            scrape_rows(ctx, db, sink, FILES_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
