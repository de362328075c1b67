use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const BLOBS_QUERY: &str = r"
    SELECT
        table_id,
        database_name,
        table_name,
        column_id,
        inline_size,
        part_size,
        stripe_size
    FROM ndbinfo.blobs
";

/// Inline, part and stripe sizes of every blob column.
#[derive(Clone)]
pub struct BlobsScraper {
    size: Arc<MetricDesc>,
}

impl Default for BlobsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl BlobsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            size: static_desc(
                SUBSYSTEM,
                "blobs_size",
                "The size of blobs column by table_id/database_name/table_name/column_id/type.",
                &["table_id", "database_name", "table_name", "column_id", "type"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..4)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.size.metric(row.uint_value(4)?, &with_label(&labels, "inline"))?,
            self.size.metric(row.uint_value(5)?, &with_label(&labels, "part"))?,
            self.size.metric(row.uint_value(6)?, &with_label(&labels, "stripe"))?,
        ])
    }
}

impl Scraper for BlobsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.blobs"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.blobs"
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
            scrape_rows(ctx, db, sink, BLOBS_QUERY, |row| self.row_metrics(row)).await?;
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
    fn test_one_sample_per_size_type() {
        let scraper = BlobsScraper::new();
        let row = Row::new(
            (0..7).map(|i| format!("c{i}")).collect(),
            vec![
                Value::UInt(13),
                Value::from("shop"),
                Value::from("orders"),
                Value::UInt(4),
                Value::UInt(256),
                Value::UInt(2000),
                Value::UInt(0),
            ],
        );

        let metrics = scraper.row_metrics(&row).expect("valid row");

        let types: Vec<_> = metrics.iter().filter_map(|m| m.label("type")).collect();
        assert_eq!(types, vec!["inline", "part", "stripe"]);
        assert!((metrics[1].value() - 2000.0).abs() < f64::EPSILON);
    }
}
