use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const RESOURCES_QUERY: &str = r"
    SELECT
        node_id,
        resource_name,
        reserved,
        used,
        max,
        spare
    FROM ndbinfo.resources
";

/// Page usage per data node resource, one series per allocation type.
#[derive(Clone)]
pub struct ResourcesScraper {
    pages: Arc<MetricDesc>,
}

impl Default for ResourcesScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourcesScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            pages: static_desc(
                SUBSYSTEM,
                "resources",
                "The amount, as a number of 32KB pages by node_id/resource_name/type.",
                &["node_id", "resource_name", "type"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a numeric column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;
        let resource_name = row.text(1)?;

        let mut metrics = Vec::with_capacity(4);
        for (idx, kind) in [(2, "reserved"), (3, "used"), (4, "max"), (5, "spare")] {
            metrics.push(self.pages.metric(
                row.uint_value(idx)?,
                &[node_id.as_str(), resource_name.as_str(), kind],
            )?);
        }

        Ok(metrics)
    }
}

impl Scraper for ResourcesScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.resources"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.resources"
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
            scrape_rows(ctx, db, sink, RESOURCES_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
