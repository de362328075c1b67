use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const ARBITRATOR_VALIDITY_SUMMARY_QUERY: &str = r"
    SELECT
        arbitrator,
        arb_ticket,
        arb_connected,
        consensus_count
    FROM ndbinfo.arbitrator_validity_summary
";

#[derive(Clone)]
pub struct ArbitratorValiditySummaryScraper {
    consensus_count: Arc<MetricDesc>,
}

impl Default for ArbitratorValiditySummaryScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitratorValiditySummaryScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            consensus_count: static_desc(
                SUBSYSTEM,
                "arbitrator_validity_summary_consensus_count",
                "The number of data nodes that see this node as arbitrator by arbitrator/arb_ticket/arb_connected.",
                &["arbitrator", "arb_ticket", "arb_connected"],
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

        Ok(vec![self.consensus_count.metric(row.uint_value(3)?, &labels)?])
    }
}

impl Scraper for ArbitratorValiditySummaryScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.arbitrator_validity_summary"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.arbitrator_validity_summary"
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
            scrape_rows(ctx, db, sink, ARBITRATOR_VALIDITY_SUMMARY_QUERY, |row| {
                self.row_metrics(row)
            })
            .await?;
            Ok(())
        })
    }
}
