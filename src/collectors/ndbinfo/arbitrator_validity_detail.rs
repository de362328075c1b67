use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const ARBITRATOR_VALIDITY_DETAIL_QUERY: &str = r"
    SELECT
        node_id,
        arbitrator,
        arb_ticket,
        arb_connected,
        arb_state
    FROM ndbinfo.arbitrator_validity_detail
";

/// Arbitrator as seen by each data node.
#[derive(Clone)]
pub struct ArbitratorValidityDetailScraper {
    arbitrator: Arc<MetricDesc>,
}

impl Default for ArbitratorValidityDetailScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ArbitratorValidityDetailScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            arbitrator: static_desc(
                SUBSYSTEM,
                "arbitrator_validity_detail_arbitrator",
                "The arbitrator id by node_id/arb_ticket/arb_connected/arb_state.",
                &["node_id", "arb_ticket", "arb_connected", "arb_state"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 2, 3, 4])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![self.arbitrator.metric(row.uint_value(1)?, &labels)?])
    }
}

impl Scraper for ArbitratorValidityDetailScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.arbitrator_validity_detail"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.arbitrator_validity_detail"
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
            scrape_rows(ctx, db, sink, ARBITRATOR_VALIDITY_DETAIL_QUERY, |row| {
                self.row_metrics(row)
            })
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
    fn test_arbitrator_id_is_the_value() {
        let scraper = ArbitratorValidityDetailScraper::new();
        let row = Row::new(
            (0..5).map(|i| format!("c{i}")).collect(),
            vec![
                Value::UInt(1),
                Value::UInt(49),
                Value::from("0b76000b5c3d2e1f"),
                Value::from("Yes"),
                Value::from("ARBIT_RUN"),
            ],
        );

        let metrics = scraper.row_metrics(&row).expect("valid row");

        assert!((metrics[0].value() - 49.0).abs() < f64::EPSILON);
        assert_eq!(metrics[0].label("arb_state"), Some("ARBIT_RUN"));
        assert_eq!(metrics[0].label("node_id"), Some("1"));
    }
}
