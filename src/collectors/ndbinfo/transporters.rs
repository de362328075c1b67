use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const TRANSPORTERS_QUERY: &str = r"
    SELECT
        node_id,
        remote_node_id,
        status,
        remote_address,
        bytes_sent,
        bytes_received,
        connect_count,
        overloaded,
        overload_count,
        slowdown,
        slowdown_count
    FROM ndbinfo.transporters
";

/// Traffic and congestion state of every transporter between two nodes.
#[derive(Clone)]
pub struct TransportersScraper {
    bytes: Arc<MetricDesc>,
    count: Arc<MetricDesc>,
    state: Arc<MetricDesc>,
}

impl Default for TransportersScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportersScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: static_desc(
                SUBSYSTEM,
                "transporters_bytes_total",
                "Number of bytes sent/received using this connection by node_id/remote_node_id/status/remote_address/action.",
                &["node_id", "remote_node_id", "status", "remote_address", "action"],
                ValueType::Counter,
            ),
            count: static_desc(
                SUBSYSTEM,
                "transporters_count_total",
                "Number of times connected/overloaded/slowdown on this transporter by node_id/remote_node_id/status/remote_address/action.",
                &["node_id", "remote_node_id", "status", "remote_address", "action"],
                ValueType::Counter,
            ),
            state: static_desc(
                SUBSYSTEM,
                "transporters_state",
                "1 if this transporter is currently in overload/slowdown state, otherwise 0 by node_id/remote_node_id/status/remote_address/state.",
                &["node_id", "remote_node_id", "status", "remote_address", "state"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a numeric column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;
        let remote_node_id = row.text(1)?;
        let status = row.text(2)?;
        let remote_address = row.text(3)?;
        let prefix = [
            node_id.as_str(),
            remote_node_id.as_str(),
            status.as_str(),
            remote_address.as_str(),
        ];
        let labels = |last: &'static str| {
            let mut labels = prefix.to_vec();
            labels.push(last);
            labels
        };

        Ok(vec![
            self.bytes.metric(row.uint_value(4)?, &labels("sent"))?,
            self.bytes.metric(row.uint_value(5)?, &labels("received"))?,
            self.count.metric(row.uint_value(6)?, &labels("connect"))?,
            self.state.metric(row.uint_value(7)?, &labels("overload"))?,
            self.count.metric(row.uint_value(8)?, &labels("overload"))?,
            self.state.metric(row.uint_value(9)?, &labels("slowdown"))?,
            self.count.metric(row.uint_value(10)?, &labels("slowdown"))?,
        ])
    }
}

impl Scraper for TransportersScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.transporters"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.transporters"
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
            scrape_rows(ctx, db, sink, TRANSPORTERS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
