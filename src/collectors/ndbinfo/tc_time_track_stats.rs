use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const TC_TIME_TRACK_STATS_QUERY: &str = r"
    SELECT
        node_id,
        comm_node_id,
        upper_bound,
        scans,
        scan_errors,
        scan_fragments,
        scan_fragment_errors,
        transactions,
        transaction_errors,
        read_key_ops,
        write_key_ops,
        index_key_ops,
        key_op_errors
    FROM ndbinfo.tc_time_track_stats
";

/// Counted columns, starting at index 3. The column name is the `action` label.
const ACTIONS: [&str; 10] = [
    "scans",
    "scan_errors",
    "scan_fragments",
    "scan_fragment_errors",
    "transactions",
    "transaction_errors",
    "read_key_ops",
    "write_key_ops",
    "index_key_ops",
    "key_op_errors",
];

/// Transaction coordinator latency histogram buckets, one row per `upper_bound`.
#[derive(Clone)]
pub struct TcTimeTrackStatsScraper {
    count: Arc<MetricDesc>,
}

impl Default for TcTimeTrackStatsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl TcTimeTrackStatsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            count: static_desc(
                SUBSYSTEM,
                "tc_time_track_stats_count",
                "The amount of actions by node_id/comm_node_id/upper_bound/action.",
                &["node_id", "comm_node_id", "upper_bound", "action"],
                ValueType::Counter,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a numeric column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;
        let comm_node_id = row.text(1)?;
        let upper_bound = row.text(2)?;

        ACTIONS
            .into_iter()
            .enumerate()
            .map(|(offset, action)| -> Result<Metric, ScrapeError> {
                Ok(self.count.metric(
                    row.uint_value(offset + 3)?,
                    &[
                        node_id.as_str(),
                        comm_node_id.as_str(),
                        upper_bound.as_str(),
                        action,
                    ],
                )?)
            })
            .collect()
    }
}

impl Scraper for TcTimeTrackStatsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.tc_time_track_stats"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.tc_time_track_stats"
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
            scrape_rows(ctx, db, sink, TC_TIME_TRACK_STATS_QUERY, |row| {
                self.row_metrics(row)
            })
            .await?;
            Ok(())
        })
    }
}
