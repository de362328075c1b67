use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const LOCKS_PER_FRAGMENT_QUERY: &str = r"
    SELECT
        table_id,
        node_id,
        fragment_num,
        ex_req,
        ex_imm_ok,
        ex_wait_ok,
        ex_wait_fail,
        sh_req,
        sh_imm_ok,
        sh_wait_ok,
        sh_wait_fail,
        wait_ok_millis,
        wait_fail_millis
    FROM ndbinfo.locks_per_fragment
";

/// Lock request counters per fragment replica.
#[derive(Clone)]
pub struct LocksPerFragmentScraper {
    exclusive: Arc<MetricDesc>,
    shared: Arc<MetricDesc>,
    wait_millis: Arc<MetricDesc>,
}

impl Default for LocksPerFragmentScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl LocksPerFragmentScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["table_id", "node_id", "fragment_num", "action"];
        Self {
            exclusive: static_desc(
                SUBSYSTEM,
                "locks_per_fragment_ex_total",
                "The amount of exclusive lock requests by table_id/node_id/fragment_num/action.",
                &labels,
                ValueType::Counter,
            ),
            shared: static_desc(
                SUBSYSTEM,
                "locks_per_fragment_sh_total",
                "The amount of shared lock requests by table_id/node_id/fragment_num/action.",
                &labels,
                ValueType::Counter,
            ),
            wait_millis: static_desc(
                SUBSYSTEM,
                "locks_per_fragment_wait_millis_total",
                "The amount of time spent waiting for lock requests that were granted/failed, in milliseconds by table_id/node_id/fragment_num/action.",
                &labels,
                ValueType::Counter,
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
            self.exclusive.metric(row.uint_value(3)?, &with_label(&labels, "req"))?,
            self.exclusive.metric(row.uint_value(4)?, &with_label(&labels, "imm_ok"))?,
            self.exclusive.metric(row.uint_value(5)?, &with_label(&labels, "wait_ok"))?,
            self.exclusive.metric(row.uint_value(6)?, &with_label(&labels, "wait_fail"))?,
            self.shared.metric(row.uint_value(7)?, &with_label(&labels, "req"))?,
            self.shared.metric(row.uint_value(8)?, &with_label(&labels, "imm_ok"))?,
            self.shared.metric(row.uint_value(9)?, &with_label(&labels, "wait_ok"))?,
            self.shared.metric(row.uint_value(10)?, &with_label(&labels, "wait_fail"))?,
            self.wait_millis.metric(row.uint_value(11)?, &with_label(&labels, "ok"))?,
            self.wait_millis.metric(row.uint_value(12)?, &with_label(&labels, "fail"))?,
        ])
    }
}

impl Scraper for LocksPerFragmentScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.locks_per_fragment"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.locks_per_fragment"
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
            scrape_rows(ctx, db, sink, LOCKS_PER_FRAGMENT_QUERY, |row| self.row_metrics(row))
                .await?;
            Ok(())
        })
    }
}
