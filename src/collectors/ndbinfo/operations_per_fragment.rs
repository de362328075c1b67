use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const OPERATIONS_PER_FRAGMENT_QUERY: &str = r"
    SELECT
        table_id,
        node_id,
        fragment_num,
        tot_key_reads,
        tot_key_inserts,
        tot_key_updates,
        tot_key_writes,
        tot_key_deletes,
        tot_key_refs,
        tot_key_attrinfo_bytes,
        tot_key_keyinfo_bytes,
        tot_key_prog_bytes,
        tot_key_inst_exec,
        tot_key_bytes_returned,
        tot_frag_scans,
        tot_scan_rows_examined,
        tot_scan_rows_returned,
        tot_scan_bytes_returned,
        tot_scan_prog_bytes,
        tot_scan_bound_bytes,
        tot_scan_inst_exec,
        tot_qd_frag_scans,
        conc_frag_scans,
        conc_qd_frag_scans,
        tot_commits
    FROM ndbinfo.operations_per_fragment
";

/// Key and scan operation counters per fragment replica.
#[derive(Clone)]
pub struct OperationsPerFragmentScraper {
    key: Arc<MetricDesc>,
    key_bytes: Arc<MetricDesc>,
    scans: Arc<MetricDesc>,
    scan_bytes: Arc<MetricDesc>,
    current_scans: Arc<MetricDesc>,
    commits: Arc<MetricDesc>,
}

impl Default for OperationsPerFragmentScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationsPerFragmentScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            key: static_desc(
                SUBSYSTEM,
                "operations_per_fragment_key_total",
                "The total number of key actions by table_id/node_id/fragment_num/action.",
                &["table_id", "node_id", "fragment_num", "action"],
                ValueType::Counter,
            ),
            key_bytes: static_desc(
                SUBSYSTEM,
                "operations_per_fragment_key_bytes_total",
                "The total size of all action by table_id/node_id/fragment_num/action.",
                &["table_id", "node_id", "fragment_num", "action"],
                ValueType::Counter,
            ),
            scans: static_desc(
                SUBSYSTEM,
                "operations_per_fragment_scans_total",
                "The total number of scans performed action by table_id/node_id/fragment_num/action.",
                &["table_id", "node_id", "fragment_num", "action"],
                ValueType::Counter,
            ),
            scan_bytes: static_desc(
                SUBSYSTEM,
                "operations_per_fragment_scan_bytes_total",
                "The total size of data used in scan actions by table_id/node_id/fragment_num/action.",
                &["table_id", "node_id", "fragment_num", "action"],
                ValueType::Counter,
            ),
            current_scans: static_desc(
                SUBSYSTEM,
                "operations_per_fragment_current_scans",
                "The number of non-queued/queued scans currently active by table_id/node_id/fragment_num/action.",
                &["table_id", "node_id", "fragment_num", "action"],
                ValueType::Gauge,
            ),
            commits: static_desc(
                SUBSYSTEM,
                "operations_per_fragment_commits_total",
                "The total number of row changes committed by table_id/node_id/fragment_num.",
                &["table_id", "node_id", "fragment_num"],
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
            self.key.metric(row.uint_value(3)?, &with_label(&labels, "read"))?,
            self.key.metric(row.uint_value(4)?, &with_label(&labels, "insert"))?,
            self.key.metric(row.uint_value(5)?, &with_label(&labels, "update"))?,
            self.key.metric(row.uint_value(6)?, &with_label(&labels, "write"))?,
            self.key.metric(row.uint_value(7)?, &with_label(&labels, "delete"))?,
            self.key.metric(row.uint_value(8)?, &with_label(&labels, "refs"))?,
            self.key.metric(row.uint_value(12)?, &with_label(&labels, "inst_exec"))?,
            self.key_bytes.metric(row.uint_value(13)?, &with_label(&labels, "returned"))?,
            self.key_bytes.metric(row.uint_value(9)?, &with_label(&labels, "attrinfo"))?,
            self.key_bytes.metric(row.uint_value(10)?, &with_label(&labels, "keyinfo"))?,
            self.key_bytes.metric(row.uint_value(11)?, &with_label(&labels, "prog"))?,
            self.scans.metric(row.uint_value(14)?, &with_label(&labels, "total"))?,
            self.scans.metric(row.uint_value(15)?, &with_label(&labels, "rows_examined"))?,
            self.scans.metric(row.uint_value(16)?, &with_label(&labels, "rows_returned"))?,
            self.scans.metric(row.uint_value(20)?, &with_label(&labels, "inst_exec"))?,
            self.scans.metric(row.uint_value(21)?, &with_label(&labels, "queued"))?,
            self.current_scans.metric(row.uint_value(22)?, &with_label(&labels, "conc"))?,
            self.current_scans.metric(row.uint_value(23)?, &with_label(&labels, "conc_qd"))?,
            self.scan_bytes.metric(row.uint_value(17)?, &with_label(&labels, "total"))?,
            self.scan_bytes.metric(row.uint_value(18)?, &with_label(&labels, "prog"))?,
            self.scan_bytes.metric(row.uint_value(19)?, &with_label(&labels, "bound"))?,
            self.commits.metric(row.uint_value(24)?, &labels)?,
        ])
    }
}

impl Scraper for OperationsPerFragmentScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.operations_per_fragment"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.operations_per_fragment"
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
            scrape_rows(ctx, db, sink, OPERATIONS_PER_FRAGMENT_QUERY, |row| self.row_metrics(row))
                .await?;
            Ok(())
        })
    }
}
