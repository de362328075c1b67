use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const RESTART_INFO_QUERY: &str = r"
    SELECT
        node_id,
        node_restart_status_int,
        secs_to_complete_node_failure,
        secs_to_allocate_node_id,
        secs_to_include_in_heartbeat_protocol,
        secs_until_wait_for_ndbcntr_master,
        secs_wait_for_ndbcntr_master,
        secs_to_get_start_permitted,
        secs_to_wait_for_lcp_for_copy_meta_data,
        secs_to_copy_meta_data,
        secs_to_include_node,
        secs_starting_node_to_request_local_recovery,
        secs_for_local_recovery,
        secs_restore_fragments,
        secs_undo_disk_data,
        secs_exec_redo_log,
        secs_index_rebuild,
        secs_to_synchronize_starting_node,
        secs_wait_lcp_for_restart,
        secs_wait_subscription_handover,
        total_restart_secs
    FROM ndbinfo.restart_info
";

/// `action` label for each `secs_*` column, in query order starting at column 2.
const PHASES: [&str; 19] = [
    "complete_node_failure",
    "allocate_node_id",
    "include_in_heartbeat_protocol",
    "until_wait_for_ndbcntr_master",
    "wait_for_ndbcntr_master",
    "get_start_permitted",
    "wait_for_lcp_for_copy_meta_data",
    "copy_meta_data",
    "include_node",
    "starting_node_to_request_local_recovery",
    "local_recovery",
    "restore_fragments",
    "undo_disk_data",
    "exec_redo_log",
    "index_rebuild",
    "synchronize_starting_node",
    "wait_lcp_for_restart",
    "wait_subscription_handover",
    "total",
];

/// Node restart progress and time spent per restart phase.
#[derive(Clone)]
pub struct RestartInfoScraper {
    status: Arc<MetricDesc>,
    secs: Arc<MetricDesc>,
}

impl Default for RestartInfoScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl RestartInfoScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: static_desc(
                SUBSYSTEM,
                "restart_info_node_restart_status_int",
                "The node restart status code by node_id. See manual for human readable value.",
                &["node_id"],
                ValueType::Gauge,
            ),
            secs: static_desc(
                SUBSYSTEM,
                "restart_info_secs",
                "Time in seconds to complete action by node_id/action.",
                &["node_id", "action"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a numeric column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;

        let mut metrics = Vec::with_capacity(PHASES.len() + 1);
        metrics.push(self.status.metric(row.uint_value(1)?, &[node_id.as_str()])?);

        for (offset, phase) in PHASES.into_iter().enumerate() {
            metrics.push(
                self.secs
                    .metric(row.uint_value(offset + 2)?, &[node_id.as_str(), phase])?,
            );
        }

        Ok(metrics)
    }
}

impl Scraper for RestartInfoScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.restart_info"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.restart_info"
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
            scrape_rows(ctx, db, sink, RESTART_INFO_QUERY, |row| self.row_metrics(row)).await?;
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
    fn test_phase_columns_line_up() {
        let scraper = RestartInfoScraper::new();
        let columns = (0..21).map(|i| format!("c{i}")).collect();
        let values = (0..21_u64).map(Value::UInt).collect();

        let metrics = scraper
            .row_metrics(&Row::new(columns, values))
            .expect("valid row");

        assert_eq!(metrics.len(), 20);
        assert!((metrics[0].value() - 1.0).abs() < f64::EPSILON);
        assert_eq!(metrics[1].label("action"), Some("complete_node_failure"));
        assert!((metrics[1].value() - 2.0).abs() < f64::EPSILON);
        assert_eq!(metrics[19].label("action"), Some("total"));
        assert!((metrics[19].value() - 20.0).abs() < f64::EPSILON);
    }
}
