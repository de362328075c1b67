use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const DISK_WRITE_SPEED_AGGREGATE_QUERY: &str = r"
    SELECT
        node_id,
        thr_no,
        backup_lcp_speed_last_sec,
        redo_speed_last_sec,
        backup_lcp_speed_last_10sec,
        redo_speed_last_10sec,
        std_dev_backup_lcp_speed_last_10sec,
        std_dev_redo_speed_last_10sec,
        backup_lcp_speed_last_60sec,
        redo_speed_last_60sec,
        std_dev_backup_lcp_speed_last_60sec,
        std_dev_redo_speed_last_60sec,
        slowdowns_due_to_io_lag,
        slowdowns_due_to_high_cpu,
        disk_write_speed_set_to_min,
        current_target_disk_write_speed
    FROM ndbinfo.disk_write_speed_aggregate
";

/// Disk write speeds per LDM thread over 1, 10 and 60 second windows.
#[derive(Clone)]
pub struct DiskWriteSpeedAggregateScraper {
    backup_lcp_speed: Arc<MetricDesc>,
    redo_speed: Arc<MetricDesc>,
    std_dev_backup_lcp_speed: Arc<MetricDesc>,
    std_dev_redo_speed: Arc<MetricDesc>,
    slowdowns: Arc<MetricDesc>,
    set_to_min: Arc<MetricDesc>,
    current_target: Arc<MetricDesc>,
}

impl Default for DiskWriteSpeedAggregateScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl DiskWriteSpeedAggregateScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            backup_lcp_speed: static_desc(
                SUBSYSTEM,
                "disk_write_speed_aggregate_backup_lcp_speed",
                "The amount of bytes written to disk by backup and LCP processes in the last time interval by node_id/thr_no/time.",
                &["node_id", "thr_no", "time"],
                ValueType::Gauge,
            ),
            redo_speed: static_desc(
                SUBSYSTEM,
                "disk_write_speed_aggregate_redo_speed",
                "The amount of bytes written to REDO log in the last time interval by node_id/thr_no/time.",
                &["node_id", "thr_no", "time"],
                ValueType::Gauge,
            ),
            std_dev_backup_lcp_speed: static_desc(
                SUBSYSTEM,
                "disk_write_speed_aggregate_std_dev_backup_lcp_speed",
                "Standard deviation in number of bytes written to disk by backup and LCP processes per second, averaged over the last x seconds by node_id/thr_no/time.",
                &["node_id", "thr_no", "time"],
                ValueType::Gauge,
            ),
            std_dev_redo_speed: static_desc(
                SUBSYSTEM,
                "disk_write_speed_aggregate_std_dev_redo_speed",
                "Standard deviation in number of bytes written to REDO log per second, averaged over the last x seconds by node_id/thr_no/time.",
                &["node_id", "thr_no", "time"],
                ValueType::Gauge,
            ),
            slowdowns: static_desc(
                SUBSYSTEM,
                "disk_write_speed_aggregate_slowdowns",
                "The amount of seconds since last node start that disk writes were slowed due to reason by node_id/thr_no/reason.",
                &["node_id", "thr_no", "reason"],
                ValueType::Gauge,
            ),
            set_to_min: static_desc(
                SUBSYSTEM,
                "disk_write_speed_aggregate_disk_write_speed_set_to_min",
                "The amount of seconds since last node start that disk write speed was set to minimum by node_id/thr_no.",
                &["node_id", "thr_no"],
                ValueType::Gauge,
            ),
            current_target: static_desc(
                SUBSYSTEM,
                "disk_write_speed_aggregate_current_target_disk_write_speed",
                "The actual speed of disk writes (aggregated) by node_id/thr_no.",
                &["node_id", "thr_no"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..2)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.backup_lcp_speed.metric(row.uint_value(2)?, &with_label(&labels, "sec"))?,
            self.backup_lcp_speed.metric(row.uint_value(4)?, &with_label(&labels, "10sec"))?,
            self.backup_lcp_speed.metric(row.uint_value(8)?, &with_label(&labels, "60sec"))?,
            self.redo_speed.metric(row.uint_value(3)?, &with_label(&labels, "sec"))?,
            self.redo_speed.metric(row.uint_value(5)?, &with_label(&labels, "10sec"))?,
            self.redo_speed.metric(row.uint_value(9)?, &with_label(&labels, "60sec"))?,
            self.std_dev_backup_lcp_speed.metric(row.uint_value(6)?, &with_label(&labels, "10sec"))?,
            self.std_dev_backup_lcp_speed.metric(row.uint_value(10)?, &with_label(&labels, "60sec"))?,
            self.std_dev_redo_speed.metric(row.uint_value(7)?, &with_label(&labels, "10sec"))?,
            self.std_dev_redo_speed.metric(row.uint_value(11)?, &with_label(&labels, "60sec"))?,
            self.slowdowns.metric(row.uint_value(12)?, &with_label(&labels, "io_lag"))?,
            self.slowdowns.metric(row.uint_value(13)?, &with_label(&labels, "high_cpu"))?,
            self.set_to_min.metric(row.uint_value(14)?, &labels)?,
            self.current_target.metric(row.uint_value(15)?, &labels)?,
        ])
    }
}

impl Scraper for DiskWriteSpeedAggregateScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.disk_write_speed_aggregate"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.disk_write_speed_aggregate"
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
            scrape_rows(ctx, db, sink, DISK_WRITE_SPEED_AGGREGATE_QUERY, |row| {
                self.row_metrics(row)
            })
            .await?;
            Ok(())
        })
    }
}
