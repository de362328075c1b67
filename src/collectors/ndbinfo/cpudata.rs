use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const CPUDATA_QUERY: &str = r"
    SELECT
        node_id,
        cpu_no,
        cpu_online,
        cpu_userspace_time,
        cpu_idle_time,
        cpu_system_time,
        cpu_interrupt_time,
        cpu_exec_vm_time
    FROM ndbinfo.cpudata
";

#[derive(Clone)]
pub struct CpuDataScraper {
    online: Arc<MetricDesc>,
    time: Arc<MetricDesc>,
}

impl Default for CpuDataScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuDataScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            online: static_desc(
                SUBSYSTEM,
                "cpudata_cpu_online",
                "The status of CPU by node_id/cpu_no. 1 if the CPU is currently online, otherwise 0.",
                &["node_id", "cpu_no"],
                ValueType::Gauge,
            ),
            time: static_desc(
                SUBSYSTEM,
                "cpudata_cpu_time",
                "The amount of time the CPUs spent in each mode during last second by node_id/cpu_no/mode.",
                &["node_id", "cpu_no", "mode"],
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
            self.online.metric(row.uint_value(2)?, &labels)?,
            self.time.metric(row.uint_value(3)?, &with_label(&labels, "userspace"))?,
            self.time.metric(row.uint_value(4)?, &with_label(&labels, "idle"))?,
            self.time.metric(row.uint_value(5)?, &with_label(&labels, "system"))?,
            self.time.metric(row.uint_value(6)?, &with_label(&labels, "interrupt"))?,
            self.time.metric(row.uint_value(7)?, &with_label(&labels, "exec_vm"))?,
        ])
    }
}

impl Scraper for CpuDataScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.cpudata"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.cpudata"
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
            scrape_rows(ctx, db, sink, CPUDATA_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
