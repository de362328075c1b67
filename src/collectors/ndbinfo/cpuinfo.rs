use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const CPUINFO_QUERY: &str = r"
    SELECT
        node_id,
        cpu_no,
        cpu_online,
        core_id,
        socket_id
    FROM ndbinfo.cpuinfo
";

#[derive(Clone)]
pub struct CpuInfoScraper {
    online: Arc<MetricDesc>,
}

impl Default for CpuInfoScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuInfoScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            online: static_desc(
                SUBSYSTEM,
                "cpuinfo_cpu_online",
                "The status of CPU by node_id/cpu_no/core_id/socket_id. 1 if the CPU is online, otherwise 0.",
                &["node_id", "cpu_no", "core_id", "socket_id"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 1, 3, 4])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![self.online.metric(row.uint_value(2)?, &labels)?])
    }
}

impl Scraper for CpuInfoScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.cpuinfo"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.cpuinfo"
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
            scrape_rows(ctx, db, sink, CPUINFO_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
