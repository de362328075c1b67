use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const HWINFO_QUERY: &str = r"
    SELECT
        node_id,
        cpu_cnt_max,
        cpu_cnt,
        num_cpu_cores,
        num_cpu_sockets,
        HW_memory_size,
        model_name
    FROM ndbinfo.hwinfo
";

/// Hardware of the host each data node runs on.
#[derive(Clone)]
pub struct HwInfoScraper {
    cpu_cnt_max: Arc<MetricDesc>,
    cpu_cnt: Arc<MetricDesc>,
    cpu_cores: Arc<MetricDesc>,
    cpu_sockets: Arc<MetricDesc>,
    memory_size: Arc<MetricDesc>,
}

impl Default for HwInfoScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl HwInfoScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["node_id", "model_name"];
        Self {
            cpu_cnt_max: static_desc(
                SUBSYSTEM,
                "hwinfo_cpu_cnt_max",
                "The amount of processors on host by node_id/model_name.",
                &labels,
                ValueType::Gauge,
            ),
            cpu_cnt: static_desc(
                SUBSYSTEM,
                "hwinfo_cpu_cnt",
                "The amount of processors allocated by node_id/model_name.",
                &labels,
                ValueType::Gauge,
            ),
            cpu_cores: static_desc(
                SUBSYSTEM,
                "hwinfo_num_cpu_cores",
                "The amount of CPU cores on this host by node_id/model_name.",
                &labels,
                ValueType::Gauge,
            ),
            cpu_sockets: static_desc(
                SUBSYSTEM,
                "hwinfo_num_cpu_sockets",
                "The amount of sockets on this host by node_id/model_name.",
                &labels,
                ValueType::Gauge,
            ),
            memory_size: static_desc(
                SUBSYSTEM,
                "hwinfo_hw_memory_size",
                "The amount of memory available on this host by node_id/model_name.",
                &labels,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 6])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.cpu_cnt_max.metric(row.uint_value(1)?, &labels)?,
            self.cpu_cnt.metric(row.uint_value(2)?, &labels)?,
            self.cpu_cores.metric(row.uint_value(3)?, &labels)?,
            self.cpu_sockets.metric(row.uint_value(4)?, &labels)?,
            self.memory_size.metric(row.uint_value(5)?, &labels)?,
        ])
    }
}

impl Scraper for HwInfoScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.hwinfo"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.hwinfo"
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
            scrape_rows(ctx, db, sink, HWINFO_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
