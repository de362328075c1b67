use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const THREAD_STAT_QUERY: &str = r"
    SELECT
        node_id,
        thr_no,
        thr_nm,
        c_loop,
        c_exec,
        c_wait,
        c_l_sent_prioa,
        c_l_sent_priob,
        c_r_sent_prioa,
        c_r_sent_priob,
        os_tid,
        os_ru_utime,
        os_ru_stime,
        os_ru_minflt,
        os_ru_majflt,
        os_ru_nvcsw,
        os_ru_nivcsw
    FROM ndbinfo.threadstat
";

/// (column index, `action` label); the label is the column name.
const LOOP_COUNTERS: [(usize, &str); 7] = [
    (3, "c_loop"),
    (4, "c_exec"),
    (5, "c_wait"),
    (6, "c_l_sent_prioa"),
    (7, "c_l_sent_priob"),
    (8, "c_r_sent_prioa"),
    (9, "c_r_sent_priob"),
];

const OS_TID: usize = 10;

const CPU_TIME: [(usize, &str); 2] = [(11, "os_ru_utime"), (12, "os_ru_stime")];

const OS_COUNTERS: [(usize, &str); 4] = [
    (13, "os_ru_minflt"),
    (14, "os_ru_majflt"),
    (15, "os_ru_nvcsw"),
    (16, "os_ru_nivcsw"),
];

#[derive(Clone)]
pub struct ThreadStatScraper {
    total: Arc<MetricDesc>,
    os_tid: Arc<MetricDesc>,
    time_total: Arc<MetricDesc>,
}

impl Default for ThreadStatScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreadStatScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            total: static_desc(
                SUBSYSTEM,
                "threadstat_total",
                "The amount of actions by node_id/thr_no/thr_nm/action.",
                &["node_id", "thr_no", "thr_nm", "action"],
                ValueType::Counter,
            ),
            os_tid: static_desc(
                SUBSYSTEM,
                "threadstat_os_tid",
                "The operating system thread ID for node_id/thr_no/thr_nm.",
                &["node_id", "thr_no", "thr_nm"],
                ValueType::Gauge,
            ),
            time_total: static_desc(
                SUBSYSTEM,
                "threadstat_time_total",
                "The action CPU time in microseconds for the thread by node_id/thr_no/thr_nm/action.",
                &["node_id", "thr_no", "thr_nm", "action"],
                ValueType::Counter,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a numeric column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;
        let thr_no = row.text(1)?;
        let thr_nm = row.text(2)?;
        let thread = [node_id.as_str(), thr_no.as_str(), thr_nm.as_str()];

        let mut metrics = Vec::with_capacity(14);

        for (idx, action) in LOOP_COUNTERS {
            metrics.push(self.total.metric(row.uint_value(idx)?, &with_action(thread, action))?);
        }

        metrics.push(self.os_tid.metric(row.uint_value(OS_TID)?, &thread)?);

        for (idx, action) in CPU_TIME {
            metrics.push(
                self.time_total
                    .metric(row.uint_value(idx)?, &with_action(thread, action))?,
            );
        }

        for (idx, action) in OS_COUNTERS {
            metrics.push(self.total.metric(row.uint_value(idx)?, &with_action(thread, action))?);
        }

        Ok(metrics)
    }
}

fn with_action<'a>(thread: [&'a str; 3], action: &'a str) -> [&'a str; 4] {
    let [node_id, thr_no, thr_nm] = thread;
    [node_id, thr_no, thr_nm, action]
}

impl Scraper for ThreadStatScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.threadstat"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.threadstat"
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
            scrape_rows(ctx, db, sink, THREAD_STAT_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
