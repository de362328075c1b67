use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[macro_use]
mod register_macro;

pub mod config;
pub mod database;
pub mod driver;
pub mod error;
pub mod exporter;
pub mod exposition;
pub mod metric;
pub mod registry;
pub mod version;

pub use database::Database;
pub use error::{MetricError, RegistryError, ScrapeError};
pub use metric::{Metric, MetricDesc, MetricSink, ValueType};
pub use version::EngineVersion;

/// Metric namespace shared by every scraper.
pub const NAMESPACE: &str = "mysql";

/// One diagnostic source: a fixed query and a fixed mapping from result
/// columns to metrics.
///
/// Implementations are stateless apart from their descriptors and may be
/// scraped concurrently from several cycles.
pub trait Scraper: Send + Sync {
    /// Unique, stable name, namespaced by source table (e.g. `ndbinfo.nodes`).
    fn name(&self) -> &'static str;

    fn help(&self) -> &'static str;

    /// Lowest engine version where the backing table exists.
    fn min_version(&self) -> EngineVersion;

    /// Run the query and send the resulting metrics to `sink`.
    ///
    /// Must return promptly once `ctx` is cancelled or its deadline passes.
    fn scrape<'a>(
        &'a self,
        ctx: &'a ScrapeContext,
        db: &'a dyn Database,
        sink: &'a MetricSink,
    ) -> BoxFuture<'a, Result<(), ScrapeError>>;

    fn enabled_by_default(&self) -> bool {
        false
    }
}

/// Cancellation, deadline and engine version for one scrape cycle.
#[derive(Clone, Debug)]
pub struct ScrapeContext {
    token: CancellationToken,
    deadline: Option<Instant>,
    engine_version: EngineVersion,
}

impl ScrapeContext {
    #[must_use]
    pub fn new(engine_version: EngineVersion) -> Self {
        Self {
            token: CancellationToken::new(),
            deadline: None,
            engine_version,
        }
    }

    /// Tie this context to an external cancellation token.
    #[must_use]
    pub fn with_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Keeps the earlier of the current and the given deadline.
    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(self.deadline.map_or(deadline, |d| d.min(deadline)));
        self
    }

    /// Context cancelled together with this one, but also on its own.
    #[must_use]
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
            engine_version: self.engine_version,
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    #[must_use]
    pub const fn token(&self) -> &CancellationToken {
        &self.token
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    #[must_use]
    pub const fn engine_version(&self) -> EngineVersion {
        self.engine_version
    }

    /// Non-blocking check: the reason this context is finished, if it is.
    #[must_use]
    pub fn check(&self) -> Option<ScrapeError> {
        if self.token.is_cancelled() {
            Some(ScrapeError::Cancelled)
        } else if self.deadline.is_some_and(|d| Instant::now() >= d) {
            Some(ScrapeError::DeadlineExceeded)
        } else {
            None
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ScrapeError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                () = self.token.cancelled() => ScrapeError::Cancelled,
                () = tokio::time::sleep_until(deadline) => ScrapeError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ScrapeError::Cancelled
            }
        }
    }
}

pub mod info_schema;
pub mod ndbinfo;
pub mod perf_schema;

register_scrapers! {
    "ndbinfo.arbitrator_validity_detail" => ndbinfo::ArbitratorValidityDetailScraper,
    "ndbinfo.arbitrator_validity_summary" => ndbinfo::ArbitratorValiditySummaryScraper,
    "ndbinfo.backup_id" => ndbinfo::BackupIdScraper,
    "ndbinfo.blobs" => ndbinfo::BlobsScraper,
    "ndbinfo.cluster_locks" => ndbinfo::ClusterLocksScraper,
    "ndbinfo.cluster_operations" => ndbinfo::ClusterOperationsScraper,
    "ndbinfo.cluster_transactions" => ndbinfo::ClusterTransactionsScraper,
    "ndbinfo.counters" => ndbinfo::CountersScraper,
    "ndbinfo.cpudata" => ndbinfo::CpuDataScraper,
    "ndbinfo.cpuinfo" => ndbinfo::CpuInfoScraper,
    "ndbinfo.cpustat" => ndbinfo::CpuStatScraper,
    "ndbinfo.dict_obj_info" => ndbinfo::DictObjInfoScraper,
    "ndbinfo.dict_obj_tree" => ndbinfo::DictObjTreeScraper,
    "ndbinfo.dict_obj_types" => ndbinfo::DictObjTypesScraper,
    "ndbinfo.disk_write_speed_aggregate" => ndbinfo::DiskWriteSpeedAggregateScraper,
    "ndbinfo.diskpagebuffer" => ndbinfo::DiskPageBufferScraper,
    "ndbinfo.diskstat" => ndbinfo::DiskStatScraper,
    "ndbinfo.files" => ndbinfo::FilesScraper,
    "ndbinfo.foreign_keys" => ndbinfo::ForeignKeysScraper,
    "ndbinfo.hash_maps" => ndbinfo::HashMapsScraper,
    "ndbinfo.hwinfo" => ndbinfo::HwInfoScraper,
    "ndbinfo.index_stats" => ndbinfo::IndexStatsScraper,
    "ndbinfo.locks_per_fragment" => ndbinfo::LocksPerFragmentScraper,
    "ndbinfo.logbuffers" => ndbinfo::LogBuffersScraper,
    "ndbinfo.logspaces" => ndbinfo::LogSpacesScraper,
    "ndbinfo.memory_per_fragment" => ndbinfo::MemoryPerFragmentScraper,
    "ndbinfo.memoryusage" => ndbinfo::MemoryUsageScraper,
    "ndbinfo.nodes" => ndbinfo::NodesScraper,
    "ndbinfo.operations_per_fragment" => ndbinfo::OperationsPerFragmentScraper,
    "ndbinfo.pgman_time_track_stats" => ndbinfo::PgmanTimeTrackStatsScraper,
    "ndbinfo.processes" => ndbinfo::ProcessesScraper,
    "ndbinfo.resources" => ndbinfo::ResourcesScraper,
    "ndbinfo.restart_info" => ndbinfo::RestartInfoScraper,
    "ndbinfo.server_locks" => ndbinfo::ServerLocksScraper,
    "ndbinfo.server_operations" => ndbinfo::ServerOperationsScraper,
    "ndbinfo.server_transactions" => ndbinfo::ServerTransactionsScraper,
    "ndbinfo.table_distribution_status" => ndbinfo::TableDistributionStatusScraper,
    "ndbinfo.table_fragments" => ndbinfo::TableFragmentsScraper,
    "ndbinfo.table_info" => ndbinfo::TableInfoScraper,
    "ndbinfo.table_replicas" => ndbinfo::TableReplicasScraper,
    "ndbinfo.tc_time_track_stats" => ndbinfo::TcTimeTrackStatsScraper,
    "ndbinfo.threadblocks" => ndbinfo::ThreadBlocksScraper,
    "ndbinfo.threads" => ndbinfo::ThreadsScraper,
    "ndbinfo.threadstat" => ndbinfo::ThreadStatScraper,
    "ndbinfo.transporter_details" => ndbinfo::TransporterDetailsScraper,
    "ndbinfo.transporters" => ndbinfo::TransportersScraper,
    "info_schema.ndb_transid_mysql_connection_map" => info_schema::NdbTransidMysqlConnectionMapScraper,
    "perf_schema.ndb_sync_excluded_objects" => perf_schema::NdbSyncExcludedObjectsScraper,
    "perf_schema.ndb_sync_pending_objects" => perf_schema::NdbSyncPendingObjectsScraper,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_done_resolves_on_cancel() {
        let ctx = ScrapeContext::new(EngineVersion::new(8, 0, 0));
        assert!(ctx.check().is_none());

        ctx.cancel();
        assert!(matches!(ctx.done().await, ScrapeError::Cancelled));
        assert!(matches!(ctx.check(), Some(ScrapeError::Cancelled)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_done_resolves_on_deadline() {
        let ctx = ScrapeContext::new(EngineVersion::new(8, 0, 0)).with_timeout(Duration::from_secs(5));

        assert!(matches!(ctx.done().await, ScrapeError::DeadlineExceeded));
        assert!(matches!(ctx.check(), Some(ScrapeError::DeadlineExceeded)));
    }

    #[test]
    fn test_with_deadline_keeps_earliest() {
        let now = Instant::now();
        let ctx = ScrapeContext::new(EngineVersion::MINIMUM_SUPPORTED)
            .with_deadline(now + Duration::from_secs(1))
            .with_deadline(now + Duration::from_secs(10));

        assert_eq!(ctx.deadline(), Some(now + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_child_cancelled_with_parent() {
        let parent = ScrapeContext::new(EngineVersion::MINIMUM_SUPPORTED);
        let child = parent.child();

        parent.cancel();
        assert!(matches!(child.done().await, ScrapeError::Cancelled));
    }
}
