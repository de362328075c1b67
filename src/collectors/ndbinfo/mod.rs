//! Scrapers for the `ndbinfo` database.

use super::EngineVersion;

mod arbitrator_validity_detail;
mod arbitrator_validity_summary;
mod backup_id;
mod blobs;
mod cluster_locks;
mod cluster_transactions;
mod counters;
mod cpudata;
mod cpuinfo;
mod cpustat;
mod dict_obj_info;
mod dict_obj_tree;
mod dict_obj_types;
mod disk_write_speed_aggregate;
mod diskpagebuffer;
mod diskstat;
mod files;
mod foreign_keys;
mod hash_maps;
mod hwinfo;
mod index_stats;
mod locks_per_fragment;
mod logbuffers;
mod logspaces;
mod memory_per_fragment;
mod memoryusage;
mod nodes;
mod operations;
mod operations_per_fragment;
mod pgman_time_track_stats;
mod processes;
mod resources;
mod restart_info;
mod server_locks;
mod server_transactions;
mod table_distribution_status;
mod table_fragments;
mod table_info;
mod table_replicas;
mod tc_time_track_stats;
mod threadblocks;
mod threads;
mod threadstat;
mod transporter_details;
mod transporters;

pub use arbitrator_validity_detail::ArbitratorValidityDetailScraper;
pub use arbitrator_validity_summary::ArbitratorValiditySummaryScraper;
pub use backup_id::BackupIdScraper;
pub use blobs::BlobsScraper;
pub use cluster_locks::ClusterLocksScraper;
pub use cluster_transactions::ClusterTransactionsScraper;
pub use counters::CountersScraper;
pub use cpudata::CpuDataScraper;
pub use cpuinfo::CpuInfoScraper;
pub use cpustat::CpuStatScraper;
pub use dict_obj_info::DictObjInfoScraper;
pub use dict_obj_tree::DictObjTreeScraper;
pub use dict_obj_types::DictObjTypesScraper;
pub use disk_write_speed_aggregate::DiskWriteSpeedAggregateScraper;
pub use diskpagebuffer::DiskPageBufferScraper;
pub use diskstat::DiskStatScraper;
pub use files::FilesScraper;
pub use foreign_keys::ForeignKeysScraper;
pub use hash_maps::HashMapsScraper;
pub use hwinfo::HwInfoScraper;
pub use index_stats::IndexStatsScraper;
pub use locks_per_fragment::LocksPerFragmentScraper;
pub use logbuffers::LogBuffersScraper;
pub use logspaces::LogSpacesScraper;
pub use memory_per_fragment::MemoryPerFragmentScraper;
pub use memoryusage::MemoryUsageScraper;
pub use nodes::NodesScraper;
pub use operations::{ClusterOperationsScraper, ServerOperationsScraper};
pub use operations_per_fragment::OperationsPerFragmentScraper;
pub use pgman_time_track_stats::PgmanTimeTrackStatsScraper;
pub use processes::ProcessesScraper;
pub use resources::ResourcesScraper;
pub use restart_info::RestartInfoScraper;
pub use server_locks::ServerLocksScraper;
pub use server_transactions::ServerTransactionsScraper;
pub use table_distribution_status::TableDistributionStatusScraper;
pub use table_fragments::TableFragmentsScraper;
pub use table_info::TableInfoScraper;
pub use table_replicas::TableReplicasScraper;
pub use tc_time_track_stats::TcTimeTrackStatsScraper;
pub use threadblocks::ThreadBlocksScraper;
pub use threads::ThreadsScraper;
pub use threadstat::ThreadStatScraper;
pub use transporter_details::TransporterDetailsScraper;
pub use transporters::TransportersScraper;

pub const SUBSYSTEM: &str = "ndbinfo";

/// Most `ndbinfo` tables exist from 8.0 on.
pub const MIN_VERSION: EngineVersion = EngineVersion::new(8, 0, 0);

/// `labels` followed by one more label value.
pub(crate) fn with_label<'a>(labels: &[&'a str], extra: &'a str) -> Vec<&'a str> {
    let mut values = Vec::with_capacity(labels.len() + 1);
    values.extend_from_slice(labels);
    values.push(extra);
    values
}
