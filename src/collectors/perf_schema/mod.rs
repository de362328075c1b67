//! Scrapers for NDB binlog sync tables in `performance_schema`.

use super::EngineVersion;

mod ndb_sync_excluded_objects;
mod ndb_sync_pending_objects;

pub use ndb_sync_excluded_objects::NdbSyncExcludedObjectsScraper;
pub use ndb_sync_pending_objects::NdbSyncPendingObjectsScraper;

pub const SUBSYSTEM: &str = "perf_schema";

pub const MIN_VERSION: EngineVersion = EngineVersion::new(8, 0, 0);
