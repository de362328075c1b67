use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::{fq_name, static_desc};
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, NAMESPACE, ScrapeContext, ScrapeError,
    Scraper, ValueType,
};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

const COUNTERS_QUERY: &str = r"
    SELECT
        node_id,
        counter_name,
        val
    FROM ndbinfo.counters
";

/// Upper bound on cached fallback descriptors; past it they are built per row.
const FALLBACK_CACHE_LIMIT: usize = 256;

/// `counter_name` → (metric name, help).
const KNOWN_COUNTERS: &[(&str, &str, &str)] = &[
    ("ATTRINFO", "counters_attrinfo_total", "The number of times an interpreted program is sent to the data node by node_id."),
    ("TRANSACTIONS", "counters_transactions_total", "The total number of transactions initiated by node_id."),
    ("COMMITS", "counters_commits_total", "The number of transactions that have been committed by node_id."),
    ("READS", "counters_reads_total", "The amount of all read operations by node_id."),
    ("SIMPLE_READS", "counters_simple_reads_total", "The amount of reads where the is both the beginning and ending operation for a given transaction by node_id."),
    ("WRITES", "counters_writes_total", "The amount of the writes by node_id."),
    ("ABORTS", "counters_aborts_total", "The amount of transactions that have been aborted by node_id."),
    ("TABLE_SCANS", "counters_table_scans_total", "The amount of table scan operations performed by node_id."),
    ("RANGE_SCANS", "counters_range_scans_total", "The amount of range scan operations performed by node_id."),
    ("OPERATIONS", "counters_operations_total", "The amount of operations processed by node_id."),
    ("READS_RECEIVED", "counters_reads_received_total", "The amount of read requests received by node_id."),
    ("LOCAL_READS_SENT", "counters_local_reads_sent_total", "The amount of local read requests sent by node_id."),
    ("REMOTE_READS_SENT", "counters_remote_reads_sent_total", "The amount of remote read requests sent by node_id."),
    ("READS_NOT_FOUND", "counters_reads_not_found_total", "The amount of read requests that did not find a matching record by node_id."),
    ("TABLE_SCANS_RECEIVED", "counters_table_scans_received_total", "The amount of table scan requests received by node_id."),
    ("LOCAL_TABLE_SCANS_SENT", "counters_local_table_scans_sent_total", "The amount of local table scan requests sent by node_id."),
    ("RANGE_SCANS_RECEIVED", "counters_range_scans_received_total", "The amount of range scan requests received by node_id."),
    ("LOCAL_RANGE_SCANS_SENT", "counters_local_range_scans_sent_total", "The amount of local range scan requests sent by node_id."),
    ("REMOTE_RANGE_SCANS_SENT", "counters_remote_range_scans_sent_total", "The amount of remote range scan requests sent by node_id."),
    ("SCAN_BATCHES_RETURNED", "counters_scan_batches_returned_total", "The amount of scan batches returned by node_id."),
    ("SCAN_ROWS_RETURNED", "counters_scan_rows_returned_total", "The amount of rows returned by scan operations by node_id."),
    ("PRUNED_RANGE_SCANS_RECEIVED", "counters_pruned_range_scans_received_total", "The amount of pruned range scan requests received by node_id."),
    ("CONST_PRUNED_RANGE_SCANS_RECEIVED", "counters_const_pruned_range_scans_received_total", "The amount of constant pruned range scan requests received by node_id."),
    ("LOCAL_READS", "counters_local_reads_total", "The amount of only those reads of the primary fragment replica on the same node as the transaction coordinator by node_id."),
    ("LOCAL_WRITES", "counters_local_writes_total", "The amount of primary-key write operations using a transaction coordinator in a node that also holds the primary fragment replica of the record by node_id."),
    ("LQHKEY_OVERLOAD", "counters_lqhkey_overload_total", "The amount of primary key requests rejected at the LQH block instance due to transporter overload by node_id."),
    ("LQHKEY_OVERLOAD_TC", "counters_lqhkey_overload_tc_total", "The amount of instances where the TC node transporter was overloaded by node_id."),
    ("LQHKEY_OVERLOAD_READER", "counters_lqhkey_overload_reader_total", "The amount of instances where the API reader (reads only) node was overloaded by node_id."),
    ("LQHKEY_OVERLOAD_NODE_PEER", "counters_lqhkey_overload_node_peer_total", "The amount of instances where the next backup data node (writes only) was overloaded by node_id."),
    ("LQHKEY_OVERLOAD_SUBSCRIBER", "counters_lqhkey_overload_subscriber_total", "The amount of instances where an event subscriber (writes only) was overloaded by node_id."),
    ("LQHSCAN_SLOWDOWNS", "counters_lqhkey_slowdowns_total", "The amount of instances where a fragment scan batch size was reduced due to scanning API transporter overload by node_id."),
];

/// Block-level operation counters per data node.
///
/// Known `counter_name` values map to typed counters. Anything else is
/// exposed as an untyped `mysql_ndbinfo_counter_<name>` whose descriptor is
/// cached across cycles.
#[derive(Clone)]
pub struct CountersScraper {
    known: Arc<HashMap<&'static str, Arc<MetricDesc>>>,
    fallback: Arc<RwLock<HashMap<String, Arc<MetricDesc>>>>,
}

impl Default for CountersScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl CountersScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let known: HashMap<_, _> = KNOWN_COUNTERS
            .iter()
            .map(|&(counter, name, help)| {
                (counter, static_desc(SUBSYSTEM, name, help, &["node_id"], ValueType::Counter))
            })
            .collect();

        Self {
            known: Arc::new(known),
            fallback: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if `val` is not an unsigned integer, or a
    /// metric error if the counter name cannot form a valid metric name.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;
        let counter_name = row.text(1)?;
        let value = row.uint_value(2)?;

        let desc = match self.known.get(counter_name.as_str()) {
            Some(desc) => Arc::clone(desc),
            None => self.fallback_desc(&counter_name)?,
        };

        Ok(vec![desc.metric(value, &[node_id.as_str()])?])
    }

    fn fallback_desc(&self, counter_name: &str) -> Result<Arc<MetricDesc>, ScrapeError> {
        if let Some(desc) = self
            .fallback
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(counter_name)
        {
            return Ok(Arc::clone(desc));
        }

        let desc = MetricDesc::untyped(
            fq_name(NAMESPACE, SUBSYSTEM, &format!("counter_{}", sanitize(counter_name))),
            format!("Unsupported metric from column {counter_name}"),
            &["node_id"],
        )?;

        let mut cache = self.fallback.write().unwrap_or_else(PoisonError::into_inner);
        if cache.len() < FALLBACK_CACHE_LIMIT {
            debug!(counter = counter_name, "caching descriptor for unknown counter");
            let cached = cache
                .entry(counter_name.to_string())
                .or_insert_with(|| Arc::clone(&desc));
            return Ok(Arc::clone(cached));
        }
        drop(cache);

        warn!(
            counter = counter_name,
            limit = FALLBACK_CACHE_LIMIT,
            "unknown counter cache full; descriptor not cached"
        );
        Ok(desc)
    }
}

/// Lowercase and replace anything outside `[a-z0-9_]` with `_`.
fn sanitize(counter_name: &str) -> String {
    counter_name
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' }
        })
        .collect()
}

impl Scraper for CountersScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.counters"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.counters"
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
            scrape_rows(ctx, db, sink, COUNTERS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }

    fn enabled_by_default(&self) -> bool {
        true
    }
}
