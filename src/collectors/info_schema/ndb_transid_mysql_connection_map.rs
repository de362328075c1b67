use super::SUBSYSTEM;
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const CONNECTION_MAP_QUERY: &str = r"
    SELECT
        mysql_connection_id,
        node_id,
        ndb_transid
    FROM information_schema.ndb_transid_mysql_connection_map
";

/// One series with value `1` per open NDB transaction, keyed by the SQL
/// connection that owns it.
#[derive(Clone)]
pub struct NdbTransidMysqlConnectionMapScraper {
    connection: Arc<MetricDesc>,
}

impl Default for NdbTransidMysqlConnectionMapScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl NdbTransidMysqlConnectionMapScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            connection: static_desc(
                SUBSYSTEM,
                "ndb_transid_mysql_connection_map",
                "NDB connections by mysql_connection_id/node_id/ndb_transid. Returns 1 if query is successful.",
                &["mysql_connection_id", "node_id", "ndb_transid"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if the row is shorter than expected.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let connection_id = row.text(0)?;
        let node_id = row.text(1)?;
        let transid = row.text(2)?;

        Ok(vec![self.connection.metric(
            1.0,
            &[connection_id.as_str(), node_id.as_str(), transid.as_str()],
        )?])
    }
}

impl Scraper for NdbTransidMysqlConnectionMapScraper {
    fn name(&self) -> &'static str {
        "info_schema.ndb_transid_mysql_connection_map"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from information_schema.ndb_transid_mysql_connection_map"
    }

    fn min_version(&self) -> EngineVersion {
        EngineVersion::new(5, 1, 0)
    }

    fn scrape<'a>(
        &'a self,
        ctx: &'a ScrapeContext,
        db: &'a dyn Database,
        sink: &'a MetricSink,
    ) -> BoxFuture<'a, Result<(), ScrapeError>> {
        Box::pin(async move {
            scrape_rows(ctx, db, sink, CONNECTION_MAP_QUERY, |row| self.row_metrics(row)).await?;
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
    fn test_presence_metric() {
        let scraper = NdbTransidMysqlConnectionMapScraper::new();
        let columns = ["mysql_connection_id", "node_id", "ndb_transid"]
            .iter()
            .map(ToString::to_string)
            .collect();
        let row = Row::new(
            columns,
            vec![Value::UInt(12), Value::UInt(3), Value::UInt(8_589_934_595)],
        );

        let metrics = scraper.row_metrics(&row).expect("valid row");

        assert_eq!(metrics[0].name(), "mysql_info_schema_ndb_transid_mysql_connection_map");
        assert!((metrics[0].value() - 1.0).abs() < f64::EPSILON);
        assert_eq!(metrics[0].label("ndb_transid"), Some("8589934595"));
    }

    #[test]
    fn test_available_on_old_servers() {
        let scraper = NdbTransidMysqlConnectionMapScraper::new();
        assert!(scraper.min_version() <= EngineVersion::MINIMUM_SUPPORTED);
    }
}
