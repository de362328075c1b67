use super::SUBSYSTEM;
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const TRANSPORTER_DETAILS_QUERY: &str = r"
    SELECT
        node_id,
        trp_id,
        remote_node_id,
        status,
        remote_address,
        bytes_sent,
        bytes_received,
        connect_count,
        overloaded,
        overload_count,
        slowdown,
        slowdown_count,
        encrypted,
        sendbuffer_used_bytes,
        sendbuffer_max_used_bytes,
        sendbuffer_alloc_bytes,
        sendbuffer_max_alloc_bytes,
        type
    FROM ndbinfo.transporter_details
";

/// Multi-transporter details, including send buffer usage.
///
/// Only available from 8.4 on. Columns are read in query order.
#[derive(Clone)]
pub struct TransporterDetailsScraper {
    bytes: Arc<MetricDesc>,
    count: Arc<MetricDesc>,
    state: Arc<MetricDesc>,
    sendbuffer: Arc<MetricDesc>,
}

impl Default for TransporterDetailsScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl TransporterDetailsScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let action = [
            "node_id",
            "trp_id",
            "remote_node_id",
            "status",
            "remote_address",
            "type",
            "action",
        ];
        let state = [
            "node_id",
            "trp_id",
            "remote_node_id",
            "status",
            "remote_address",
            "type",
            "state",
        ];
        Self {
            bytes: static_desc(
                SUBSYSTEM,
                "transporter_details_bytes_total",
                "Number of bytes sent/received using this transporter by node_id/trp_id/remote_node_id/status/remote_address/type/action.",
                &action,
                ValueType::Counter,
            ),
            count: static_desc(
                SUBSYSTEM,
                "transporter_details_count_total",
                "Number of times connected/overloaded/slowdown on this transporter by node_id/trp_id/remote_node_id/status/remote_address/type/action.",
                &action,
                ValueType::Counter,
            ),
            state: static_desc(
                SUBSYSTEM,
                "transporter_details_state",
                "1 if this transporter is currently in overload/slowdown/encrypted state, otherwise 0 by node_id/trp_id/remote_node_id/status/remote_address/type/state.",
                &state,
                ValueType::Gauge,
            ),
            sendbuffer: static_desc(
                SUBSYSTEM,
                "transporter_details_sendbuffer_bytes",
                "Send buffer usage in bytes for this transporter by node_id/trp_id/remote_node_id/status/remote_address/type/action.",
                &action,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a numeric column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let node_id = row.text(0)?;
        let trp_id = row.text(1)?;
        let remote_node_id = row.text(2)?;
        let status = row.text(3)?;
        let remote_address = row.text(4)?;
        let kind = row.text(17)?;
        let prefix = [
            node_id.as_str(),
            trp_id.as_str(),
            remote_node_id.as_str(),
            status.as_str(),
            remote_address.as_str(),
            kind.as_str(),
        ];
        let labels = |last: &'static str| {
            let mut labels = prefix.to_vec();
            labels.push(last);
            labels
        };

        let mut metrics = vec![
            self.bytes.metric(row.uint_value(5)?, &labels("sent"))?,
            self.bytes.metric(row.uint_value(6)?, &labels("received"))?,
            self.count.metric(row.uint_value(7)?, &labels("connect"))?,
            self.state.metric(row.uint_value(8)?, &labels("overload"))?,
            self.count.metric(row.uint_value(9)?, &labels("overload"))?,
            self.state.metric(row.uint_value(10)?, &labels("slowdown"))?,
            self.count.metric(row.uint_value(11)?, &labels("slowdown"))?,
            self.state.metric(row.uint_value(12)?, &labels("encrypted"))?,
        ];

        for (idx, action) in [(13, "used"), (14, "max_used"), (15, "alloc"), (16, "max_alloc")] {
            metrics.push(self.sendbuffer.metric(row.uint_value(idx)?, &labels(action))?);
        }

        Ok(metrics)
    }
}

impl Scraper for TransporterDetailsScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.transporter_details"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.transporter_details"
    }

    fn min_version(&self) -> EngineVersion {
        EngineVersion::new(8, 4, 0)
    }

    fn scrape<'a>(
        &'a self,
        ctx: &'a ScrapeContext,
        db: &'a dyn Database,
        sink: &'a MetricSink,
    ) -> BoxFuture<'a, Result<(), ScrapeError>> {
        Box::pin(async move {
            scrape_rows(ctx, db, sink, TRANSPORTER_DETAILS_QUERY, |row| {
                self.row_metrics(row)
            })
            .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;
    use crate::collectors::database::Value;

    fn find<'a>(metrics: &'a [Metric], name: &str, label: &str, value: &str) -> &'a Metric {
        metrics
            .iter()
            .find(|m| m.name() == name && m.label(label) == Some(value))
            .expect("metric present")
    }

    #[test]
    fn test_columns_follow_query_order() {
        let scraper = TransporterDetailsScraper::new();
        let columns = (0..18).map(|i| format!("c{i}")).collect();
        let mut values = vec![
            Value::UInt(1),
            Value::UInt(0),
            Value::UInt(2),
            Value::from("CONNECTED"),
            Value::from("10.0.0.2"),
        ];
        // bytes_sent .. sendbuffer_max_alloc_bytes carry 105..=116
        values.extend((105..=116_u64).map(Value::UInt));
        values.push(Value::from("TCP"));

        let metrics = scraper
            .row_metrics(&Row::new(columns, values))
            .expect("valid row");

        assert_eq!(metrics.len(), 12);
        let sent = find(&metrics, "mysql_ndbinfo_transporter_details_bytes_total", "action", "sent");
        assert!((sent.value() - 105.0).abs() < f64::EPSILON);
        assert_eq!(sent.label("type"), Some("TCP"));
        assert_eq!(sent.label("trp_id"), Some("0"));

        let encrypted = find(&metrics, "mysql_ndbinfo_transporter_details_state", "state", "encrypted");
        assert!((encrypted.value() - 112.0).abs() < f64::EPSILON);

        let max_alloc = find(
            &metrics,
            "mysql_ndbinfo_transporter_details_sendbuffer_bytes",
            "action",
            "max_alloc",
        );
        assert!((max_alloc.value() - 116.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_requires_8_4() {
        let scraper = TransporterDetailsScraper::new();
        assert_eq!(scraper.min_version(), EngineVersion::new(8, 4, 0));
        assert!(!scraper.enabled_by_default());
    }
}
