//! Metric model shared by every scraper.
//!
//! A [`MetricDesc`] is built once when a scraper is constructed and held as a
//! private field; each scrape turns result rows into [`Metric`] values and
//! hands them to the [`MetricSink`].

use super::NAMESPACE;
use super::error::MetricError;
use prometheus::core::Desc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueType {
    Counter,
    Gauge,
    Untyped,
}

impl ValueType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Untyped => "untyped",
        }
    }
}

/// Join non-empty parts with `_` (e.g. `mysql`, `ndbinfo`, `nodes_uptime_total`).
#[must_use]
pub fn fq_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|part| !part.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

/// Static metadata for one metric family.
///
/// Wraps a [`prometheus::core::Desc`], so a descriptor the exposition
/// registry would reject is rejected here already.
#[derive(Clone, Debug)]
pub struct MetricDesc {
    desc: Desc,
    value_type: ValueType,
}

impl MetricDesc {
    /// Create a descriptor, validating name, help and label names.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::InvalidDescriptor`] if the metric name or any
    /// label name is invalid, a label name is repeated, or help is empty.
    pub fn new(
        fq_name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&str],
        value_type: ValueType,
    ) -> Result<Arc<Self>, MetricError> {
        let fq_name = fq_name.into();
        let desc = Desc::new(
            fq_name.clone(),
            help.into(),
            label_names.iter().map(ToString::to_string).collect(),
            HashMap::new(),
        )
        .map_err(|err| MetricError::InvalidDescriptor {
            metric: fq_name,
            reason: err.to_string(),
        })?;

        Ok(Arc::new(Self { desc, value_type }))
    }

    /// # Errors
    ///
    /// See [`MetricDesc::new`].
    pub fn gauge(
        fq_name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&str],
    ) -> Result<Arc<Self>, MetricError> {
        Self::new(fq_name, help, label_names, ValueType::Gauge)
    }

    /// # Errors
    ///
    /// See [`MetricDesc::new`].
    pub fn counter(
        fq_name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&str],
    ) -> Result<Arc<Self>, MetricError> {
        Self::new(fq_name, help, label_names, ValueType::Counter)
    }

    /// # Errors
    ///
    /// See [`MetricDesc::new`].
    pub fn untyped(
        fq_name: impl Into<String>,
        help: impl Into<String>,
        label_names: &[&str],
    ) -> Result<Arc<Self>, MetricError> {
        Self::new(fq_name, help, label_names, ValueType::Untyped)
    }

    #[must_use]
    pub fn fq_name(&self) -> &str {
        &self.desc.fq_name
    }

    #[must_use]
    pub fn help(&self) -> &str {
        &self.desc.help
    }

    #[must_use]
    pub fn label_names(&self) -> &[String] {
        &self.desc.variable_labels
    }

    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Build one observation for this family.
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::LabelArity`] if the number of label values does
    /// not match the declared label names.
    pub fn metric(self: &Arc<Self>, value: f64, label_values: &[&str]) -> Result<Metric, MetricError> {
        Metric::new(Arc::clone(self), value, label_values)
    }
}

impl PartialEq for MetricDesc {
    fn eq(&self, other: &Self) -> bool {
        self.value_type == other.value_type
            && self.desc.id == other.desc.id
            && self.desc.dim_hash == other.desc.dim_hash
    }
}

/// Descriptor for a static `mysql_<subsystem>_<name>` family.
///
/// # Panics
///
/// Panics if the name, help or labels are invalid (should not occur with static names).
#[allow(clippy::expect_used)]
#[must_use]
pub fn static_desc(
    subsystem: &str,
    name: &str,
    help: &str,
    labels: &[&str],
    value_type: ValueType,
) -> Arc<MetricDesc> {
    MetricDesc::new(fq_name(NAMESPACE, subsystem, name), help, labels, value_type)
        .expect("valid static metric descriptor")
}

/// One observation: descriptor, value and ordered label values.
#[derive(Clone, Debug, PartialEq)]
pub struct Metric {
    desc: Arc<MetricDesc>,
    value: f64,
    label_values: Vec<String>,
}

impl Metric {
    /// # Errors
    ///
    /// Returns [`MetricError::LabelArity`] on a label count mismatch.
    pub fn new(desc: Arc<MetricDesc>, value: f64, label_values: &[&str]) -> Result<Self, MetricError> {
        if label_values.len() != desc.label_names().len() {
            return Err(MetricError::LabelArity {
                metric: desc.fq_name().to_string(),
                expected: desc.label_names().len(),
                got: label_values.len(),
            });
        }

        Ok(Self {
            desc,
            value,
            label_values: label_values.iter().map(ToString::to_string).collect(),
        })
    }

    #[must_use]
    pub fn desc(&self) -> &MetricDesc {
        &self.desc
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.desc.fq_name()
    }

    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }

    #[must_use]
    pub fn value_type(&self) -> ValueType {
        self.desc.value_type
    }

    #[must_use]
    pub fn label_values(&self) -> &[String] {
        &self.label_values
    }

    /// Look up a label value by label name.
    #[must_use]
    pub fn label(&self, name: &str) -> Option<&str> {
        self.desc
            .label_names()
            .iter()
            .position(|label| label == name)
            .and_then(|idx| self.label_values.get(idx))
            .map(String::as_str)
    }
}

/// Destination for metrics emitted during a scrape cycle.
///
/// Cloned into every scraper of a cycle; safe for concurrent senders.
#[derive(Clone, Debug)]
pub struct MetricSink {
    tx: mpsc::UnboundedSender<Metric>,
}

impl MetricSink {
    #[must_use]
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Metric>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn send(&self, metric: Metric) {
        if self.tx.send(metric).is_err() {
            debug!("metric sink closed; dropping metric");
        }
    }

    pub fn send_all(&self, metrics: impl IntoIterator<Item = Metric>) {
        for metric in metrics {
            self.send(metric);
        }
    }
}

/// Drain everything buffered in a sink receiver once all senders are gone.
pub async fn drain(mut rx: mpsc::UnboundedReceiver<Metric>) -> Vec<Metric> {
    let mut metrics = Vec::new();
    while let Some(metric) = rx.recv().await {
        metrics.push(metric);
    }
    metrics
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_fq_name_skips_empty_parts() {
        assert_eq!(fq_name("mysql", "ndbinfo", "backup_id"), "mysql_ndbinfo_backup_id");
        assert_eq!(fq_name("mysql", "", "up"), "mysql_up");
    }

    #[test]
    fn test_label_arity_mismatch_fails() {
        let desc = MetricDesc::gauge("mysql_test", "test", &["node_id", "status"])
            .expect("valid descriptor");

        assert_eq!(
            desc.metric(1.0, &["1"]),
            Err(MetricError::LabelArity {
                metric: "mysql_test".to_string(),
                expected: 2,
                got: 1,
            })
        );
        assert!(desc.metric(1.0, &["1", "STARTED", "extra"]).is_err());
        assert!(desc.metric(1.0, &["1", "STARTED"]).is_ok());
    }

    #[test]
    fn test_invalid_descriptors_rejected() {
        assert!(matches!(
            MetricDesc::gauge("1bad", "x", &[]),
            Err(MetricError::InvalidDescriptor { .. })
        ));
        assert!(matches!(
            MetricDesc::gauge("mysql_ok", "x", &["bad-label"]),
            Err(MetricError::InvalidDescriptor { .. })
        ));
        assert!(matches!(
            MetricDesc::gauge("mysql_ok", "x", &["a", "a"]),
            Err(MetricError::InvalidDescriptor { .. })
        ));
        assert!(MetricDesc::gauge("mysql_ok", "x", &["service_URI"]).is_ok());
    }

    #[test]
    fn test_empty_help_rejected_at_construction() {
        let err = MetricDesc::gauge("mysql_ndbinfo_x", "", &["node_id"]).unwrap_err();

        assert_eq!(
            err,
            MetricError::InvalidDescriptor {
                metric: "mysql_ndbinfo_x".to_string(),
                reason: "Error: empty help string".to_string(),
            }
        );
    }

    #[test]
    fn test_static_desc_prefixes_namespace() {
        let desc = static_desc("ndbinfo", "nodes_uptime_total", "x", &["node_id"], ValueType::Gauge);

        assert_eq!(desc.fq_name(), "mysql_ndbinfo_nodes_uptime_total");
        assert_eq!(desc.label_names(), ["node_id".to_string()]);
        assert_eq!(
            *desc,
            *static_desc("ndbinfo", "nodes_uptime_total", "x", &["node_id"], ValueType::Gauge)
        );
    }

    #[test]
    fn test_label_lookup() {
        let desc = MetricDesc::counter("mysql_x_total", "x", &["node_id", "action"])
            .expect("valid descriptor");
        let metric = desc.metric(3.0, &["2", "sent"]).expect("matching arity");

        assert_eq!(metric.label("action"), Some("sent"));
        assert_eq!(metric.label("missing"), None);
        assert_eq!(metric.value_type(), ValueType::Counter);
    }

    #[tokio::test]
    async fn test_sink_collects_from_clones() {
        let (sink, rx) = MetricSink::channel();
        let desc = MetricDesc::gauge("mysql_x", "x", &[]).expect("valid descriptor");

        let other = sink.clone();
        sink.send(desc.metric(1.0, &[]).expect("no labels"));
        other.send(desc.metric(2.0, &[]).expect("no labels"));
        drop(sink);
        drop(other);

        let metrics = drain(rx).await;
        assert_eq!(metrics.len(), 2);
    }
}
