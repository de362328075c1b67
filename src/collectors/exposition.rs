//! Prometheus text exposition for one scrape cycle.

use super::metric::{Metric, ValueType};
use anyhow::Result;
use prometheus::proto::MetricFamily;
use prometheus::{CounterVec, Encoder as _, GaugeVec, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use tracing::warn;

enum Family {
    Gauge(GaugeVec),
    Counter(CounterVec),
}

struct Entry {
    label_names: Vec<String>,
    family: Family,
}

/// Group `metrics` into prometheus families registered in a fresh registry.
///
/// Untyped metrics are exposed as gauges. A metric whose name was already
/// used with different label names is dropped with a warning.
///
/// # Errors
///
/// Returns an error if a family cannot be created or registered.
pub fn gather(metrics: &[Metric]) -> Result<Vec<MetricFamily>> {
    let registry = Registry::new();
    let mut families: HashMap<&str, Entry> = HashMap::new();

    for metric in metrics {
        let desc = metric.desc();

        if !families.contains_key(metric.name()) {
            let opts = Opts::new(desc.fq_name(), desc.help());
            let labels: Vec<&str> = desc.label_names().iter().map(String::as_str).collect();

            let family = match desc.value_type() {
                ValueType::Counter => {
                    let vec = CounterVec::new(opts, &labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    Family::Counter(vec)
                }
                ValueType::Gauge | ValueType::Untyped => {
                    let vec = GaugeVec::new(opts, &labels)?;
                    registry.register(Box::new(vec.clone()))?;
                    Family::Gauge(vec)
                }
            };

            families.insert(
                metric.name(),
                Entry {
                    label_names: desc.label_names().to_vec(),
                    family,
                },
            );
        }

        let Some(entry) = families.get(metric.name()) else {
            continue;
        };

        if entry.label_names != desc.label_names() {
            warn!(metric = metric.name(), "label names differ from earlier metric with the same name; dropping");
            continue;
        }

        let values: Vec<&str> = metric.label_values().iter().map(String::as_str).collect();

        match &entry.family {
            Family::Gauge(vec) => vec.with_label_values(&values).set(metric.value()),
            Family::Counter(vec) => {
                if metric.value() >= 0.0 {
                    vec.with_label_values(&values).inc_by(metric.value());
                } else {
                    warn!(metric = metric.name(), value = metric.value(), "negative counter value; dropping");
                }
            }
        }
    }

    Ok(registry.gather())
}

/// Encode families in the Prometheus text format.
///
/// # Errors
///
/// Returns an error if encoding fails.
pub fn encode(families: &[MetricFamily]) -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder.encode(families, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

#[must_use]
pub fn content_type() -> String {
    TextEncoder::new().format_type().to_string()
}
