use super::ExporterState;
use crate::collectors::{ScrapeContext, config::ScrapeSelection, driver::CycleStatus, exposition};
use axum::{
    Json,
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use opentelemetry::global;
use opentelemetry_http::HeaderExtractor;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info_span, warn};
use tracing_futures::Instrument as _;
use tracing_opentelemetry::OpenTelemetrySpanExt as _;

/// Header Prometheus sets to its own scrape timeout.
pub const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

/// Cycle timeout: the configured limit, lowered to the Prometheus timeout
/// minus `offset` when the header carries a positive number of seconds.
#[must_use]
pub fn effective_timeout(configured: Duration, header_value: Option<&str>, offset: Duration) -> Duration {
    let Some(prometheus) = header_value
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| *seconds > 0.0)
        .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
    else {
        return configured;
    };

    let bounded = if offset < prometheus {
        prometheus - offset
    } else {
        warn!(
            offset_seconds = offset.as_secs_f64(),
            scrape_timeout_seconds = prometheus.as_secs_f64(),
            "timeout offset should be lower than the prometheus scrape timeout"
        );
        prometheus
    };

    configured.min(bounded)
}

/// 503 for failed cycles, and for partial ones in strict mode.
#[must_use]
pub const fn response_status(status: CycleStatus, strict: bool) -> StatusCode {
    let unavailable = matches!(status, CycleStatus::Failed)
        || (strict && matches!(status, CycleStatus::Partial));

    if unavailable {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    }
}

pub async fn metrics(
    State(state): State<Arc<ExporterState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
) -> Response {
    let span = info_span!("scrape", otel.kind = "server");
    let parent = global::get_text_map_propagator(|propagator| {
        propagator.extract(&HeaderExtractor(&headers))
    });
    #[allow(clippy::let_unit_value)]
    let _ = span.set_parent(parent);

    scrape(&state, query.as_deref().unwrap_or_default(), &headers)
        .instrument(span)
        .await
}

async fn scrape(state: &ExporterState, query: &str, headers: &HeaderMap) -> Response {
    let settings = &state.settings;
    let timeout = effective_timeout(
        settings.scrape_timeout,
        headers
            .get(SCRAPE_TIMEOUT_HEADER)
            .and_then(|value| value.to_str().ok()),
        settings.timeout_offset,
    );
    let deadline = Instant::now() + timeout;

    let selection = ScrapeSelection::from_query(query);
    let version = state.engine_version(timeout).await;
    let ctx = ScrapeContext::new(version).with_deadline(deadline);

    let report = state
        .driver
        .run_cycle(&ctx, state.db.as_ref(), &selection)
        .await;

    let status = report.status();
    debug!(
        ?status,
        up = report.up,
        failures = report.failures().count(),
        samples = report.metrics.len(),
        duration_seconds = report.duration.as_secs_f64(),
        "scrape cycle finished"
    );

    let mut families = state.self_metrics.gather();
    match exposition::gather(&report.metrics) {
        Ok(cycle) => families.extend(cycle),
        Err(err) => {
            error!(error = %err, "failed to build metric families");
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    }

    match exposition::encode(&families) {
        Ok(body) => (
            response_status(status, settings.strict),
            [(header::CONTENT_TYPE, exposition::content_type())],
            body,
        )
            .into_response(),
        Err(err) => {
            error!(error = %err, "failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response()
        }
    }
}

pub async fn health(State(state): State<Arc<ExporterState>>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::long_version(),
        "engine_version": state.cached_engine_version().map(|version| version.to_string()),
    }))
}

pub async fn index(State(state): State<Arc<ExporterState>>) -> Html<String> {
    let driver = state.driver();
    let rows: String = driver
        .registry()
        .all()
        .filter(|descriptor| driver.config().is_enabled(descriptor.name))
        .map(|descriptor| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>\n",
                descriptor.name, descriptor.help, descriptor.min_version
            )
        })
        .collect();

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>NDB Exporter</title></head>
<body>
<h1>NDB Exporter</h1>
<p>Version {version}</p>
<p><a href="/metrics">Metrics</a> | <a href="/health">Health</a></p>
<h2>Enabled scrapers</h2>
<table>
<tr><th>Name</th><th>Help</th><th>Minimum version</th></tr>
{rows}</table>
</body>
</html>
"#,
        version = crate::long_version(),
    ))
}
