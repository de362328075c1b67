//! One scrape cycle: select scrapers, run them concurrently with fault
//! isolation, and append per-scraper meta-metrics.

use super::config::{CollectorConfig, ScrapeSelection};
use super::database::Database;
use super::error::{MetricError, ScrapeError};
use super::exporter::ScraperCollector;
use super::metric::{self, Metric, MetricDesc, MetricSink, fq_name};
use super::registry::ScraperRegistry;
use super::version::EngineVersion;
use super::{NAMESPACE, ScrapeContext};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info_span, instrument, warn};
use tracing_futures::Instrument as _;

const PING_QUERY: &str = "SELECT 1";

/// Result of running one scraper in one cycle.
#[derive(Debug)]
pub struct ScrapeOutcome {
    pub scraper: &'static str,
    pub success: bool,
    pub duration: Duration,
    pub error: Option<ScrapeError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleStatus {
    /// Every candidate succeeded.
    Ok,
    /// Some candidates failed.
    Partial,
    /// The database was unreachable or every candidate failed.
    Failed,
}

#[derive(Debug)]
pub struct CycleReport {
    pub up: bool,
    pub engine_version: EngineVersion,
    /// Outcomes in registry order.
    pub outcomes: Vec<ScrapeOutcome>,
    /// Data metrics followed by `up` and the per-scraper meta-metrics.
    pub metrics: Vec<Metric>,
    pub duration: Duration,
}

impl CycleReport {
    #[must_use]
    pub fn status(&self) -> CycleStatus {
        let failed = self.failures().count();

        if !self.up || (failed > 0 && failed == self.outcomes.len()) {
            CycleStatus::Failed
        } else if failed > 0 {
            CycleStatus::Partial
        } else {
            CycleStatus::Ok
        }
    }

    #[must_use]
    pub fn outcome(&self, scraper: &str) -> Option<&ScrapeOutcome> {
        self.outcomes.iter().find(|o| o.scraper == scraper)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScrapeOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }
}

/// Runs scrape cycles against a shared registry.
pub struct CollectorDriver {
    registry: Arc<ScraperRegistry>,
    config: CollectorConfig,
    stats: Option<ScraperCollector>,
    up: Arc<MetricDesc>,
    scraper_success: Arc<MetricDesc>,
    scraper_duration: Arc<MetricDesc>,
}

impl CollectorDriver {
    /// # Errors
    ///
    /// Returns an error if the meta-metric descriptors cannot be built.
    pub fn new(registry: Arc<ScraperRegistry>, config: CollectorConfig) -> Result<Self, MetricError> {
        Ok(Self {
            registry,
            config,
            stats: None,
            up: MetricDesc::gauge(
                fq_name(NAMESPACE, "", "up"),
                "Whether the database is reachable (1 = yes).",
                &[],
            )?,
            scraper_success: MetricDesc::gauge(
                fq_name(NAMESPACE, "exporter", "scraper_success"),
                "Whether the scraper succeeded in this cycle (1 = yes).",
                &["scraper"],
            )?,
            scraper_duration: MetricDesc::gauge(
                fq_name(NAMESPACE, "exporter", "scraper_duration_seconds"),
                "Time the scraper took in this cycle.",
                &["scraper"],
            )?,
        })
    }

    /// Record per-scraper timings and failures in persistent self-metrics.
    #[must_use]
    pub fn with_stats(mut self, stats: ScraperCollector) -> Self {
        self.stats = Some(stats);
        self
    }

    #[must_use]
    pub const fn registry(&self) -> &Arc<ScraperRegistry> {
        &self.registry
    }

    #[must_use]
    pub const fn config(&self) -> &CollectorConfig {
        &self.config
    }

    /// Run one scrape cycle. Never fails: per-scraper errors end up in the
    /// outcomes and meta-metrics.
    #[instrument(skip_all, level = "info", fields(engine_version = %ctx.engine_version(), otel.kind = "internal"))]
    pub async fn run_cycle(
        &self,
        ctx: &ScrapeContext,
        db: &dyn Database,
        selection: &ScrapeSelection,
    ) -> CycleReport {
        let start = Instant::now();

        if let Some(stats) = &self.stats {
            stats.increment_scrapes();
        }

        for name in selection.unknown(&self.registry.names()) {
            debug!(scraper = name, "ignoring unknown scraper in request");
        }

        let up = match ping(ctx, db).await {
            Ok(()) => true,
            Err(err) => {
                warn!(error = %err, reason = err.kind(), "database ping failed; skipping scrapers");
                false
            }
        };

        let (mut metrics, outcomes) = if up {
            self.run_scrapers(ctx, db, selection).await
        } else {
            (Vec::new(), Vec::new())
        };

        self.append_meta(&mut metrics, up, &outcomes);

        if let Some(stats) = &self.stats {
            stats.update_metrics_count(metrics.len());
        }

        CycleReport {
            up,
            engine_version: ctx.engine_version(),
            outcomes,
            metrics,
            duration: start.elapsed(),
        }
    }

    async fn run_scrapers(
        &self,
        ctx: &ScrapeContext,
        db: &dyn Database,
        selection: &ScrapeSelection,
    ) -> (Vec<Metric>, Vec<ScrapeOutcome>) {
        let candidates = self
            .registry
            .candidates(ctx.engine_version(), &self.config, selection);

        let (sink, rx) = MetricSink::channel();
        let mut tasks = FuturesUnordered::new();

        for (idx, (descriptor, scraper)) in candidates.into_iter().enumerate() {
            let name = descriptor.name;
            let sink = sink.clone();
            let timer = self.stats.as_ref().map(|stats| stats.start_scrape(name));
            let span = info_span!("scraper.scrape", scraper = name, otel.kind = "internal");

            tasks.push(
                async move {
                    let start = Instant::now();

                    // Scrapers are expected to watch the context themselves; this
                    // also bounds ones that do not.
                    let result = tokio::select! {
                        biased;
                        res = scraper.scrape(ctx, db, &sink) => res,
                        err = ctx.done() => Err(err),
                    };

                    let duration = start.elapsed();

                    if let Some(timer) = timer {
                        match &result {
                            Ok(()) => timer.success(),
                            Err(err) => timer.error(err.kind()),
                        }
                    }

                    (idx, name, result, duration)
                }
                .instrument(span),
            );
        }

        drop(sink);

        let mut outcomes = Vec::with_capacity(tasks.len());

        while let Some((idx, name, result, duration)) = tasks.next().await {
            let outcome = match result {
                Ok(()) => {
                    debug!(scraper = name, duration_seconds = duration.as_secs_f64(), "scraper succeeded");
                    ScrapeOutcome {
                        scraper: name,
                        success: true,
                        duration,
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(
                        scraper = name,
                        reason = err.kind(),
                        error = %err,
                        duration_seconds = duration.as_secs_f64(),
                        "scraper failed"
                    );
                    ScrapeOutcome {
                        scraper: name,
                        success: false,
                        duration,
                        error: Some(err),
                    }
                }
            };
            outcomes.push((idx, outcome));
        }

        drop(tasks);

        outcomes.sort_by_key(|(idx, _)| *idx);
        let outcomes = outcomes.into_iter().map(|(_, outcome)| outcome).collect();

        (metric::drain(rx).await, outcomes)
    }

    fn append_meta(&self, metrics: &mut Vec<Metric>, up: bool, outcomes: &[ScrapeOutcome]) {
        let mut push = |res: Result<Metric, MetricError>| match res {
            Ok(metric) => metrics.push(metric),
            Err(err) => warn!(error = %err, "failed to build meta-metric"),
        };

        push(self.up.metric(if up { 1.0 } else { 0.0 }, &[]));

        for outcome in outcomes {
            push(
                self.scraper_success
                    .metric(if outcome.success { 1.0 } else { 0.0 }, &[outcome.scraper]),
            );
            push(
                self.scraper_duration
                    .metric(outcome.duration.as_secs_f64(), &[outcome.scraper]),
            );
        }
    }
}

async fn ping(ctx: &ScrapeContext, db: &dyn Database) -> Result<(), ScrapeError> {
    let span = info_span!(
        "db.query",
        db.system = "mysql",
        db.operation = "SELECT",
        db.statement = PING_QUERY,
        otel.kind = "client"
    );

    let mut rows = db.query(PING_QUERY);

    let first = tokio::select! {
        biased;
        err = ctx.done() => return Err(err),
        first = rows.next().instrument(span) => first,
    };

    match first {
        Some(Err(err)) => Err(err),
        Some(Ok(_)) | None => Ok(()),
    }
}
