use anyhow::Result;
use prometheus::{CounterVec, GaugeVec, HistogramVec, IntCounter, IntGauge, Opts, Registry};
use std::time::Instant;

/// Exporter self-metrics that persist across scrape cycles.
#[derive(Clone)]
pub struct ScraperCollector {
    scrape_duration_seconds: HistogramVec,
    scrape_errors_total: CounterVec,
    last_scrape_timestamp: GaugeVec,

    last_scrape_metrics: IntGauge,
    scrapes_total: IntCounter,
}

impl Default for ScraperCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl ScraperCollector {
    #[must_use]
    #[allow(clippy::expect_used)]
    ///
    /// # Panics
    ///
    /// Panics if metric creation fails.
    pub fn new() -> Self {
        let scrape_duration_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "mysql_exporter_scraper_duration_seconds_histogram",
                "Distribution of time spent in each scraper in seconds",
            )
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]),
            &["scraper"],
        )
        .expect("mysql_exporter_scraper_duration_seconds_histogram");

        let scrape_errors_total = CounterVec::new(
            Opts::new(
                "mysql_exporter_scraper_errors_total",
                "Total number of scraper failures by reason",
            ),
            &["scraper", "reason"],
        )
        .expect("mysql_exporter_scraper_errors_total");

        let last_scrape_timestamp = GaugeVec::new(
            Opts::new(
                "mysql_exporter_scraper_last_scrape_timestamp_seconds",
                "Unix timestamp of the last run of each scraper",
            ),
            &["scraper"],
        )
        .expect("mysql_exporter_scraper_last_scrape_timestamp_seconds");

        let last_scrape_metrics = IntGauge::with_opts(Opts::new(
            "mysql_exporter_last_scrape_metrics",
            "Number of samples produced by the previous scrape cycle",
        ))
        .expect("mysql_exporter_last_scrape_metrics");

        let scrapes_total = IntCounter::with_opts(Opts::new(
            "mysql_exporter_scrapes_total",
            "Total number of scrape cycles since start",
        ))
        .expect("mysql_exporter_scrapes_total");

        Self {
            scrape_duration_seconds,
            scrape_errors_total,
            last_scrape_timestamp,
            last_scrape_metrics,
            scrapes_total,
        }
    }

    #[must_use]
    pub fn start_scrape(&self, scraper: &str) -> ScrapeTimer {
        ScrapeTimer {
            scraper: scraper.to_string(),
            start: Instant::now(),
            stats: self.clone(),
        }
    }

    pub fn update_metrics_count(&self, count: usize) {
        self.last_scrape_metrics
            .set(i64::try_from(count).unwrap_or(i64::MAX));
    }

    pub fn increment_scrapes(&self) {
        self.scrapes_total.inc();
    }

    #[must_use]
    pub fn scrapes(&self) -> u64 {
        self.scrapes_total.get()
    }

    fn record(&self, scraper: &str, duration: f64, failure: Option<&str>) {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs_f64();

        self.scrape_duration_seconds
            .with_label_values(&[scraper])
            .observe(duration);

        self.last_scrape_timestamp
            .with_label_values(&[scraper])
            .set(timestamp);

        if let Some(reason) = failure {
            self.scrape_errors_total
                .with_label_values(&[scraper, reason])
                .inc();
        }
    }

    ///
    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.scrape_duration_seconds.clone()))?;
        registry.register(Box::new(self.scrape_errors_total.clone()))?;
        registry.register(Box::new(self.last_scrape_timestamp.clone()))?;
        registry.register(Box::new(self.last_scrape_metrics.clone()))?;
        registry.register(Box::new(self.scrapes_total.clone()))?;
        Ok(())
    }
}

pub struct ScrapeTimer {
    scraper: String,
    start: Instant,
    stats: ScraperCollector,
}

impl ScrapeTimer {
    pub fn success(self) {
        let duration = self.start.elapsed().as_secs_f64();
        self.stats.record(&self.scraper, duration, None);
    }

    /// Record a failure labelled with `reason` (e.g. `query`, `timeout`).
    pub fn error(self, reason: &str) {
        let duration = self.start.elapsed().as_secs_f64();
        self.stats.record(&self.scraper, duration, Some(reason));
    }
}
