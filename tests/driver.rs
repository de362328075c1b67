#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
use ndb_exporter::collectors::config::{CollectorConfig, ScrapeSelection};
use ndb_exporter::collectors::driver::{CollectorDriver, CycleStatus};
use ndb_exporter::collectors::exporter::ScraperCollector;
use ndb_exporter::collectors::{EngineVersion, Metric, ScrapeContext, ScrapeError, Scraper};
use std::sync::Arc;
use std::time::Duration;

mod common;

use common::{Behavior, FakeDatabase, FakeScraper, enabled, registry_of};

fn emit_a() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.a", Behavior::Emit))
}

fn fail_b() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.b", Behavior::Fail))
}

fn emit_c() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.c", Behavior::Emit))
}

fn emit_new() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.new", Behavior::Emit).min_version(EngineVersion::new(8, 4, 0)))
}

fn cooperative() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.cooperative", Behavior::Cooperative))
}

fn stuck() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.stuck", Behavior::Stuck))
}

fn driver(factories: &[fn() -> Arc<dyn Scraper>]) -> CollectorDriver {
    let registry = registry_of(factories);
    let config = CollectorConfig::new().with_enabled(&enabled(&registry));
    CollectorDriver::new(registry, config).unwrap()
}

fn find<'a>(metrics: &'a [Metric], name: &str, scraper: &str) -> Option<&'a Metric> {
    metrics
        .iter()
        .find(|m| m.name() == name && m.label("scraper") == Some(scraper))
}

fn sample_value(metrics: &[Metric], name: &str, scraper: &str) -> f64 {
    find(metrics, name, scraper)
        .unwrap_or_else(|| panic!("missing {name}{{scraper={scraper}}}"))
        .value()
}

#[tokio::test]
async fn test_failing_scraper_is_isolated() {
    let driver = driver(&[emit_a, fail_b, emit_c]);
    let ctx = ScrapeContext::new(EngineVersion::new(8, 0, 0));

    let report = driver
        .run_cycle(&ctx, &FakeDatabase::new(), &ScrapeSelection::all())
        .await;

    assert!(report.up);
    assert_eq!(report.status(), CycleStatus::Partial);

    let names: Vec<_> = report.outcomes.iter().map(|o| o.scraper).collect();
    assert_eq!(names, vec!["fake.a", "fake.b", "fake.c"]);

    assert!(report.outcome("fake.a").unwrap().success);
    assert!(report.outcome("fake.c").unwrap().success);
    let failed = report.outcome("fake.b").unwrap();
    assert!(!failed.success);
    assert!(matches!(failed.error, Some(ScrapeError::Query(_))));

    // Data from the healthy scrapers still comes through.
    assert!(find(&report.metrics, "fake_value", "fake.a").is_some());
    assert!(find(&report.metrics, "fake_value", "fake.c").is_some());
    assert!(find(&report.metrics, "fake_value", "fake.b").is_none());

    assert!((sample_value(&report.metrics, "mysql_exporter_scraper_success", "fake.a") - 1.0).abs() < f64::EPSILON);
    assert!(sample_value(&report.metrics, "mysql_exporter_scraper_success", "fake.b").abs() < f64::EPSILON);
    assert!(sample_value(&report.metrics, "mysql_exporter_scraper_duration_seconds", "fake.b") >= 0.0);
}

#[tokio::test]
async fn test_all_failing_is_failed_cycle() {
    let driver = driver(&[fail_b]);
    let ctx = ScrapeContext::new(EngineVersion::new(8, 0, 0));

    let report = driver
        .run_cycle(&ctx, &FakeDatabase::new(), &ScrapeSelection::all())
        .await;

    assert!(report.up);
    assert_eq!(report.status(), CycleStatus::Failed);
}

#[tokio::test]
async fn test_version_gating_skips_silently() {
    let driver = driver(&[emit_a, emit_new]);

    let old = driver
        .run_cycle(
            &ScrapeContext::new(EngineVersion::new(8, 0, 35)),
            &FakeDatabase::new(),
            &ScrapeSelection::all(),
        )
        .await;

    assert_eq!(old.status(), CycleStatus::Ok);
    assert_eq!(old.outcomes.len(), 1);
    assert!(old.outcome("fake.new").is_none());
    assert!(find(&old.metrics, "mysql_exporter_scraper_success", "fake.new").is_none());

    let new = driver
        .run_cycle(
            &ScrapeContext::new(EngineVersion::new(8, 4, 0)),
            &FakeDatabase::new(),
            &ScrapeSelection::all(),
        )
        .await;

    assert_eq!(new.outcomes.len(), 2);
    assert!(new.outcome("fake.new").unwrap().success);
}

#[tokio::test]
async fn test_selection_restricts_cycle() {
    let driver = driver(&[emit_a, fail_b, emit_c]);
    let ctx = ScrapeContext::new(EngineVersion::new(8, 0, 0));

    let selection = ScrapeSelection::from_query("collect[]=fake.a&collect[]=fake.b&exclude[]=fake.b&collect[]=nope");
    let report = driver.run_cycle(&ctx, &FakeDatabase::new(), &selection).await;

    let names: Vec<_> = report.outcomes.iter().map(|o| o.scraper).collect();
    assert_eq!(names, vec!["fake.a"]);
    assert_eq!(report.status(), CycleStatus::Ok);
}

#[tokio::test]
async fn test_disabled_scrapers_are_not_candidates() {
    let registry = registry_of(&[emit_a, emit_c]);
    let config = CollectorConfig::new().with_enabled(&["fake.c".to_string()]);
    let driver = CollectorDriver::new(registry, config).unwrap();

    let report = driver
        .run_cycle(
            &ScrapeContext::new(EngineVersion::new(8, 0, 0)),
            &FakeDatabase::new(),
            &ScrapeSelection::all(),
        )
        .await;

    let names: Vec<_> = report.outcomes.iter().map(|o| o.scraper).collect();
    assert_eq!(names, vec!["fake.c"]);
}

#[tokio::test]
async fn test_unreachable_database_skips_scrapers() {
    let driver = driver(&[emit_a, emit_c]);
    let ctx = ScrapeContext::new(EngineVersion::new(8, 0, 0));

    let report = driver
        .run_cycle(&ctx, &FakeDatabase::new().unreachable(), &ScrapeSelection::all())
        .await;

    assert!(!report.up);
    assert!(report.outcomes.is_empty());
    assert_eq!(report.status(), CycleStatus::Failed);

    let up = report
        .metrics
        .iter()
        .find(|m| m.name() == "mysql_up")
        .expect("mysql_up is always reported");
    assert!(up.value().abs() < f64::EPSILON);
    assert!(report.metrics.iter().all(|m| m.name() != "fake_value"));
}

#[tokio::test]
async fn test_up_reported_when_reachable() {
    let driver = driver(&[emit_a]);
    let report = driver
        .run_cycle(
            &ScrapeContext::new(EngineVersion::new(8, 0, 0)),
            &FakeDatabase::new(),
            &ScrapeSelection::all(),
        )
        .await;

    let up = report.metrics.iter().find(|m| m.name() == "mysql_up").unwrap();
    assert!((up.value() - 1.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_deadline_bounds_slow_scrapers() {
    let driver = driver(&[emit_a, cooperative, stuck]);
    let ctx = ScrapeContext::new(EngineVersion::new(8, 0, 0)).with_timeout(Duration::from_millis(100));

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        driver.run_cycle(&ctx, &FakeDatabase::new(), &ScrapeSelection::all()),
    )
    .await
    .expect("cycle must finish shortly after the deadline");

    assert_eq!(report.status(), CycleStatus::Partial);
    assert!(report.outcome("fake.a").unwrap().success);

    for name in ["fake.cooperative", "fake.stuck"] {
        let outcome = report.outcome(name).unwrap();
        assert!(!outcome.success, "{name} should fail");
        assert!(
            matches!(outcome.error, Some(ScrapeError::DeadlineExceeded)),
            "{name}: {:?}",
            outcome.error
        );
    }
}

#[tokio::test]
async fn test_cancellation_stops_cycle() {
    let driver = driver(&[cooperative, stuck]);
    let ctx = ScrapeContext::new(EngineVersion::new(8, 0, 0));

    let canceller = ctx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(5),
        driver.run_cycle(&ctx, &FakeDatabase::new(), &ScrapeSelection::all()),
    )
    .await
    .expect("cancelled cycle must finish");

    assert_eq!(report.status(), CycleStatus::Failed);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.error.as_ref().is_some_and(ScrapeError::is_cancellation)));
}

#[tokio::test]
async fn test_self_metrics_persist_across_cycles() {
    let stats = ScraperCollector::new();
    let driver = driver(&[emit_a, fail_b]).with_stats(stats.clone());
    let registry = prometheus::Registry::new();
    stats.register(&registry).unwrap();

    for _ in 0..3 {
        driver
            .run_cycle(
                &ScrapeContext::new(EngineVersion::new(8, 0, 0)),
                &FakeDatabase::new(),
                &ScrapeSelection::all(),
            )
            .await;
    }

    assert_eq!(stats.scrapes(), 3);

    let families = registry.gather();
    let text = ndb_exporter::collectors::exposition::encode(&families).unwrap();
    assert!(
        text.contains(r#"mysql_exporter_scraper_errors_total{reason="query",scraper="fake.b"} 3"#),
        "{text}"
    );
    assert!(!text.contains(r#"scraper_errors_total{reason="query",scraper="fake.a"}"#));

    let histogram = families
        .iter()
        .find(|f| f.name() == "mysql_exporter_scraper_duration_seconds_histogram")
        .expect("histogram family");
    assert_eq!(histogram.get_metric().len(), 2);
}
