#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
use ndb_exporter::collectors::config::{CollectorConfig, ScrapeSelection};
use ndb_exporter::collectors::registry::{ScraperDescriptor, ScraperRegistry};
use ndb_exporter::collectors::{EngineVersion, RegistryError, SCRAPER_NAMES, Scraper, default_registry};
use std::sync::Arc;

mod common;

use common::{Behavior, FakeScraper};

fn fake_a() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.a", Behavior::Emit))
}

fn fake_a_again() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.a", Behavior::Fail))
}

fn fake_off() -> Arc<dyn Scraper> {
    Arc::new(FakeScraper::new("fake.off", Behavior::Emit).disabled_by_default())
}

#[test]
fn test_default_registry_holds_every_scraper() {
    let registry = default_registry().unwrap();

    assert_eq!(registry.len(), SCRAPER_NAMES.len());
    for name in SCRAPER_NAMES {
        assert!(registry.lookup(name).is_ok(), "{name} missing");
    }
}

#[test]
fn test_default_registry_order_is_deterministic() {
    let first = default_registry().unwrap().names();
    let second = default_registry().unwrap().names();

    assert_eq!(first, second);
    let mut sorted = first.clone();
    sorted.sort_unstable();
    assert_eq!(first, sorted);
}

#[test]
fn test_default_on_scrapers() {
    let registry = default_registry().unwrap();
    let mut on: Vec<_> = registry
        .all()
        .filter(|d| d.enabled_by_default)
        .map(|d| d.name)
        .collect();
    on.sort_unstable();

    assert_eq!(
        on,
        vec![
            "ndbinfo.counters",
            "ndbinfo.logbuffers",
            "ndbinfo.logspaces",
            "ndbinfo.memoryusage",
            "ndbinfo.nodes",
            "ndbinfo.transporters",
        ]
    );
}

#[test]
fn test_min_versions() {
    let registry = default_registry().unwrap();

    let details = registry.descriptor("ndbinfo.transporter_details").unwrap();
    assert_eq!(details.min_version, EngineVersion::new(8, 4, 0));

    let map = registry
        .descriptor("info_schema.ndb_transid_mysql_connection_map")
        .unwrap();
    assert_eq!(map.min_version, EngineVersion::new(5, 1, 0));

    let nodes = registry.descriptor("ndbinfo.nodes").unwrap();
    assert_eq!(nodes.min_version, EngineVersion::new(8, 0, 0));
}

#[test]
fn test_duplicate_name_rejected() {
    let mut registry = ScraperRegistry::new();
    registry.register_factory("fake.a", fake_a).unwrap();

    let err = registry.register_factory("fake.a", fake_a_again).unwrap_err();
    assert_eq!(err, RegistryError::Duplicate("fake.a".to_string()));
    assert_eq!(registry.len(), 1);
}

#[test]
fn test_descriptor_name_must_match_scraper() {
    let mut registry = ScraperRegistry::new();
    let descriptor = ScraperDescriptor::of("fake.b", fake_a().as_ref());

    let err = registry.register(descriptor, fake_a).unwrap_err();
    assert!(matches!(err, RegistryError::NameMismatch { .. }));
    assert!(registry.is_empty());
}

#[test]
fn test_lookup_unknown() {
    let registry = ScraperRegistry::new();
    assert!(matches!(
        registry.lookup("ndbinfo.nope"),
        Err(RegistryError::NotFound(_))
    ));
}

#[test]
fn test_descriptor_reports_default() {
    let mut registry = ScraperRegistry::new();
    registry.register_factory("fake.off", fake_off).unwrap();

    assert!(!registry.descriptor("fake.off").unwrap().enabled_by_default);
}

#[test]
fn test_candidates_across_versions() {
    let registry = default_registry().unwrap();
    let config = CollectorConfig::new().with_enabled(
        &SCRAPER_NAMES
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>(),
    );

    let old = registry.candidates(EngineVersion::new(7, 6, 0), &config, &ScrapeSelection::all());
    let names: Vec<_> = old.iter().map(|(d, _)| d.name).collect();
    assert_eq!(names, vec!["info_schema.ndb_transid_mysql_connection_map"]);

    let mid = registry.candidates(EngineVersion::new(8, 0, 30), &config, &ScrapeSelection::all());
    assert_eq!(mid.len(), SCRAPER_NAMES.len() - 1);
    assert!(mid.iter().all(|(d, _)| d.name != "ndbinfo.transporter_details"));

    let new = registry.candidates(EngineVersion::new(8, 4, 3), &config, &ScrapeSelection::all());
    assert_eq!(new.len(), SCRAPER_NAMES.len());
}
