#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
use ndb_exporter::collectors::database::Value;
use ndb_exporter::collectors::metric::{self, MetricSink};
use ndb_exporter::collectors::ndbinfo::{
    ClusterLocksScraper, CountersScraper, DictObjInfoScraper, MemoryUsageScraper, NodesScraper,
    ProcessesScraper, ServerOperationsScraper,
};
use ndb_exporter::collectors::{EngineVersion, Metric, ScrapeContext, ScrapeError, Scraper, ValueType};
use std::time::Duration;

mod common;

use common::{FakeDatabase, Response};

async fn scrape(scraper: &dyn Scraper, db: &FakeDatabase) -> (Result<(), ScrapeError>, Vec<Metric>) {
    let ctx = ScrapeContext::new(EngineVersion::new(8, 4, 0));
    scrape_with(scraper, db, &ctx).await
}

async fn scrape_with(
    scraper: &dyn Scraper,
    db: &FakeDatabase,
    ctx: &ScrapeContext,
) -> (Result<(), ScrapeError>, Vec<Metric>) {
    let (sink, rx) = MetricSink::channel();
    let result = scraper.scrape(ctx, db, &sink).await;
    drop(sink);
    (result, metric::drain(rx).await)
}

fn node(id: u64, uptime: Value) -> Vec<Value> {
    vec![
        Value::UInt(id),
        uptime,
        Value::from("STARTED"),
        Value::UInt(0),
        Value::UInt(1),
    ]
}

#[tokio::test]
async fn test_empty_result_is_success() {
    let db = FakeDatabase::new().with_rows("ndbinfo.nodes", vec![]);

    let (result, metrics) = scrape(&NodesScraper::new(), &db).await;

    assert!(result.is_ok());
    assert!(metrics.is_empty());
    assert!(db.queries().iter().any(|q| q.contains("FROM ndbinfo.nodes")));
}

#[tokio::test]
async fn test_rows_become_metrics() {
    let db = FakeDatabase::new().with_rows(
        "ndbinfo.nodes",
        vec![node(1, Value::UInt(3600)), node(2, Value::UInt(1800))],
    );

    let (result, metrics) = scrape(&NodesScraper::new(), &db).await;

    assert!(result.is_ok());
    assert_eq!(metrics.len(), 4);

    let uptime = metrics
        .iter()
        .find(|m| m.name() == "mysql_ndbinfo_nodes_uptime_total" && m.label("node_id") == Some("2"))
        .expect("uptime for node 2");
    assert!((uptime.value() - 1800.0).abs() < f64::EPSILON);
    assert_eq!(uptime.label("status"), Some("STARTED"));
}

#[tokio::test]
async fn test_decode_failure_keeps_earlier_rows() {
    let db = FakeDatabase::new().with_rows(
        "ndbinfo.nodes",
        vec![
            node(1, Value::UInt(10)),
            node(2, Value::from("not a number")),
            node(3, Value::UInt(30)),
        ],
    );

    let (result, metrics) = scrape(&NodesScraper::new(), &db).await;

    assert!(matches!(result, Err(ScrapeError::Decode { .. })), "{result:?}");
    assert!(metrics.iter().all(|m| m.label("node_id") == Some("1")));
    assert_eq!(metrics.len(), 2);
}

#[tokio::test]
async fn test_query_failure() {
    let db = FakeDatabase::new().with(
        "ndbinfo.memoryusage",
        Response::Fail("Table 'ndbinfo.memoryusage' doesn't exist".to_string()),
    );

    let (result, metrics) = scrape(&MemoryUsageScraper::new(), &db).await;

    let err = result.expect_err("query failure surfaces");
    assert_eq!(err.kind(), "query");
    assert!(metrics.is_empty());
}

#[tokio::test]
async fn test_stream_error_after_rows() {
    let db = FakeDatabase::new().with(
        "ndbinfo.nodes",
        Response::RowsThenError(vec![node(1, Value::UInt(10))], "lost connection".to_string()),
    );

    let (result, metrics) = scrape(&NodesScraper::new(), &db).await;

    assert!(matches!(result, Err(ScrapeError::Query(_))));
    assert_eq!(metrics.len(), 2);
}

#[tokio::test]
async fn test_null_columns_coalesce() {
    let db = FakeDatabase::new()
        .with_rows(
            "ndbinfo.processes",
            vec![vec![
                Value::UInt(1),
                Value::from("NDB"),
                Value::from("mysql-8.4.0 ndb-8.4.0"),
                Value::UInt(4242),
                Value::Null,
                Value::from("ndbmtd"),
                Value::from("ndb://10.0.0.1"),
            ]],
        )
        .with_rows(
            "ndbinfo.cluster_locks",
            vec![vec![
                Value::UInt(1),
                Value::UInt(0),
                Value::UInt(1),
                Value::UInt(3),
                Value::from("row"),
                Value::from("X"),
                Value::from("H"),
                Value::UInt(99),
                Value::UInt(250),
                Value::from("INSERT"),
                Value::Null,
            ]],
        );

    let (result, metrics) = scrape(&ProcessesScraper::new(), &db).await;
    assert!(result.is_ok(), "{result:?}");
    assert!(metrics[0].value().abs() < f64::EPSILON);

    let (result, metrics) = scrape(&ClusterLocksScraper::new(), &db).await;
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(metrics.len(), 1);
    assert!((metrics[0].value() - 250.0).abs() < f64::EPSILON);
    assert!(metrics[0].label_values().iter().any(String::is_empty));
}

#[tokio::test]
async fn test_counters_fallback_through_scrape() {
    let db = FakeDatabase::new().with_rows(
        "ndbinfo.counters",
        vec![
            vec![Value::UInt(1), Value::from("READS"), Value::UInt(12)],
            vec![Value::UInt(1), Value::from("BRAND_NEW"), Value::UInt(5)],
            vec![Value::UInt(2), Value::from("BRAND_NEW"), Value::UInt(7)],
        ],
    );
    let scraper = CountersScraper::new();

    let (result, metrics) = scrape(&scraper, &db).await;

    assert!(result.is_ok(), "{result:?}");
    assert_eq!(metrics.len(), 3);

    let reads = metrics
        .iter()
        .find(|m| m.name() == "mysql_ndbinfo_counters_reads_total")
        .expect("typed counter");
    assert_eq!(reads.value_type(), ValueType::Counter);

    let fallback: Vec<_> = metrics
        .iter()
        .filter(|m| m.name() == "mysql_ndbinfo_counter_brand_new")
        .collect();
    assert_eq!(fallback.len(), 2);
    assert!(fallback.iter().all(|m| m.value_type() == ValueType::Untyped));

    // Same descriptor family across scrapes.
    let (_, again) = scrape(&scraper, &db).await;
    let first = fallback[0].desc();
    let second = again
        .iter()
        .find(|m| m.name() == "mysql_ndbinfo_counter_brand_new")
        .unwrap()
        .desc();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_cancelled_before_query() {
    let db = FakeDatabase::new();
    let ctx = ScrapeContext::new(EngineVersion::new(8, 4, 0));
    ctx.cancel();

    let (result, metrics) = scrape_with(&NodesScraper::new(), &db, &ctx).await;

    assert!(matches!(result, Err(ScrapeError::Cancelled)));
    assert!(metrics.is_empty());
    assert!(db.queries().is_empty());
}

#[tokio::test]
async fn test_hanging_query_honours_deadline() {
    let db = FakeDatabase::new().with("ndbinfo.nodes", Response::Hang);
    let ctx = ScrapeContext::new(EngineVersion::new(8, 4, 0)).with_timeout(Duration::from_millis(50));

    let (result, _) = tokio::time::timeout(
        Duration::from_secs(5),
        scrape_with(&NodesScraper::new(), &db, &ctx),
    )
    .await
    .expect("scrape returns after the deadline");

    assert!(matches!(result, Err(ScrapeError::DeadlineExceeded)));
}

#[tokio::test]
async fn test_operations_grouped_with_empty_state() {
    let operation = |state: Value, count: u64| {
        vec![
            Value::UInt(2),
            Value::UInt(1),
            Value::from("UPDATE"),
            state,
            Value::UInt(14),
            Value::UInt(0),
            Value::UInt(51),
            Value::UInt(2),
            Value::UInt(245),
            Value::UInt(1),
            Value::UInt(count),
        ]
    };
    let db = FakeDatabase::new().with_rows(
        "ndbinfo.server_operations",
        vec![operation(Value::from("Prepared"), 3), operation(Value::from(""), 1)],
    );

    let (result, metrics) = scrape(&ServerOperationsScraper::new(), &db).await;

    assert!(result.is_ok());
    assert!(db.queries().iter().any(|q| q.contains("IFNULL(state, '') AS state")));
    let states: Vec<_> = metrics.iter().map(|m| (m.label("state"), m.value())).collect();
    assert_eq!(states, vec![(Some("Prepared"), 3.0), (Some(""), 1.0)]);
}

#[tokio::test]
async fn test_dictionary_objects_without_parent() {
    let db = FakeDatabase::new().with_rows(
        "ndbinfo.dict_obj_info",
        vec![vec![
            Value::from("User table"),
            Value::UInt(13),
            Value::UInt(1),
            Value::UInt(4),
            Value::from("0"),
            Value::UInt(0),
            Value::from("shop/def/orders"),
        ]],
    );

    let (result, metrics) = scrape(&DictObjInfoScraper::new(), &db).await;

    assert!(result.is_ok());
    assert!(db.queries().iter().any(|q| q.contains("COALESCE(dot2.type_name, '0')")));
    assert_eq!(metrics.len(), 2);
    assert!(metrics.iter().all(|m| m.label("parent_obj_type") == Some("0")));
    let state = metrics
        .iter()
        .find(|m| m.name() == "mysql_ndbinfo_dict_obj_info_state")
        .expect("state sample");
    assert!((state.value() - 4.0).abs() < f64::EPSILON);
    assert_eq!(state.label("fq_name"), Some("shop/def/orders"));
}
