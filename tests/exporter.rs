#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]
#![allow(clippy::indexing_slicing)]
//! Runs against a live SQL node only when `NDB_EXPORTER_DSN` is set.

use anyhow::Result;
use ndb_exporter::exporter::Settings;
use secrecy::SecretString;
use tokio::task::JoinHandle;

mod common;

fn spawn_exporter(port: u16, listen: Option<&str>, dsn: String) -> JoinHandle<Result<()>> {
    let listen = listen.map(ToString::to_string);
    tokio::spawn(async move {
        ndb_exporter::exporter::new(
            port,
            listen,
            SecretString::from(dsn),
            vec!["ndbinfo.nodes".to_string(), "ndbinfo.memoryusage".to_string()],
            Settings::default(),
        )
        .await
    })
}

#[tokio::test]
async fn test_exporter_metrics_endpoint() -> Result<()> {
    let Some(dsn) = common::get_test_dsn() else {
        eprintln!("NDB_EXPORTER_DSN not set; skipping");
        return Ok(());
    };

    let port = common::get_available_port();
    let handle = spawn_exporter(port, Some("127.0.0.1"), dsn);

    assert!(
        common::wait_for_server(port, 50).await,
        "Server failed to start on port {port}"
    );

    let response = reqwest::Client::new()
        .get(format!("{}/metrics", common::get_test_url(port)))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body = response.text().await?;
    assert!(body.contains("mysql_up 1"), "{body}");
    assert!(body.contains(r#"mysql_exporter_scraper_success{scraper="ndbinfo.nodes"} 1"#));
    assert!(body.contains("mysql_ndbinfo_nodes_uptime_total"));

    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_exporter_health_endpoint() -> Result<()> {
    let Some(dsn) = common::get_test_dsn() else {
        eprintln!("NDB_EXPORTER_DSN not set; skipping");
        return Ok(());
    };

    let port = common::get_available_port();
    let handle = spawn_exporter(port, None, dsn);

    assert!(
        common::wait_for_server(port, 50).await,
        "Server failed to start with auto-detect on port {port}"
    );

    let json: serde_json::Value = reqwest::Client::new()
        .get(format!("{}/health", common::get_test_url(port)))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(json["status"], "ok");
    assert!(json["engine_version"].is_string());

    handle.abort();

    Ok(())
}

#[tokio::test]
async fn test_exporter_starts_and_stops() -> Result<()> {
    let Some(dsn) = common::get_test_dsn() else {
        eprintln!("NDB_EXPORTER_DSN not set; skipping");
        return Ok(());
    };

    let port = common::get_available_port();
    let handle = spawn_exporter(port, Some("127.0.0.1"), dsn);

    assert!(
        common::wait_for_server(port, 50).await,
        "Server failed to start on port {port}"
    );

    handle.abort();

    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

    let result = tokio::net::TcpStream::connect(format!("127.0.0.1:{port}")).await;
    assert!(result.is_err(), "Server should be stopped");

    Ok(())
}

#[tokio::test]
async fn test_exporter_fails_without_database() {
    let port = common::get_available_port();
    let handle = spawn_exporter(port, Some("127.0.0.1"), "mysql://root@127.0.0.1:1/ndbinfo".to_string());

    let result = handle.await.expect("task completes");

    assert!(result.is_err(), "startup must fail when the database is unreachable");
}
