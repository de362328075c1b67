use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use ndb_exporter::collectors::database::{Row, Value};
use ndb_exporter::collectors::registry::ScraperRegistry;
use ndb_exporter::collectors::{
    Database, EngineVersion, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
};
use std::env;
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// DSN of a live cluster SQL node, if the environment provides one.
#[allow(dead_code)]
pub fn get_test_dsn() -> Option<String> {
    env::var("NDB_EXPORTER_DSN").ok().filter(|dsn| !dsn.is_empty())
}

/// Get an available port for testing
#[allow(dead_code)]
pub fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to ephemeral port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

/// Build test URL for HTTP requests
#[allow(dead_code)]
pub fn get_test_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// Wait for server to be ready
#[allow(dead_code)]
pub async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    for _ in 0..max_attempts {
        if tokio::net::TcpStream::connect(format!("127.0.0.1:{port}"))
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }
    false
}

/// What the fake database answers for a query.
#[allow(dead_code)]
#[derive(Clone, Debug)]
pub enum Response {
    Rows(Vec<Vec<Value>>),
    Fail(String),
    /// Yield the rows, then fail.
    RowsThenError(Vec<Vec<Value>>, String),
    /// Never yield anything.
    Hang,
}

/// In-memory [`Database`]: answers are matched by substring of the SQL text.
/// `SELECT 1` succeeds and `SELECT @@version` reports 8.4.0 unless overridden.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeDatabase {
    responses: Vec<(String, Response)>,
    queries: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl FakeDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, needle: &str, response: Response) -> Self {
        self.responses.push((needle.to_string(), response));
        self
    }

    pub fn with_rows(self, needle: &str, rows: Vec<Vec<Value>>) -> Self {
        self.with(needle, Response::Rows(rows))
    }

    pub fn with_version(self, version: &str) -> Self {
        self.with_rows("@@version", vec![vec![Value::from(version)]])
    }

    /// Make the `SELECT 1` health probe fail.
    pub fn unreachable(self) -> Self {
        self.with("SELECT 1", Response::Fail("connection refused".to_string()))
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn response(&self, sql: &str) -> Option<Response> {
        if let Some((_, response)) = self.responses.iter().find(|(needle, _)| sql.contains(needle.as_str())) {
            return Some(response.clone());
        }

        if sql.contains("@@version") {
            return Some(Response::Rows(vec![vec![Value::from("8.4.0-cluster")]]));
        }

        if sql.trim() == "SELECT 1" {
            return Some(Response::Rows(vec![vec![Value::Int(1)]]));
        }

        None
    }
}

#[allow(dead_code)]
pub fn row(values: Vec<Value>) -> Row {
    let columns: Arc<[String]> = (0..values.len()).map(|i| format!("c{i}")).collect();
    Row::new(columns, values)
}

impl Database for FakeDatabase {
    fn query<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Row, ScrapeError>> {
        self.queries.lock().unwrap().push(sql.to_string());

        match self.response(sql) {
            Some(Response::Rows(rows)) => stream::iter(rows.into_iter().map(|values| Ok(row(values)))).boxed(),
            Some(Response::Fail(message)) => stream::iter([Err(ScrapeError::Query(message))]).boxed(),
            Some(Response::RowsThenError(rows, message)) => stream::iter(rows.into_iter().map(|values| Ok(row(values))))
                .chain(stream::iter([Err(ScrapeError::Query(message))]))
                .boxed(),
            Some(Response::Hang) => stream::pending().boxed(),
            None => stream::empty().boxed(),
        }
    }
}

/// How a [`FakeScraper`] behaves when scraped.
#[allow(dead_code)]
#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    /// Emit one sample and succeed.
    Emit,
    Fail,
    /// Wait for the context, then report why it ended.
    Cooperative,
    /// Never return and never look at the context.
    Stuck,
}

pub struct FakeScraper {
    name: &'static str,
    min_version: EngineVersion,
    enabled_by_default: bool,
    behavior: Behavior,
    value: Arc<MetricDesc>,
}

#[allow(dead_code)]
impl FakeScraper {
    pub fn new(name: &'static str, behavior: Behavior) -> Self {
        Self {
            name,
            min_version: EngineVersion::MINIMUM_SUPPORTED,
            enabled_by_default: true,
            behavior,
            value: MetricDesc::gauge("fake_value", "Value emitted by fake scrapers.", &["scraper"])
                .expect("static descriptor"),
        }
    }

    pub const fn min_version(mut self, version: EngineVersion) -> Self {
        self.min_version = version;
        self
    }

    pub const fn disabled_by_default(mut self) -> Self {
        self.enabled_by_default = false;
        self
    }
}

impl Scraper for FakeScraper {
    fn name(&self) -> &'static str {
        self.name
    }

    fn help(&self) -> &'static str {
        "Fake scraper for tests"
    }

    fn min_version(&self) -> EngineVersion {
        self.min_version
    }

    fn enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }

    fn scrape<'a>(
        &'a self,
        ctx: &'a ScrapeContext,
        _db: &'a dyn Database,
        sink: &'a MetricSink,
    ) -> BoxFuture<'a, Result<(), ScrapeError>> {
        Box::pin(async move {
            match self.behavior {
                Behavior::Emit => {
                    sink.send(self.value.metric(1.0, &[self.name])?);
                    Ok(())
                }
                Behavior::Fail => Err(ScrapeError::Query(format!("{} exploded", self.name))),
                Behavior::Cooperative => Err(ctx.done().await),
                Behavior::Stuck => futures::future::pending().await,
            }
        })
    }
}

/// Registry holding the given scrapers, all enabled.
#[allow(dead_code)]
pub fn registry_of(factories: &[fn() -> Arc<dyn Scraper>]) -> Arc<ScraperRegistry> {
    let mut registry = ScraperRegistry::new();
    for factory in factories {
        let name = factory().name();
        registry
            .register_factory(name, *factory)
            .expect("fake scrapers have unique names");
    }
    Arc::new(registry)
}

#[allow(dead_code)]
pub fn enabled(registry: &ScraperRegistry) -> Vec<String> {
    registry.names().into_iter().map(ToString::to_string).collect()
}
