//! HTTP surface: `/metrics`, `/health` and a landing page.

mod handlers;

use crate::collectors::{
    Database, EngineVersion, config::CollectorConfig, default_registry, driver::CollectorDriver,
    exporter::ScraperCollector,
};
use anyhow::{Context as _, Result};
use arc_swap::ArcSwapOption;
use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request, header},
    routing::get,
};
use secrecy::{ExposeSecret, SecretString};
use sqlx::mysql::MySqlPoolOptions;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn};
use ulid::Ulid;

pub use handlers::{SCRAPE_TIMEOUT_HEADER, effective_timeout, response_status};

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Runtime knobs for the scrape endpoint.
#[derive(Clone, Debug)]
pub struct Settings {
    /// Upper bound for one scrape cycle.
    pub scrape_timeout: Duration,
    /// Subtracted from the Prometheus scrape timeout header.
    pub timeout_offset: Duration,
    /// Answer 503 when any scraper fails.
    pub strict: bool,
    pub max_connections: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            scrape_timeout: Duration::from_secs(10),
            timeout_offset: Duration::from_millis(250),
            strict: false,
            max_connections: 4,
        }
    }
}

/// Shared state behind every request.
pub struct ExporterState {
    driver: CollectorDriver,
    db: Arc<dyn Database>,
    engine_version: ArcSwapOption<EngineVersion>,
    self_metrics: prometheus::Registry,
    settings: Settings,
}

impl ExporterState {
    /// # Errors
    ///
    /// Returns an error if the self-metrics cannot be registered.
    pub fn new(
        driver: CollectorDriver,
        db: Arc<dyn Database>,
        stats: &ScraperCollector,
        settings: Settings,
    ) -> Result<Self> {
        let self_metrics = prometheus::Registry::new();
        stats.register(&self_metrics)?;

        Ok(Self {
            driver,
            db,
            engine_version: ArcSwapOption::empty(),
            self_metrics,
            settings,
        })
    }

    /// Seed the cached engine version (e.g. from startup detection).
    #[must_use]
    pub fn with_engine_version(self, version: Option<EngineVersion>) -> Self {
        self.engine_version.store(version.map(Arc::new));
        self
    }

    #[must_use]
    pub const fn driver(&self) -> &CollectorDriver {
        &self.driver
    }

    #[must_use]
    pub fn cached_engine_version(&self) -> Option<EngineVersion> {
        self.engine_version.load().as_deref().copied()
    }

    /// Cached version, or a fresh detection bounded by `timeout`. A failed
    /// detection is not cached and falls back to the minimum version.
    pub async fn engine_version(&self, timeout: Duration) -> EngineVersion {
        if let Some(version) = self.cached_engine_version() {
            return version;
        }

        match tokio::time::timeout(timeout, EngineVersion::detect(self.db.as_ref())).await {
            Ok(Ok(version)) => {
                info!(%version, "detected engine version");
                self.engine_version.store(Some(Arc::new(version)));
                version
            }
            Ok(Err(err)) => {
                warn!(error = %err, fallback = %EngineVersion::MINIMUM_SUPPORTED, "engine version detection failed");
                EngineVersion::MINIMUM_SUPPORTED
            }
            Err(_) => {
                warn!(fallback = %EngineVersion::MINIMUM_SUPPORTED, "engine version detection timed out");
                EngineVersion::MINIMUM_SUPPORTED
            }
        }
    }
}

#[derive(Clone, Copy, Default)]
struct MakeRequestUlid;

impl MakeRequestId for MakeRequestUlid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Ulid::new().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Build the axum router around `state`.
#[must_use]
pub fn router(state: Arc<ExporterState>) -> Router {
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    Router::new()
        .route("/", get(handlers::index))
        .route("/metrics", get(handlers::metrics))
        .route("/health", get(handlers::health))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(request_id.clone(), MakeRequestUlid))
                .layer(
                    TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        let request_id = request
                            .headers()
                            .get(REQUEST_ID_HEADER)
                            .and_then(|value| value.to_str().ok())
                            .unwrap_or_default();

                        info_span!(
                            "http.request",
                            http.method = %request.method(),
                            http.target = %request.uri(),
                            request_id,
                            otel.kind = "server"
                        )
                    }),
                )
                .layer(PropagateRequestIdLayer::new(request_id))
                .layer(SetResponseHeaderLayer::if_not_present(
                    header::SERVER,
                    HeaderValue::from_static("ndb_exporter"),
                )),
        )
}

/// Connect, build the registry and serve until SIGINT/SIGTERM.
///
/// # Errors
///
/// Returns an error if the database cannot be reached, the registry is
/// inconsistent, or the listener cannot be bound.
#[allow(clippy::needless_pass_by_value)]
pub async fn new(
    port: u16,
    listen: Option<String>,
    dsn: SecretString,
    collectors: Vec<String>,
    settings: Settings,
) -> Result<()> {
    let pool = MySqlPoolOptions::new()
        .max_connections(settings.max_connections)
        .acquire_timeout(settings.scrape_timeout)
        .connect(dsn.expose_secret())
        .await
        .context("failed to connect to database")?;

    let db: Arc<dyn Database> = Arc::new(pool);

    let detected = match EngineVersion::detect(db.as_ref()).await {
        Ok(version) => {
            info!(%version, "detected engine version");
            Some(version)
        }
        Err(err) => {
            warn!(error = %err, "engine version detection failed; retrying on next scrape");
            None
        }
    };

    let registry = Arc::new(default_registry()?);
    let stats = ScraperCollector::new();
    let driver = CollectorDriver::new(registry, CollectorConfig::new().with_enabled(&collectors))?
        .with_stats(stats.clone());

    info!(collectors = ?collectors, "enabled scrapers");

    let state = Arc::new(
        ExporterState::new(driver, db, &stats, settings)?.with_engine_version(detected),
    );

    let listener = bind(port, listen.as_deref()).await?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn bind(port: u16, listen: Option<&str>) -> Result<TcpListener> {
    if let Some(address) = listen {
        return TcpListener::bind((address, port))
            .await
            .with_context(|| format!("failed to bind {address}:{port}"));
    }

    // Dual stack when available.
    match TcpListener::bind(SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), port)).await {
        Ok(listener) => Ok(listener),
        Err(err) => {
            warn!(error = %err, "IPv6 bind failed; falling back to 0.0.0.0");
            TcpListener::bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port))
                .await
                .with_context(|| format!("failed to bind 0.0.0.0:{port}"))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("shutting down");
}
