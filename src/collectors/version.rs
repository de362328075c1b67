//! Engine version handling used for scraper gating.

use super::database::Database;
use super::error::ScrapeError;
use futures::StreamExt;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::fmt;
use tracing::{info_span, instrument};
use tracing_futures::Instrument as _;

const VERSION_QUERY: &str = "SELECT @@version";

/// Backing engine version (`major.minor.patch`), ordered numerically.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EngineVersion {
    major: u32,
    minor: u32,
    patch: u32,
}

impl EngineVersion {
    /// Lowest version the exporter supports. Used when detection fails so
    /// version-gated scrapers are excluded instead of guessed in.
    pub const MINIMUM_SUPPORTED: Self = Self::new(5, 1, 0);

    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    #[must_use]
    pub const fn major(self) -> u32 {
        self.major
    }

    #[must_use]
    pub const fn minor(self) -> u32 {
        self.minor
    }

    #[must_use]
    pub const fn patch(self) -> u32 {
        self.patch
    }

    /// Parse a server version string.
    ///
    /// e.g. "8.0.36-cluster" -> 8.0.36, "8.4" -> 8.4.0, "9" -> 9.0.0.
    /// Returns `None` when the string does not start with a number.
    ///
    /// # Panics
    ///
    /// Panics if the regex cannot be compiled (should never happen).
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn parse(version: &str) -> Option<Self> {
        static RE: OnceCell<Regex> = OnceCell::new();
        let re = RE.get_or_init(|| {
            Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?").expect("Invalid regex")
        });

        let caps = re.captures(version.trim())?;
        let part = |idx: usize| {
            caps.get(idx)
                .map_or(Some(0), |m| m.as_str().parse::<u32>().ok())
        };

        Some(Self::new(part(1)?, part(2)?, part(3)?))
    }

    /// Resolve an optional detected version, falling back to the minimum.
    #[must_use]
    pub fn or_minimum(detected: Option<Self>) -> Self {
        detected.unwrap_or(Self::MINIMUM_SUPPORTED)
    }

    /// Query the engine version through the database handle.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails, returns no rows, or the version
    /// string cannot be parsed.
    #[instrument(skip(db), level = "debug", err)]
    pub async fn detect(db: &dyn Database) -> Result<Self, ScrapeError> {
        let span = info_span!(
            "db.query",
            db.system = "mysql",
            db.operation = "SELECT",
            db.statement = VERSION_QUERY,
            otel.kind = "client"
        );

        let row = db
            .query(VERSION_QUERY)
            .next()
            .instrument(span)
            .await
            .ok_or_else(|| ScrapeError::Query("SELECT @@version returned no rows".to_string()))??;

        let version = row.text(0)?;
        Self::parse(&version)
            .ok_or_else(|| ScrapeError::decode("@@version", format!("unrecognised version {version:?}")))
    }
}

impl fmt::Display for EngineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_engine_version() {
        assert_eq!(EngineVersion::parse("8.0.36-cluster"), Some(EngineVersion::new(8, 0, 36)));
        assert_eq!(EngineVersion::parse("8.4"), Some(EngineVersion::new(8, 4, 0)));
        assert_eq!(EngineVersion::parse("9"), Some(EngineVersion::new(9, 0, 0)));
        assert_eq!(EngineVersion::parse(" 5.7.44-ndb-7.6.30 "), Some(EngineVersion::new(5, 7, 44)));
        assert_eq!(EngineVersion::parse("invalid"), None);
        assert_eq!(EngineVersion::parse(""), None);
    }

    #[test]
    fn test_ordering_is_numeric() {
        assert!(EngineVersion::new(8, 10, 0) > EngineVersion::new(8, 4, 0));
        assert!(EngineVersion::new(8, 4, 0) > EngineVersion::new(8, 0, 36));
        assert!(EngineVersion::new(5, 1, 0) < EngineVersion::new(8, 0, 0));
    }

    #[test]
    fn test_unknown_version_falls_back_to_minimum() {
        assert_eq!(EngineVersion::or_minimum(None), EngineVersion::MINIMUM_SUPPORTED);
        assert_eq!(
            EngineVersion::or_minimum(Some(EngineVersion::new(8, 4, 0))),
            EngineVersion::new(8, 4, 0)
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(EngineVersion::new(8, 0, 36).to_string(), "8.0.36");
    }
}
