use thiserror::Error;

/// Errors raised while building metric descriptors or metrics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("metric {metric}: expected {expected} label values, got {got}")]
    LabelArity {
        metric: String,
        expected: usize,
        got: usize,
    },

    #[error("metric {metric}: invalid descriptor: {reason}")]
    InvalidDescriptor { metric: String, reason: String },
}

/// Errors a scraper can return from a single scrape.
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// The database rejected or failed the query.
    #[error("query failed: {0}")]
    Query(String),

    /// A result row could not be converted into the expected types.
    #[error("decode failed for column {column:?}: {reason}")]
    Decode { column: String, reason: String },

    #[error(transparent)]
    Metric(#[from] MetricError),

    /// The scrape was cancelled by the caller.
    #[error("scrape cancelled")]
    Cancelled,

    /// The scrape cycle deadline expired.
    #[error("scrape deadline exceeded")]
    DeadlineExceeded,
}

impl ScrapeError {
    pub fn decode(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Decode {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Stable reason label used in logs and self-metrics.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Query(_) => "query",
            Self::Decode { .. } => "decode",
            Self::Metric(_) => "metric",
            Self::Cancelled => "cancelled",
            Self::DeadlineExceeded => "timeout",
        }
    }

    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

impl From<sqlx::Error> for ScrapeError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::ColumnDecode { index, source } => Self::decode(index, source.to_string()),
            sqlx::Error::ColumnNotFound(column) => Self::decode(column, "column not found"),
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => {
                Self::decode(index.to_string(), format!("index out of bounds (row has {len} columns)"))
            }
            sqlx::Error::Decode(source) => Self::decode("", source.to_string()),
            other => Self::Query(other.to_string()),
        }
    }
}

/// Errors raised while building the scraper registry at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("scraper {0:?} registered more than once")]
    Duplicate(String),

    #[error("scraper descriptor {declared:?} does not match instance name {actual:?}")]
    NameMismatch { declared: String, actual: String },

    #[error("scraper {0:?} not found")]
    NotFound(String),
}
