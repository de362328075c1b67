//! Database handle abstraction used by scrapers.
//!
//! Scrapers only see [`Database`], which yields decoded [`Row`]s as a stream.
//! The production handle is a `sqlx::MySqlPool`; tests plug in an in-memory
//! implementation.

use super::ScrapeContext;
use super::error::ScrapeError;
use super::metric::{Metric, MetricSink};
use futures::StreamExt;
use futures::stream::BoxStream;
use sqlx::mysql::MySqlRow;
use sqlx::{Column as _, MySqlPool, Row as _, TypeInfo as _, ValueRef as _};
use std::sync::Arc;
use tracing::{info_span, trace};
use tracing_futures::Instrument as _;

/// Handle capable of running read-only diagnostic queries.
///
/// Must be safe for concurrent use: every scraper of a cycle shares it.
pub trait Database: Send + Sync {
    /// Run `sql` and stream the decoded rows. A failing query surfaces as the
    /// first item of the stream. Dropping the stream releases the result set.
    fn query<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Row, ScrapeError>>;
}

impl Database for MySqlPool {
    fn query<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Row, ScrapeError>> {
        sqlx::query(sql)
            .fetch(self)
            .map(|res| res.map_err(ScrapeError::from).and_then(|row| Row::try_from(&row)))
            .boxed()
    }
}

impl<T: Database + ?Sized> Database for Arc<T> {
    fn query<'a>(&'a self, sql: &'a str) -> BoxStream<'a, Result<Row, ScrapeError>> {
        (**self).query(sql)
    }
}

/// A single decoded column value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::UInt(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// One result row. Accessors coalesce `NULL` to `""` for text and `0` for
/// numbers so a null never reaches a label or a sample value.
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    #[must_use]
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn column_name(&self, idx: usize) -> String {
        self.columns
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("#{idx}"))
    }

    fn value(&self, idx: usize) -> Result<&Value, ScrapeError> {
        self.values.get(idx).ok_or_else(|| {
            ScrapeError::decode(
                self.column_name(idx),
                format!("index out of bounds (row has {} columns)", self.values.len()),
            )
        })
    }

    /// Column as text; `NULL` becomes `""`, numbers are formatted.
    ///
    /// # Errors
    ///
    /// Returns a decode error if the column index is out of range.
    pub fn text(&self, idx: usize) -> Result<String, ScrapeError> {
        Ok(match self.value(idx)? {
            Value::Null => String::new(),
            Value::Int(v) => v.to_string(),
            Value::UInt(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Text(v) => v.clone(),
        })
    }

    /// Text of several columns, in the given order.
    ///
    /// # Errors
    ///
    /// Returns a decode error if any column index is out of range.
    pub fn texts(&self, columns: impl IntoIterator<Item = usize>) -> Result<Vec<String>, ScrapeError> {
        columns.into_iter().map(|idx| self.text(idx)).collect()
    }

    /// Column as an unsigned integer; `NULL` becomes `0`.
    ///
    /// # Errors
    ///
    /// Returns a decode error for negative, fractional or non-numeric values.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn uint(&self, idx: usize) -> Result<u64, ScrapeError> {
        let invalid = |reason: String| ScrapeError::decode(self.column_name(idx), reason);

        match self.value(idx)? {
            Value::Null => Ok(0),
            Value::UInt(v) => Ok(*v),
            Value::Int(v) => u64::try_from(*v).map_err(|_| invalid(format!("negative value {v}"))),
            Value::Float(v) => {
                if v.is_finite() && *v >= 0.0 && v.fract() == 0.0 {
                    Ok(*v as u64)
                } else {
                    Err(invalid(format!("not an unsigned integer: {v}")))
                }
            }
            Value::Text(v) => v
                .trim()
                .parse::<u64>()
                .map_err(|e| invalid(format!("{v:?}: {e}"))),
        }
    }

    /// Column as a float; `NULL` becomes `0.0`.
    ///
    /// # Errors
    ///
    /// Returns a decode error for non-numeric text.
    #[allow(clippy::cast_precision_loss)]
    pub fn float(&self, idx: usize) -> Result<f64, ScrapeError> {
        match self.value(idx)? {
            Value::Null => Ok(0.0),
            Value::Int(v) => Ok(*v as f64),
            Value::UInt(v) => Ok(*v as f64),
            Value::Float(v) => Ok(*v),
            Value::Text(v) => v
                .trim()
                .parse::<f64>()
                .map_err(|e| ScrapeError::decode(self.column_name(idx), format!("{v:?}: {e}"))),
        }
    }

    /// Unsigned column converted to a sample value.
    ///
    /// # Errors
    ///
    /// See [`Row::uint`].
    #[allow(clippy::cast_precision_loss)]
    pub fn uint_value(&self, idx: usize) -> Result<f64, ScrapeError> {
        self.uint(idx).map(|v| v as f64)
    }
}

enum ColumnKind {
    Signed,
    Unsigned,
    Float,
    Text,
}

impl ColumnKind {
    fn of(type_name: &str) -> Self {
        let integer = matches!(
            type_name.trim_end_matches(" UNSIGNED"),
            "BOOLEAN" | "TINYINT" | "SMALLINT" | "MEDIUMINT" | "INT" | "BIGINT" | "YEAR"
        );
        if integer && type_name.ends_with(" UNSIGNED") {
            Self::Unsigned
        } else if integer {
            Self::Signed
        } else if matches!(type_name, "FLOAT" | "DOUBLE") {
            Self::Float
        } else {
            Self::Text
        }
    }
}

impl TryFrom<&MySqlRow> for Row {
    type Error = ScrapeError;

    fn try_from(row: &MySqlRow) -> Result<Self, Self::Error> {
        let columns: Arc<[String]> = row
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let mut values = Vec::with_capacity(columns.len());
        for idx in 0..columns.len() {
            values.push(decode_column(row, idx)?);
        }

        Ok(Self { columns, values })
    }
}

fn decode_column(row: &MySqlRow, idx: usize) -> Result<Value, ScrapeError> {
    let kind = {
        let raw = row.try_get_raw(idx)?;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        ColumnKind::of(&raw.type_info().name().to_ascii_uppercase())
    };

    Ok(match kind {
        ColumnKind::Signed => Value::Int(row.try_get_unchecked::<i64, _>(idx)?),
        ColumnKind::Unsigned => Value::UInt(row.try_get_unchecked::<u64, _>(idx)?),
        ColumnKind::Float => Value::Float(row.try_get_unchecked::<f64, _>(idx)?),
        // DECIMAL and string-like columns arrive as text on the wire.
        ColumnKind::Text => Value::Text(row.try_get_unchecked::<String, _>(idx)?),
    })
}

/// Run `query` and feed every row through `per_row`, sending the produced
/// metrics to `sink`.
///
/// A row's metrics are only sent once the whole row decoded successfully.
/// Metrics of earlier rows stay in the sink when a later row fails. The
/// result stream is dropped on every exit path. Returns the number of rows.
///
/// # Errors
///
/// Returns the first query or decode error, or a cancellation error when the
/// context is cancelled or its deadline passes mid-iteration.
pub async fn scrape_rows<F>(
    ctx: &ScrapeContext,
    db: &dyn Database,
    sink: &MetricSink,
    query: &str,
    mut per_row: F,
) -> Result<usize, ScrapeError>
where
    F: FnMut(&Row) -> Result<Vec<Metric>, ScrapeError> + Send,
{
    if let Some(err) = ctx.check() {
        return Err(err);
    }

    let span = info_span!(
        "db.query",
        db.system = "mysql",
        db.operation = "SELECT",
        db.statement = query,
        otel.kind = "client"
    );

    async {
        let mut rows = db.query(query);
        let mut count = 0;

        loop {
            let next = tokio::select! {
                biased;
                err = ctx.done() => return Err(err),
                next = rows.next() => next,
            };

            let Some(row) = next else {
                break;
            };

            let metrics = per_row(&row?)?;
            sink.send_all(metrics);
            count += 1;
        }

        trace!(rows = count, "query complete");
        Ok(count)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use super::*;

    fn row(values: Vec<Value>) -> Row {
        let columns: Arc<[String]> = (0..values.len()).map(|i| format!("c{i}")).collect();
        Row::new(columns, values)
    }

    #[test]
    fn test_null_text_coalesces_to_empty_string() {
        let row = row(vec![Value::Null, Value::from("STARTED")]);
        assert_eq!(row.text(0).expect("null text"), "");
        assert_eq!(row.text(1).expect("text"), "STARTED");
    }

    #[test]
    fn test_null_numbers_coalesce_to_zero() {
        let row = row(vec![Value::Null]);
        assert_eq!(row.uint(0).expect("null uint"), 0);
        assert!(row.float(0).expect("null float").abs() < f64::EPSILON);
    }

    #[test]
    fn test_numbers_format_as_text_labels() {
        let row = row(vec![Value::UInt(3), Value::Int(-1)]);
        assert_eq!(row.text(0).expect("uint text"), "3");
        assert_eq!(row.text(1).expect("int text"), "-1");
    }

    #[test]
    fn test_texts_follow_requested_order() {
        let row = row(vec![Value::UInt(1), Value::from("a"), Value::Null]);
        assert_eq!(row.texts([2, 0, 1]).expect("texts"), vec!["", "1", "a"]);
        assert!(row.texts([0, 3]).is_err());
    }

    #[test]
    fn test_uint_decode_errors_name_the_column() {
        let row = row(vec![Value::from("abc"), Value::Int(-5), Value::Float(1.5)]);
        assert!(matches!(row.uint(0), Err(ScrapeError::Decode { ref column, .. }) if column == "c0"));
        assert!(row.uint(1).is_err());
        assert!(row.uint(2).is_err());
        assert!(matches!(row.uint(7), Err(ScrapeError::Decode { .. })));
    }

    #[test]
    fn test_text_numbers_parse() {
        let row = row(vec![Value::from(" 42 "), Value::from("1.25")]);
        assert_eq!(row.uint(0).expect("numeric text"), 42);
        assert!((row.float(1).expect("float text") - 1.25).abs() < f64::EPSILON);
    }

    #[test]
    fn test_option_into_value() {
        assert_eq!(Value::from(None::<u64>), Value::Null);
        assert_eq!(Value::from(Some(7_u64)), Value::UInt(7));
    }

    #[test]
    fn test_column_kind_classification() {
        assert!(matches!(ColumnKind::of("BIGINT UNSIGNED"), ColumnKind::Unsigned));
        assert!(matches!(ColumnKind::of("INT"), ColumnKind::Signed));
        assert!(matches!(ColumnKind::of("DOUBLE"), ColumnKind::Float));
        assert!(matches!(ColumnKind::of("DECIMAL"), ColumnKind::Text));
        assert!(matches!(ColumnKind::of("VARCHAR"), ColumnKind::Text));
    }
}
