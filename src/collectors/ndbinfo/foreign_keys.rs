use super::{MIN_VERSION, SUBSYSTEM, with_label};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const FOREIGN_KEYS_QUERY: &str = r"
    SELECT
        object_id,
        name,
        parent_table,
        parent_columns,
        child_table,
        child_columns,
        parent_index,
        child_index,
        on_update_action,
        on_delete_action
    FROM ndbinfo.foreign_keys
";

/// Number of parent and child columns of every foreign key.
#[derive(Clone)]
pub struct ForeignKeysScraper {
    columns: Arc<MetricDesc>,
}

impl Default for ForeignKeysScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl ForeignKeysScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            columns: static_desc(
                SUBSYSTEM,
                "foreign_keys_columns",
                "The amount of columns by object_id/name/parent_table/child_table/parent_index/child_index/on_update_action/on_delete_action/column_type.",
                &[
                    "object_id",
                    "name",
                    "parent_table",
                    "child_table",
                    "parent_index",
                    "child_index",
                    "on_update_action",
                    "on_delete_action",
                    "column_type",
                ],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a label column is missing.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 1, 2, 4, 6, 7, 8, 9])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.columns
                .metric(column_count(&row.text(3)?), &with_label(&labels, "parent"))?,
            self.columns
                .metric(column_count(&row.text(5)?), &with_label(&labels, "child"))?,
        ])
    }
}

/// Numeric column lists are taken as counts, otherwise the names are counted.
#[allow(clippy::cast_precision_loss)]
fn column_count(columns: &str) -> f64 {
    let columns = columns.trim();
    if let Ok(count) = columns.parse::<u64>() {
        return count as f64;
    }
    columns.split(',').filter(|c| !c.trim().is_empty()).count() as f64
}

impl Scraper for ForeignKeysScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.foreign_keys"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.foreign_keys"
    }

    fn min_version(&self) -> EngineVersion {
        MIN_VERSION
    }

    fn scrape<'a>(
        &'a self,
        ctx: &'a ScrapeContext,
        db: &'a dyn Database,
        sink: &'a MetricSink,
    ) -> BoxFuture<'a, Result<(), ScrapeError>> {
        Box::pin(async move {
            scrape_rows(ctx, db, sink, FOREIGN_KEYS_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::collectors::database::Value;

    #[test]
    fn test_column_lists_are_counted() {
        assert!((column_count("id,tenant_id") - 2.0).abs() < f64::EPSILON);
        assert!((column_count("id") - 1.0).abs() < f64::EPSILON);
        assert!(column_count("").abs() < f64::EPSILON);
        assert!((column_count("3") - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_parent_and_child_samples() {
        let scraper = ForeignKeysScraper::new();
        let row = Row::new(
            (0..10).map(|i| format!("c{i}")).collect(),
            vec![
                Value::UInt(21),
                Value::from("fk_orders_customer"),
                Value::from("shop/def/customers"),
                Value::from("id"),
                Value::from("shop/def/orders"),
                Value::from("customer_id"),
                Value::from("PRIMARY KEY"),
                Value::from("idx_customer"),
                Value::from("No Action"),
                Value::from("Cascade"),
            ],
        );

        let metrics = scraper.row_metrics(&row).expect("valid row");

        assert_eq!(metrics.len(), 2);
        assert_eq!(metrics[0].label("column_type"), Some("parent"));
        assert_eq!(metrics[1].label("on_delete_action"), Some("Cascade"));
        assert!((metrics[1].value() - 1.0).abs() < f64::EPSILON);
    }
}
