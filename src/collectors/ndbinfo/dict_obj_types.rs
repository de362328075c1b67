use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const DICT_OBJ_TYPES_QUERY: &str = r"
    SELECT
        type_id,
        type_name
    FROM ndbinfo.dict_obj_types
";

/// One sample per dictionary object type.
#[derive(Clone)]
pub struct DictObjTypesScraper {
    types: Arc<MetricDesc>,
}

impl Default for DictObjTypesScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl DictObjTypesScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            types: static_desc(
                SUBSYSTEM,
                "dict_obj_types",
                "Returns 1 for every dictionary object type by type_id/type_name.",
                &["type_id", "type_name"],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a label column is missing.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts(0..2)?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![self.types.metric(1.0, &labels)?])
    }
}

impl Scraper for DictObjTypesScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.dict_obj_types"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.dict_obj_types"
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
            scrape_rows(ctx, db, sink, DICT_OBJ_TYPES_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
