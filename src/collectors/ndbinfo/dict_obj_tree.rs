use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const DICT_OBJ_TREE_QUERY: &str = r"
    SELECT
        type,
        id,
        name,
        parent_type,
        parent_id,
        parent_name,
        root_type,
        root_id,
        root_name,
        level,
        path,
        indented_name
    FROM ndbinfo.dict_obj_tree
";

#[derive(Clone)]
pub struct DictObjTreeScraper {
    level: Arc<MetricDesc>,
}

impl Default for DictObjTreeScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl DictObjTreeScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        Self {
            level: static_desc(
                SUBSYSTEM,
                "dict_obj_tree_level",
                "Level of the object in the hierarchy by type/id/name/parent_type/parent_id/parent_name/root_type/root_id/root_name/path/indented_name.",
                &[
                    "type",
                    "id",
                    "name",
                    "parent_type",
                    "parent_id",
                    "parent_name",
                    "root_type",
                    "root_id",
                    "root_name",
                    "path",
                    "indented_name",
                ],
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 1, 2, 3, 4, 5, 6, 7, 8, 10, 11])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![self.level.metric(row.uint_value(9)?, &labels)?])
    }
}

impl Scraper for DictObjTreeScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.dict_obj_tree"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.dict_obj_tree"
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
            scrape_rows(ctx, db, sink, DICT_OBJ_TREE_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
