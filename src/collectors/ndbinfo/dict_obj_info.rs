use super::{MIN_VERSION, SUBSYSTEM};
use crate::collectors::database::{Row, scrape_rows};
use crate::collectors::metric::static_desc;
use crate::collectors::{
    Database, EngineVersion, Metric, MetricDesc, MetricSink, ScrapeContext, ScrapeError, Scraper,
    ValueType,
};
use futures::future::BoxFuture;
use std::sync::Arc;

const DICT_OBJ_INFO_QUERY: &str = r"
    SELECT
        dot1.type_name AS type,
        doi.id,
        doi.version,
        doi.state,
        COALESCE(dot2.type_name, '0') AS parent_obj_type,
        doi.parent_obj_id,
        doi.fq_name
    FROM ndbinfo.dict_obj_info doi
    JOIN ndbinfo.dict_obj_types dot1
        ON doi.type = dot1.type_id
    LEFT JOIN ndbinfo.dict_obj_types dot2
        ON doi.parent_obj_type = dot2.type_id
        AND doi.parent_obj_type > 0
";

/// Version and state of every dictionary object.
///
/// Top-level objects report `parent_obj_type` as `"0"`.
#[derive(Clone)]
pub struct DictObjInfoScraper {
    version: Arc<MetricDesc>,
    state: Arc<MetricDesc>,
}

impl Default for DictObjInfoScraper {
    fn default() -> Self {
        Self::new()
    }
}

impl DictObjInfoScraper {
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    #[must_use]
    pub fn new() -> Self {
        let labels = ["type", "id", "parent_obj_type", "parent_obj_id", "fq_name"];
        Self {
            version: static_desc(
                SUBSYSTEM,
                "dict_obj_info_version",
                "The object version by type/id/parent_obj_type/parent_obj_id/fq_name.",
                &labels,
                ValueType::Gauge,
            ),
            state: static_desc(
                SUBSYSTEM,
                "dict_obj_info_state",
                "The object state by type/id/parent_obj_type/parent_obj_id/fq_name. For human presentation of states, see documentation.",
                &labels,
                ValueType::Gauge,
            ),
        }
    }

    /// # Errors
    ///
    /// Returns a decode error if a value column is not an unsigned integer.
    pub fn row_metrics(&self, row: &Row) -> Result<Vec<Metric>, ScrapeError> {
        let labels = row.texts([0, 1, 4, 5, 6])?;
        let labels: Vec<&str> = labels.iter().map(String::as_str).collect();

        Ok(vec![
            self.version.metric(row.uint_value(2)?, &labels)?,
            self.state.metric(row.uint_value(3)?, &labels)?,
        ])
    }
}

impl Scraper for DictObjInfoScraper {
    fn name(&self) -> &'static str {
        "ndbinfo.dict_obj_info"
    }

    fn help(&self) -> &'static str {
        "Collect metrics from ndbinfo.dict_obj_info"
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
            scrape_rows(ctx, db, sink, DICT_OBJ_INFO_QUERY, |row| self.row_metrics(row)).await?;
            Ok(())
        })
    }
}
