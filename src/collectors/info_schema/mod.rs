//! Scrapers for NDB tables in `information_schema`.

mod ndb_transid_mysql_connection_map;

pub use ndb_transid_mysql_connection_map::NdbTransidMysqlConnectionMapScraper;

pub const SUBSYSTEM: &str = "info_schema";
