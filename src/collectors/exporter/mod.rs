mod scraper;

pub use scraper::{ScrapeTimer, ScraperCollector};
