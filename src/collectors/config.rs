use std::collections::HashSet;
use tracing::debug;

/// Scrapers enabled at startup via `--collector.<name>` flags.
#[derive(Clone, Debug, Default)]
pub struct CollectorConfig {
    pub enabled_collectors: HashSet<String>,
}

impl CollectorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_enabled(mut self, collectors: &[String]) -> Self {
        self.enabled_collectors = collectors.iter().cloned().collect();
        self
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled_collectors.contains(name)
    }
}

/// Per-request include/exclude lists (`collect[]` / `exclude[]`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScrapeSelection {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl ScrapeSelection {
    /// Selection that allows every enabled scraper.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn include<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include.extend(names.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn exclude<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude.extend(names.into_iter().map(Into::into));
        self
    }

    /// Parse `collect[]=a&collect[]=b&exclude[]=c` from a raw query string.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut selection = Self::default();

        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }

            match key.as_ref() {
                "collect[]" | "collect" => {
                    selection.include.insert(value.to_string());
                }
                "exclude[]" | "exclude" => {
                    selection.exclude.insert(value.to_string());
                }
                other => debug!(param = other, "ignoring unknown query parameter"),
            }
        }

        selection
    }

    /// An empty include list means "everything enabled".
    #[must_use]
    pub fn allows(&self, name: &str) -> bool {
        (self.include.is_empty() || self.include.contains(name)) && !self.exclude.contains(name)
    }

    /// Names in this selection that are not in `known`.
    pub fn unknown<'a>(&'a self, known: &'a [&'static str]) -> impl Iterator<Item = &'a str> + 'a {
        self.include
            .iter()
            .chain(&self.exclude)
            .map(String::as_str)
            .filter(move |name| !known.contains(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_config_enabled() {
        let config = CollectorConfig::new().with_enabled(&["ndbinfo.nodes".to_string()]);

        assert!(config.is_enabled("ndbinfo.nodes"));
        assert!(!config.is_enabled("ndbinfo.counters"));
    }

    #[test]
    fn test_empty_selection_allows_everything() {
        let selection = ScrapeSelection::all();
        assert!(selection.allows("ndbinfo.nodes"));
    }

    #[test]
    fn test_from_query() {
        let selection = ScrapeSelection::from_query(
            "collect%5B%5D=ndbinfo.nodes&collect[]=ndbinfo.counters&exclude[]=ndbinfo.counters&foo=bar",
        );

        assert!(selection.allows("ndbinfo.nodes"));
        assert!(!selection.allows("ndbinfo.counters"));
        assert!(!selection.allows("ndbinfo.memoryusage"));
    }

    #[test]
    fn test_exclude_only() {
        let selection = ScrapeSelection::all().exclude(["ndbinfo.threadstat"]);

        assert!(selection.allows("ndbinfo.nodes"));
        assert!(!selection.allows("ndbinfo.threadstat"));
    }

    #[test]
    fn test_unknown_names() {
        let selection = ScrapeSelection::all().include(["ndbinfo.nodes", "bogus"]);
        let unknown: Vec<_> = selection.unknown(&["ndbinfo.nodes"]).collect();

        assert_eq!(unknown, vec!["bogus"]);
    }
}
