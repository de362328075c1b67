macro_rules! register_scrapers {
    (
        $(
            $name:literal => $scraper:ty
        ),* $(,)?
    ) => {
        /// Builds a fresh scraper instance.
        pub type ScraperFactory = fn() -> std::sync::Arc<dyn Scraper>;

        // Generate the factory list; every listed type must implement `Scraper`.
        #[must_use]
        pub fn all_factories() -> Vec<(&'static str, ScraperFactory)> {
            vec![
                $(
                    (
                        $name,
                        (|| std::sync::Arc::new(<$scraper>::new()) as std::sync::Arc<dyn Scraper>)
                            as ScraperFactory,
                    ),
                )*
            ]
        }

        // Generate array of scraper names
        pub const SCRAPER_NAMES: &[&'static str] = &[
            $($name,)*
        ];

        /// Registry holding every built-in scraper.
        ///
        /// # Errors
        ///
        /// Returns an error if two scrapers share a name or a scraper reports
        /// a name different from the one it is listed under.
        pub fn default_registry() -> Result<registry::ScraperRegistry, RegistryError> {
            let mut registry = registry::ScraperRegistry::new();
            for (name, factory) in all_factories() {
                registry.register_factory(name, factory)?;
            }
            Ok(registry)
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::collectors::{SCRAPER_NAMES, all_factories, default_registry};
    use std::collections::HashSet;

    #[test]
    fn test_all_factories_exist() {
        let factories = all_factories();

        assert!(!factories.is_empty());
        assert_eq!(factories.len(), SCRAPER_NAMES.len());
    }

    #[test]
    fn test_scraper_names_are_unique() {
        let unique: HashSet<_> = SCRAPER_NAMES.iter().collect();
        assert_eq!(unique.len(), SCRAPER_NAMES.len());
    }

    #[test]
    fn test_scraper_name_matches_key() {
        for (key, factory) in all_factories() {
            let scraper = factory();
            assert_eq!(scraper.name(), key);
            assert!(!scraper.help().is_empty(), "Scraper {key} has empty help");
        }
    }

    #[test]
    fn test_default_registry_builds() {
        let registry = default_registry();
        assert!(registry.is_ok(), "default registry failed: {:?}", registry.err());
    }

    #[test]
    fn test_nodes_scraper_enabled_by_default() {
        let factories = all_factories();

        let nodes = factories.iter().find(|(name, _)| *name == "ndbinfo.nodes");
        assert!(nodes.is_some_and(|(_, factory)| factory().enabled_by_default()));
    }

    #[test]
    fn test_every_ndbinfo_view_registered() {
        let ndbinfo = SCRAPER_NAMES
            .iter()
            .filter(|name| name.starts_with("ndbinfo."))
            .count();

        assert_eq!(ndbinfo, 46);
        assert_eq!(SCRAPER_NAMES.len(), 49);
    }

    #[test]
    fn test_only_core_scrapers_enabled_by_default() {
        let enabled: Vec<_> = all_factories()
            .into_iter()
            .filter(|(_, factory)| factory().enabled_by_default())
            .map(|(name, _)| name)
            .collect();

        assert_eq!(
            enabled,
            vec![
                "ndbinfo.counters",
                "ndbinfo.logbuffers",
                "ndbinfo.logspaces",
                "ndbinfo.memoryusage",
                "ndbinfo.nodes",
                "ndbinfo.transporters",
            ]
        );
    }
}
