use super::config::{CollectorConfig, ScrapeSelection};
use super::error::RegistryError;
use super::version::EngineVersion;
use super::{Scraper, ScraperFactory};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Identity of a registered scraper.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScraperDescriptor {
    pub name: &'static str,
    pub help: &'static str,
    pub min_version: EngineVersion,
    pub enabled_by_default: bool,
}

impl ScraperDescriptor {
    /// Describe `scraper` under the name it is registered as.
    #[must_use]
    pub fn of(name: &'static str, scraper: &dyn Scraper) -> Self {
        Self {
            name,
            help: scraper.help(),
            min_version: scraper.min_version(),
            enabled_by_default: scraper.enabled_by_default(),
        }
    }
}

struct Entry {
    descriptor: ScraperDescriptor,
    scraper: Arc<dyn Scraper>,
}

/// Scrapers keyed by name. Built once at startup, read-only afterwards.
///
/// Iteration is sorted by name.
#[derive(Default)]
pub struct ScraperRegistry {
    entries: BTreeMap<&'static str, Entry>,
}

impl ScraperRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scraper built by `factory`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Duplicate`] if the name is already taken and
    /// [`RegistryError::NameMismatch`] if the instance reports a different name.
    pub fn register(
        &mut self,
        descriptor: ScraperDescriptor,
        factory: ScraperFactory,
    ) -> Result<(), RegistryError> {
        if self.entries.contains_key(descriptor.name) {
            return Err(RegistryError::Duplicate(descriptor.name.to_string()));
        }

        let scraper = factory();
        if scraper.name() != descriptor.name {
            return Err(RegistryError::NameMismatch {
                declared: descriptor.name.to_string(),
                actual: scraper.name().to_string(),
            });
        }

        debug!(scraper = descriptor.name, min_version = %descriptor.min_version, "registered scraper");

        self.entries.insert(descriptor.name, Entry { descriptor, scraper });

        Ok(())
    }

    /// Register with a descriptor read from the scraper itself.
    ///
    /// # Errors
    ///
    /// See [`ScraperRegistry::register`].
    pub fn register_factory(
        &mut self,
        name: &'static str,
        factory: ScraperFactory,
    ) -> Result<(), RegistryError> {
        let descriptor = ScraperDescriptor::of(name, factory().as_ref());
        self.register(descriptor, factory)
    }

    /// # Errors
    ///
    /// Returns [`RegistryError::NotFound`] for an unknown name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Scraper>, RegistryError> {
        self.entries
            .get(name)
            .map(|entry| Arc::clone(&entry.scraper))
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))
    }

    #[must_use]
    pub fn descriptor(&self, name: &str) -> Option<&ScraperDescriptor> {
        self.entries.get(name).map(|entry| &entry.descriptor)
    }

    /// All descriptors, sorted by name.
    pub fn all(&self) -> impl Iterator<Item = &ScraperDescriptor> {
        self.entries.values().map(|entry| &entry.descriptor)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Scrapers that apply to `version`, are enabled in `config` and allowed
    /// by `selection`, in registry order. Version-gated scrapers are skipped
    /// silently.
    #[must_use]
    pub fn candidates(
        &self,
        version: EngineVersion,
        config: &CollectorConfig,
        selection: &ScrapeSelection,
    ) -> Vec<(&ScraperDescriptor, Arc<dyn Scraper>)> {
        self.entries
            .values()
            .filter(|entry| config.is_enabled(entry.descriptor.name))
            .filter(|entry| selection.allows(entry.descriptor.name))
            .filter(|entry| {
                let applies = entry.descriptor.min_version <= version;
                if !applies {
                    debug!(
                        scraper = entry.descriptor.name,
                        min_version = %entry.descriptor.min_version,
                        engine_version = %version,
                        "skipping scraper for engine version"
                    );
                }
                applies
            })
            .map(|entry| (&entry.descriptor, Arc::clone(&entry.scraper)))
            .collect()
    }
}
