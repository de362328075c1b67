use crate::{
    cli::actions::Action,
    collectors::{SCRAPER_NAMES, all_factories},
    exporter::Settings,
};
use anyhow::{Result, anyhow};
use clap::ArgMatches;
use secrecy::SecretString;
use std::time::Duration;

/// # Errors
///
/// Returns an error if required arguments are missing
pub fn handler(matches: &ArgMatches) -> Result<Action> {
    // Get the port or return an error
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .ok_or_else(|| anyhow!("Port is required. Please provide it using the --port flag."))?;

    // None means auto-detect
    let listen = matches.get_one::<String>("listen").cloned();

    let dsn = SecretString::from(
        matches
            .get_one::<String>("dsn")
            .cloned()
            .ok_or_else(|| anyhow!("DSN is required. Please provide it using the --dsn flag."))?,
    );

    Ok(Action::Run {
        port,
        listen,
        dsn,
        collectors: get_enabled_collectors(matches),
        settings: settings(matches),
    })
}

fn settings(matches: &ArgMatches) -> Settings {
    let defaults = Settings::default();

    Settings {
        scrape_timeout: duration(matches, "scrape-timeout").unwrap_or(defaults.scrape_timeout),
        timeout_offset: duration(matches, "timeout-offset").unwrap_or(defaults.timeout_offset),
        strict: matches.get_flag("strict"),
        max_connections: matches
            .get_one::<u32>("max-connections")
            .copied()
            .unwrap_or(defaults.max_connections),
    }
}

fn duration(matches: &ArgMatches, id: &str) -> Option<Duration> {
    matches.get_one::<Duration>(id).copied()
}

#[must_use]
pub fn get_enabled_collectors(matches: &ArgMatches) -> Vec<String> {
    let factories = all_factories();

    SCRAPER_NAMES
        .iter()
        .filter(|&&name| {
            // If explicitly disabled, skip it
            if matches.get_flag(&format!("no-collector.{name}")) {
                return false;
            }

            if matches.get_flag(&format!("collector.{name}")) {
                return true;
            }

            factories
                .iter()
                .find(|(key, _)| *key == name)
                .is_some_and(|(_, factory)| factory().enabled_by_default())
        })
        .map(|&name| name.to_string())
        .collect()
}
