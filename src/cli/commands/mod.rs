pub mod collectors;

use clap::{Arg, ArgAction, Command};
use once_cell::sync::Lazy;
use std::time::Duration;

static LONG_VERSION: Lazy<String> = Lazy::new(crate::long_version);

/// Parse `10`, `2.5`, `10s` or `250ms` into a duration.
///
/// # Errors
///
/// Returns a message clap shows to the user when the value is not a
/// non-negative number of seconds or milliseconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let (number, millis) = if let Some(number) = value.strip_suffix("ms") {
        (number, true)
    } else {
        (value.strip_suffix('s').unwrap_or(value), false)
    };

    let amount: f64 = number
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration: {value}"))?;

    let seconds = if millis { amount / 1000.0 } else { amount };

    Duration::try_from_secs_f64(seconds).map_err(|err| format!("invalid duration {value}: {err}"))
}

#[must_use]
pub fn new() -> Command {
    let cmd = Command::new("ndb_exporter")
        .about("Prometheus exporter for MySQL NDB Cluster")
        .version(LONG_VERSION.as_str())
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Port to listen on")
                .env("NDB_EXPORTER_PORT")
                .default_value("9104")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .short('l')
                .help("Address to listen on [default: [::]:<port>, falling back to 0.0.0.0:<port>]")
                .env("NDB_EXPORTER_LISTEN"),
        )
        .arg(
            Arg::new("dsn")
                .long("dsn")
                .help("Data source name")
                .env("NDB_EXPORTER_DSN")
                .default_value("mysql://root@localhost:3306/ndbinfo")
                .hide_env_values(true),
        )
        .arg(
            Arg::new("scrape-timeout")
                .long("scrape-timeout")
                .help("Upper bound for a single scrape, e.g. 10s or 500ms")
                .env("NDB_EXPORTER_SCRAPE_TIMEOUT")
                .default_value("10s")
                .value_parser(parse_duration),
        )
        .arg(
            Arg::new("timeout-offset")
                .long("timeout-offset")
                .help("Subtracted from the Prometheus scrape timeout header")
                .env("NDB_EXPORTER_TIMEOUT_OFFSET")
                .default_value("0.25s")
                .value_parser(parse_duration),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .help("Answer 503 when any scraper fails")
                .env("NDB_EXPORTER_STRICT")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("max-connections")
                .long("max-connections")
                .help("Maximum number of pooled database connections")
                .env("NDB_EXPORTER_MAX_CONNECTIONS")
                .default_value("4")
                .value_parser(clap::value_parser!(u32).range(1..)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Increase verbosity, -vv for debug")
                .action(ArgAction::Count),
        );

    collectors::add_collectors_args(cmd)
}
