pub mod actions;
pub mod commands;
pub mod dispatch;
pub mod telemetry;

use anyhow::Result;

/// Parse arguments, set up logging and run the exporter.
///
/// # Errors
///
/// Returns an error if telemetry cannot be initialized, arguments are
/// invalid, or the exporter fails.
pub async fn start() -> Result<()> {
    let matches = commands::new().get_matches();

    let verbosity = matches.get_count("verbose");
    let _telemetry = telemetry::init(verbosity)?;

    let action = dispatch::handler(&matches)?;

    actions::run::handle(action).await
}
