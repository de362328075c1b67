use anyhow::Result;
use ndb_exporter::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::start().await
}
