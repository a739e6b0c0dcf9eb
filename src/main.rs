mod cli;

use clap::Parser;
use cli::Cli;
use tracing_subscriber::EnvFilter;

/// Log filter variable, e.g. `SUNTRACK_LOG=suntrack=debug`
const LOG_ENV: &str = "SUNTRACK_LOG";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    cli.run().await
}
