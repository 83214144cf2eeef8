use clap::Parser;

use geotrack_server::cli::Cli;
use geotrack_server::commands;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp_millis()
        .init();

    commands::run(cli).await
}
