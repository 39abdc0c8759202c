//! flagstate CLI entry point.

use anyhow::Result;
use clap::Parser;

use flagstate::cli::{commands, Cli};
use flagstate::infrastructure::config::ConfigLoader;
use flagstate::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    if let Err(err) = run(cli).await {
        flagstate::cli::handle_error(err, json);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match cli.config {
        Some(ref path) => ConfigLoader::load_from_file(path)?,
        None => ConfigLoader::load()?,
    };
    let _logger = LoggerImpl::init(&config.logging)?;

    commands::flag::execute(cli.command, &config, cli.json).await
}
