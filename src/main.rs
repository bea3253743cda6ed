use anyhow::Result;
use clap::Parser;
use presence_hook::{Cli, Config, daemon, observability};

#[tokio::main]
async fn main() -> Result<()> {
    // .env has to be loaded before clap reads the environment.
    let dotenv_result = dotenv::dotenv();

    let cli = Cli::parse();
    observability::init_logging(cli.verbose);

    match dotenv_result {
        Ok(path) => tracing::debug!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => tracing::debug!("No .env file found"),
        Err(e) => tracing::warn!("Failed to load .env: {e}"),
    }
    tracing::info!("presence-hook v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    tracing::debug!(?config, "configuration loaded");

    daemon::run(config).await?;
    Ok(())
}
