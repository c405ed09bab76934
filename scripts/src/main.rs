//! Command line entrypoint of the asset token operator.
use std::process::ExitCode;

use clap::Parser;
use scripts::cli::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let kind = e
                .downcast_ref::<upgrades::Error>()
                .map_or("Error", upgrades::Error::kind);
            eprintln!("{kind}: {e:#}");
            ExitCode::FAILURE
        }
    }
}
