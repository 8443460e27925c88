//! tether - runtime artifact acquisition CLI

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use tether_cli::cmd;
use tether_cli::cmd::fetch::FetchOptions;
use tether_cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let quiet = cli.quiet;

    match cli.command {
        Commands::Fetch {
            specs,
            dir,
            repos,
            timeout_ms,
            keep_raw,
            relocate,
        } => {
            let options = FetchOptions {
                dir,
                repos,
                timeout_ms,
                keep_raw,
                relocate,
                quiet,
            };
            cmd::fetch::fetch(specs, options).await
        }
        Commands::Sync { manifest } => cmd::sync::sync(&manifest, quiet).await,
        Commands::Locate { symbol, manifest } => {
            if !cmd::locate::locate(&symbol, &manifest, quiet).await? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::List { dir } => cmd::list::list(dir),
        Commands::Clean { dir, dry_run } => cmd::clean::clean(dir, dry_run),
    }
}
