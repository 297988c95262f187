//! # corral
//!
//! Runs one command in an isolated container assembled from a local image
//! archive, and exits with the command's status.

mod cli;

use anyhow::Context;
use clap::Parser;
use corral_common::config::CorralConfig;
use corral_common::constants::INIT_MARKER;
use corral_runtime::Launcher;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.get(1).map(String::as_str) == Some(INIT_MARKER) {
        std::process::exit(corral_runtime::init::run(&args[2..]));
    }

    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(status) => status,
        Err(e) => {
            tracing::error!("{e:#}");
            cli::exit_code(&e)
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    let config = match &cli.config {
        Some(path) => CorralConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => CorralConfig::default(),
    };
    let status = Launcher::new(config)
        .launch(&cli.request())
        .with_context(|| format!("running {:?} in image {}", cli.command, cli.image))?;
    Ok(status)
}
