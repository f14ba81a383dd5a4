use anyhow::{Context, Result};
use clap::Parser;
use scriptorium::build::Site;
use scriptorium::config::Config;
use std::path::PathBuf;

/// Builds a static site from Markdown sources.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// The project root, or any directory below it. Defaults to the current
    /// directory; the nearest `_config.yml` above it marks the root.
    root: Option<PathBuf>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(err) = run(Args::parse()) {
        log::error!("{:#}", err);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    let dir = match args.root {
        Some(root) => root,
        None => std::env::current_dir().context("Resolving the current directory")?,
    };
    let config = Config::from_directory(&dir)?;
    let mut site = Site::new(config);
    site.build().context("Building site")?;
    Ok(())
}
