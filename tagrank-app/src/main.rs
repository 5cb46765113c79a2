use anyhow::Result;
use clap::Parser;
use cli::{Cli, Command};
use tagrank_common::observability::{LogConfig, init_logging};
use tagrank_config::{TagrankConfig, TagrankConfigLoader};

mod cli;
mod commands;
mod output;

const DEFAULT_CONFIG_FILE: &str = "tagrank.yaml";

fn load_config(cli: &Cli) -> Result<TagrankConfig> {
    let loader = TagrankConfigLoader::new();
    let loader = match &cli.config {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file(DEFAULT_CONFIG_FILE),
    };
    Ok(loader.load()?)
}

fn log_config(cfg: &TagrankConfig, verbose: u8) -> LogConfig {
    let default_filter = match verbose {
        0 => cfg.logging.filter.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    LogConfig {
        app_name: "tagrank",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr || verbose > 0,
        format: cfg.logging.format,
        default_filter,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1) Load config (env wins over file)
    let cfg = load_config(&cli)?;

    // 2) Logging
    let log_path = init_logging(log_config(&cfg, cli.verbose))?;
    tracing::debug!(log_path = %log_path.display(), "tagrank.start");

    match cli.command {
        Command::Crawl(args) => commands::crawl(&cfg, args).await,
        Command::ClearCache => commands::clear_cache(&cfg).await,
    }
}
