use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Rank the hashtags that co-occur with a seed hashtag on a Mastodon instance.
#[derive(Debug, Parser)]
#[command(name = "tagrank", version, about)]
pub struct Cli {
    /// Config file (YAML/TOML/JSON). Defaults to ./tagrank.yaml when present.
    #[arg(long, global = true, env = "TAGRANK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Raise log verbosity and mirror logs to stderr (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Crawl a hashtag timeline and print the ranked co-occurring hashtags.
    Crawl(CrawlArgs),
    /// Remove every cached hashtag count.
    ClearCache,
}

#[derive(Debug, Args)]
pub struct CrawlArgs {
    /// Seed hashtag, with or without the leading '#'.
    pub hashtag: String,

    /// Instance host or URL (overrides config).
    #[arg(short, long)]
    pub instance: Option<String>,

    /// Milliseconds between per-hashtag requests; 0 sends them all at once.
    #[arg(long)]
    pub interval_ms: Option<u64>,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    #[arg(short, long, value_enum, default_value_t = SortOrder::Rank)]
    pub sort: SortOrder,

    /// Print at most this many hashtags.
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// Use a throwaway in-memory cache for this run.
    #[arg(long)]
    pub no_cache: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortOrder {
    /// Most co-occurrences first, ties broken by usage count.
    Rank,
    /// Highest historical usage first.
    Count,
    /// Crawl order.
    None,
}
