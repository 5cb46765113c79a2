//! Logging setup for the `tagrank` binary.
//!
//! Events go to a daily file under the data directory (`tagrank.log.YYYY-MM-DD`)
//! and, when asked, to stderr as well. `RUST_LOG` overrides the configured
//! filter. Only the first [`init_logging`] call installs a subscriber.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use anyhow::Context;
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

const LOG_DIR_ENV: &str = "TAGRANK_LOG_DIR";

// The guard flushes the background writer on drop, so it lives for the process.
static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

type Sink = Box<dyn Layer<Registry> + Send + Sync>;

/// `text` or `json`, as written in the `logging.format` config key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Names the data directory and the log file.
    pub app_name: &'static str,
    /// Falls back to `TAGRANK_LOG_DIR`, then `~/.local/share/<app_name>`.
    pub log_dir: Option<PathBuf>,
    pub emit_stderr: bool,
    pub format: LogFormat,
    /// Used when `RUST_LOG` is unset or unparsable.
    pub default_filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            app_name: "tagrank",
            log_dir: None,
            emit_stderr: false,
            format: LogFormat::Text,
            default_filter: "info".to_string(),
        }
    }
}

/// Install the global subscriber and return today's log file.
///
/// A second call installs nothing and returns the path chosen by the first.
pub fn init_logging(config: LogConfig) -> anyhow::Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    let dir = resolve_log_dir(config.app_name, config.log_dir.as_deref());
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create log directory: {}", dir.display()))?;

    let file_name = format!("{}.log", config.app_name);
    let (writer, guard) = tracing_appender::non_blocking(rolling::daily(&dir, &file_name));
    let _ = LOG_GUARD.set(guard);

    let mut sinks: Vec<Sink> = Vec::with_capacity(2);
    match config.format {
        LogFormat::Text => {
            sinks.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
            if config.emit_stderr {
                sinks.push(fmt::layer().with_writer(std::io::stderr).boxed());
            }
        }
        LogFormat::Json => {
            sinks.push(fmt::layer().json().with_writer(writer).boxed());
            if config.emit_stderr {
                sinks.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
            }
        }
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    tracing_subscriber::registry()
        .with(sinks)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("tracing setup failed: {e}"))?;

    let path = log_file_path(&dir, config.app_name, Local::now().date_naive());
    let _ = LOG_PATH.set(path.clone());
    Ok(path)
}

/// Name `rolling::daily` gives the file for `day`.
fn log_file_path(dir: &Path, app_name: &str, day: NaiveDate) -> PathBuf {
    dir.join(format!("{app_name}.log.{}", day.format("%Y-%m-%d")))
}

fn resolve_log_dir(app_name: &str, explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return expand_home(dir);
    }
    match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => expand_home(Path::new(&dir)),
        _ => default_data_dir(app_name),
    }
}

/// Replace a leading `~/` with `$HOME`.
pub fn expand_home(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/")) {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    path.to_path_buf()
}

/// `~/.local/share/<app_name>`, or `./<app_name>` without a home directory.
pub fn default_data_dir(app_name: &str) -> PathBuf {
    if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(app_name)
    } else {
        PathBuf::from(".").join(app_name)
    }
}
