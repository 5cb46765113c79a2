//! Loader for tagrank configuration with YAML + environment overlays.
//!
//! Sources, lowest precedence first: built-in defaults, an optional YAML file
//! (`tagrank.yaml` by default), then `TAGRANK__`-prefixed environment variables
//! with `__` as the nesting separator (`TAGRANK__CACHE__DAILY_INVALIDATION=true`).
//! String values may reference `${VAR}`; references are expanded after merging.
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tagrank_common::observability::{LogFormat, default_data_dir, expand_home};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;
const ENV_PREFIX: &str = "TAGRANK";
const MAX_TIMELINE_LIMIT: u32 = 40;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TagrankConfig {
    /// Instance to crawl when none is given on the command line.
    pub instance: String,
    pub dispatch: DispatchConfig,
    pub cache: CacheConfig,
    pub http: HttpConfig,
    pub logging: LoggingConfig,
}

impl Default for TagrankConfig {
    fn default() -> Self {
        Self {
            instance: "hachyderm.io".into(),
            dispatch: DispatchConfig::default(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Delay between per-hashtag requests; `0` fires them all at once.
    pub interval_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self { interval_ms: 25 }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    #[default]
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// SQLite file; defaults to `~/.local/share/tagrank/cache.db`.
    pub path: Option<PathBuf>,
    /// Drop every cached count the first time tagrank runs on a new day.
    pub daily_invalidation: bool,
}

impl CacheConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(p) => expand_home(p),
            None => default_data_dir("tagrank").join("cache.db"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request timeout. Unset means no timeout.
    pub timeout_secs: Option<u64>,
    pub retries: usize,
    pub user_agent: Option<String>,
    /// Bearer token for instances that require authorized fetch.
    pub access_token: Option<String>,
    /// Posts requested from the tag timeline (server default when unset).
    pub timeline_limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: Option<PathBuf>,
    pub format: LogFormat,
    pub stderr: bool,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: None,
            format: LogFormat::Text,
            stderr: false,
            filter: "info".into(),
        }
    }
}

impl TagrankConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.instance.trim().is_empty() {
            return Err(ConfigError::Message("instance must not be empty".into()));
        }
        if let Some(limit) = self.http.timeline_limit {
            if limit == 0 || limit > MAX_TIMELINE_LIMIT {
                return Err(ConfigError::Message(format!(
                    "http.timeline_limit must be within 1..={MAX_TIMELINE_LIMIT}, got {limit}"
                )));
            }
        }
        Ok(())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct TagrankConfigLoader {
    files: Vec<(PathBuf, bool)>,
    inline: Vec<String>,
    with_env: bool,
}

impl Default for TagrankConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TagrankConfigLoader {
    /// Start with defaults plus `TAGRANK__` environment overrides.
    ///
    /// ```
    /// use tagrank_config::TagrankConfigLoader;
    ///
    /// let config = TagrankConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str("instance: example.social")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.instance, "example.social");
    /// assert_eq!(config.dispatch.interval_ms, 25);
    /// assert!(!config.cache.daily_invalidation);
    /// ```
    pub fn new() -> Self {
        Self {
            files: Vec::new(),
            inline: Vec::new(),
            with_env: true,
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), true));
        self
    }

    /// Attach a file that is silently skipped when missing.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.files.push((path.as_ref().to_path_buf(), false));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI).
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.inline.push(yaml.to_string());
        self
    }

    /// Ignore `TAGRANK__*` environment variables.
    pub fn without_env(mut self) -> Self {
        self.with_env = false;
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// ```
    /// use tagrank_config::{CacheBackend, TagrankConfigLoader};
    ///
    /// unsafe { std::env::set_var("TAGRANK_DOC_TOKEN", "from-env"); }
    ///
    /// let config = TagrankConfigLoader::new()
    ///     .without_env()
    ///     .with_yaml_str(r#"
    /// instance: "https://example.social"
    /// dispatch:
    ///   interval_ms: 0
    /// cache:
    ///   backend: memory
    ///   daily_invalidation: true
    /// http:
    ///   access_token: "${TAGRANK_DOC_TOKEN}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.dispatch.interval_ms, 0);
    /// assert_eq!(config.cache.backend, CacheBackend::Memory);
    /// assert!(config.cache.daily_invalidation);
    /// assert_eq!(config.http.access_token.as_deref(), Some("from-env"));
    ///
    /// unsafe { std::env::remove_var("TAGRANK_DOC_TOKEN"); }
    /// ```
    pub fn load(self) -> Result<TagrankConfig, ConfigError> {
        let mut builder = Config::builder();
        for (path, required) in &self.files {
            builder = builder.add_source(File::from(path.as_path()).required(*required));
        }
        for yaml in &self.inline {
            builder = builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        }
        if self.with_env {
            builder = builder
                .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));
        }
        let cfg = builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        // Env values arrive as strings; `config` coerces them into the numeric
        // and bool fields and leaves string fields untouched.
        let typed: TagrankConfig = Config::try_from(&v)?.try_deserialize()?;
        typed.validate()?;
        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("TAGRANK_T_FOO", Some("bar"), || {
            let mut v = json!("prefix-${TAGRANK_T_FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars(
            [("TAGRANK_T_HOST", Some("example.social")), ("TAGRANK_T_TOK", Some("abc"))],
            || {
                let mut v = json!([
                    "https://$TAGRANK_T_HOST",
                    { "http": { "access_token": "${TAGRANK_T_TOK}" } },
                    25,
                    true,
                    null
                ]);
                expand_env_in_value(&mut v);
                assert_eq!(
                    v,
                    json!([
                        "https://example.social",
                        { "http": { "access_token": "abc" } },
                        25,
                        true,
                        null
                    ])
                );
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars(
            [("TAGRANK_T_A", Some("${TAGRANK_T_B}")), ("TAGRANK_T_B", Some("${TAGRANK_T_A}"))],
            || {
                let mut v = json!("x=${TAGRANK_T_A}-y");
                expand_env_in_value(&mut v);
                let s = v.as_str().unwrap();
                assert!(s.starts_with("x=") && s.ends_with("-y"));
                assert!(s.contains("${"));
            },
        );
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${TAGRANK_T_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${TAGRANK_T_DOES_NOT_EXIST}"));
    }

    #[test]
    fn empty_sources_yield_defaults() {
        let cfg = TagrankConfigLoader::new().without_env().load().unwrap();
        assert_eq!(cfg, TagrankConfig::default());
        assert_eq!(cfg.http.retries, 0);
        assert_eq!(cfg.http.timeout_secs, None);
        assert_eq!(cfg.cache.backend, CacheBackend::Sqlite);
    }

    #[test]
    fn rejects_out_of_range_timeline_limit() {
        let err = TagrankConfigLoader::new()
            .without_env()
            .with_yaml_str("http:\n  timeline_limit: 41")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("timeline_limit"));
    }

    #[test]
    fn rejects_blank_instance() {
        assert!(
            TagrankConfigLoader::new()
                .without_env()
                .with_yaml_str("instance: '  '")
                .load()
                .is_err()
        );
    }

    #[test]
    fn explicit_cache_path_is_used() {
        let cache = CacheConfig {
            path: Some(PathBuf::from("/tmp/tagrank/cache.db")),
            ..Default::default()
        };
        assert_eq!(cache.resolved_path(), PathBuf::from("/tmp/tagrank/cache.db"));
        assert!(CacheConfig::default().resolved_path().ends_with("tagrank/cache.db"));
    }
}
