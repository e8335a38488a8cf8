//! Loader for Chorus configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are attached, with `CHORUS_`-prefixed
//! environment variables always winning (`CHORUS_TWITTER__BEARER_TOKEN` maps to
//! `twitter.bearer_token`). After merging, every string value has `${VAR}`
//! placeholders expanded against the process environment. Every section is
//! optional; missing keys fall back to the defaults documented on each struct.
use config::{Config, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read configuration sources: {0}")]
    Source(#[from] config::ConfigError),
    #[error("configuration does not match the expected schema: {0}")]
    Schema(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
pub struct ChorusConfig {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub twitter: TwitterConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub stream: StreamConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Credentials and transport settings for the Twitter/X API.
///
/// Either `bearer_token` or the `consumer_key`/`consumer_secret` pair must be
/// present by the time a client is built; the loader itself does not enforce it.
/// Adding `access_token`/`access_token_secret` to the consumer pair switches
/// REST calls to user context.
#[derive(Debug, Deserialize)]
pub struct TwitterConfig {
    #[serde(default)]
    pub bearer_token: Option<String>,
    #[serde(default)]
    pub consumer_key: Option<String>,
    #[serde(default)]
    pub consumer_secret: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub access_token_secret: Option<String>,
    #[serde(default = "default_twitter_base_url")]
    pub base_url: String,
    #[serde(default = "default_retries")]
    pub retries: usize,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            consumer_key: None,
            consumer_secret: None,
            access_token: None,
            access_token_secret: None,
            base_url: default_twitter_base_url(),
            retries: default_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalysisConfig {
    /// Number of tweets fetched per run.
    #[serde(default = "default_count")]
    pub count: usize,
    /// Rows printed to the terminal after classification.
    #[serde(default = "default_head_rows")]
    pub head_rows: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            head_rows: default_head_rows(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct StreamConfig {
    /// File that receives every raw payload, appended line by line.
    #[serde(default = "default_stream_output")]
    pub output_file: PathBuf,
    #[serde(default)]
    pub track: Vec<String>,
    #[serde(default = "default_max_reconnects")]
    pub max_reconnects: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            output_file: default_stream_output(),
            track: Vec::new(),
            max_reconnects: default_max_reconnects(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `text` or `json`.
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default)]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            dir: None,
            stderr: false,
        }
    }
}

fn default_twitter_base_url() -> String {
    "https://api.twitter.com".into()
}
fn default_retries() -> usize {
    2
}
fn default_timeout_secs() -> u64 {
    15
}
fn default_count() -> usize {
    200
}
fn default_head_rows() -> usize {
    10
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("out")
}
fn default_stream_output() -> PathBuf {
    PathBuf::from("fetched_tweets.json")
}
fn default_max_reconnects() -> u32 {
    5
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
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
pub struct ChorusConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for ChorusConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ChorusConfigLoader {
    /// Start with no file sources. Environment overrides are attached in [`load`](Self::load)
    /// so they always take precedence over files.
    ///
    /// ```
    /// use chorus_config::ChorusConfigLoader;
    ///
    /// let config = ChorusConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.analysis.count, 200);
    /// assert_eq!(config.twitter.base_url, "https://api.twitter.com");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file that must exist; the format is inferred by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that is skipped when absent, so environment-only setups still load.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use chorus_config::ChorusConfigLoader;
    ///
    /// let cfg = ChorusConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// version: "test"
    /// stream:
    ///   track: ["rustlang", "tokio"]
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.version.as_deref(), Some("test"));
    /// assert_eq!(cfg.stream.track, vec!["rustlang", "tokio"]);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly typed config.
    ///
    /// ```
    /// use chorus_config::ChorusConfigLoader;
    ///
    /// unsafe { std::env::set_var("CHORUS_DOC_BEARER", "injected-from-env"); }
    ///
    /// let config = ChorusConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// twitter:
    ///   bearer_token: "${CHORUS_DOC_BEARER}"
    ///   retries: 4
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.twitter.bearer_token.as_deref(), Some("injected-from-env"));
    /// assert_eq!(config.twitter.retries, 4);
    ///
    /// unsafe { std::env::remove_var("CHORUS_DOC_BEARER"); }
    /// ```
    pub fn load(self) -> Result<ChorusConfig, LoadError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("CHORUS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("stream.track"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        Ok(serde_json::from_value(v)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("FOO", Some("bar"), || {
            let mut v = json!("prefix-${FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("TAG", Some("rust")), ("USER", Some("ferris"))], || {
            let mut v = json!(["#$TAG", { "handle": "${USER}-${TAG}" }, 42, true, null]);
            expand_env_in_value(&mut v);
            assert_eq!(v, json!(["#rust", { "handle": "ferris-rust" }, 42, true, null]));
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                ("BAZ", Some("qux")),
                ("BAR", Some("mid-${BAZ}")),
                ("FOO", Some("start-${BAR}-end")),
            ],
            || {
                let mut v = json!("X=${FOO}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn stops_on_cycles() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("x=${A}-y");
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("x=") && s.ends_with("-y"));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${DOES_NOT_EXIST_CHORUS}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${DOES_NOT_EXIST_CHORUS}"));
    }

    #[test]
    fn partial_sections_keep_defaults() {
        let cfg = ChorusConfigLoader::new()
            .with_yaml_str("analysis:\n  count: 50\n")
            .load()
            .unwrap();
        assert_eq!(cfg.analysis.count, 50);
        assert_eq!(cfg.analysis.head_rows, 10);
        assert_eq!(cfg.analysis.output_dir, PathBuf::from("out"));
        assert_eq!(cfg.stream.max_reconnects, 5);
        assert_eq!(cfg.logging.format, "text");
    }
}
