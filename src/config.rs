//! Layered YAML configuration.
//!
//! Configuration is assembled from `base.yaml` deep-merged with an
//! environment overlay (`dev.yaml` / `prod.yaml`, selected by `APP_ENV`,
//! default `dev`). `${VAR}` string values are resolved from the process
//! environment. Missing files or keys degrade to hardcoded defaults with a
//! warning; configuration problems are never fatal at this layer.

use serde::Deserialize;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fully resolved pipeline configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub queue: QueueConfig,
    pub cache: CacheConfig,
    pub llm: LlmConfig,
    pub prices: PricesConfig,
}

/// File system layout. All paths are interpreted relative to the working
/// directory unless absolute.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub links_file: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            data_dir: PathBuf::from("data"),
            cache_dir: PathBuf::from("cache"),
            docs_dir: PathBuf::from("docs"),
            links_file: PathBuf::from("data/links.txt"),
        }
    }
}

impl PathsConfig {
    /// Path of the URL queue log.
    pub fn queue_file(&self) -> PathBuf {
        self.data_dir.join("incoming_urls.jsonl")
    }

    /// Path of the per-URL summary cache log.
    pub fn summary_cache_file(&self) -> PathBuf {
        self.data_dir.join("news_ai").join("summary_cache.jsonl")
    }

    /// Path of the per-URL region cache log.
    pub fn region_cache_file(&self) -> PathBuf {
        self.data_dir.join("news_ai").join("region_cache.jsonl")
    }
}

/// Retention policy for the URL queue.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Non-pending records older than this many days are pruned.
    pub retention_days: i64,
    /// When true, pending records are never pruned regardless of age.
    pub keep_pending: bool,
    /// When true, the queue file is copied to a backup before the rewrite.
    pub backup: bool,
}

impl Default for QueueConfig {
    fn default() -> Self {
        QueueConfig {
            retention_days: 7,
            keep_pending: true,
            backup: false,
        }
    }
}

/// Daily stage-cache settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Daily cache directories older than this many days are removed.
    pub keep_days: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            keep_days: 7,
        }
    }
}

/// OpenAI-compatible LLM endpoint settings. The API key itself comes from
/// the environment (see `api::ChatClient::from_config`), never from YAML.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub max_retries: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            base_url: "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string(),
            model: "qwen-plus".to_string(),
            api_key_env: "LLM_API_KEY".to_string(),
            max_retries: 3,
        }
    }
}

/// Config-driven commodity price sources.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PricesConfig {
    pub sources: Vec<PriceSource>,
}

/// One HTML price source with CSS selectors for its quote rows.
#[derive(Debug, Clone, Deserialize)]
pub struct PriceSource {
    pub name: String,
    pub url: String,
    pub selectors: PriceSelectors,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PriceSelectors {
    /// Selector matching one quote row.
    pub item: String,
    /// Selector for the commodity name within a row.
    pub name: String,
    /// Selector for the price within a row.
    pub price: String,
    /// Optional selector for the change column.
    #[serde(default)]
    pub change: Option<String>,
}

/// Load configuration from `config_dir`, merging `base.yaml` with the
/// `APP_ENV` overlay and resolving `${VAR}` placeholders.
///
/// Always returns a usable configuration: unreadable files and
/// non-conforming documents fall back to defaults with a warning.
pub fn load_config(config_dir: &Path) -> Config {
    let env = std::env::var("APP_ENV").unwrap_or_else(|_| "dev".to_string());

    let mut merged = Value::Null;
    for name in ["base.yaml".to_string(), format!("{env}.yaml")] {
        let path = config_dir.join(&name);
        match read_yaml(&path) {
            Some(doc) => {
                deep_merge(&mut merged, doc);
                info!(path = %path.display(), "Loaded config layer");
            }
            None => warn!(path = %path.display(), "Config file missing or unreadable; skipping"),
        }
    }

    if merged.is_null() {
        warn!(dir = %config_dir.display(), "No config files found; using defaults");
        return Config::default();
    }

    resolve_env_vars(&mut merged);

    match serde_yaml::from_value(merged) {
        Ok(config) => config,
        Err(e) => {
            warn!(error = %e, "Config did not deserialize; using defaults");
            Config::default()
        }
    }
}

fn read_yaml(path: &Path) -> Option<Value> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_yaml::from_str(&raw) {
        Ok(doc) => Some(doc),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Invalid YAML");
            None
        }
    }
}

/// Recursively merge `source` into `target`. Mappings merge key-wise;
/// any other value in `source` replaces the target wholesale.
fn deep_merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Mapping(target_map), Value::Mapping(source_map)) => {
            for (key, value) in source_map {
                match target_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        target_map.insert(key, value);
                    }
                }
            }
        }
        (target, source) => *target = source,
    }
}

/// Replace string values of the exact form `${VAR}` with the value of the
/// environment variable `VAR`. Unset variables keep the placeholder.
fn resolve_env_vars(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            for (_, v) in map.iter_mut() {
                resolve_env_vars(v);
            }
        }
        Value::Sequence(seq) => {
            for v in seq.iter_mut() {
                resolve_env_vars(v);
            }
        }
        Value::String(s) => {
            if let Some(var) = s.strip_prefix("${").and_then(|rest| rest.strip_suffix('}')) {
                match std::env::var(var) {
                    Ok(resolved) => *s = resolved,
                    Err(_) => warn!(var, "Env var not set; keeping placeholder"),
                }
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_when_config_dir_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope"));
        assert_eq!(config.queue.retention_days, 7);
        assert!(config.queue.keep_pending);
        assert!(!config.queue.backup);
        assert!(config.cache.enabled);
        assert_eq!(config.llm.model, "qwen-plus");
    }

    #[test]
    fn test_base_layer_loads() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "queue:\n  retention_days: 14\ncache:\n  enabled: false\n",
        )
        .unwrap();

        let config = load_config(dir.path());
        assert_eq!(config.queue.retention_days, 14);
        assert!(!config.cache.enabled);
        // untouched sections keep defaults
        assert!(config.queue.keep_pending);
    }

    #[test]
    fn test_env_overlay_merges_over_base() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            "queue:\n  retention_days: 14\n  keep_pending: true\n",
        )
        .unwrap();
        std::fs::write(dir.path().join("dev.yaml"), "queue:\n  retention_days: 3\n").unwrap();

        let config = load_config(dir.path());
        // overlay wins where set, base survives where not
        assert_eq!(config.queue.retention_days, 3);
        assert!(config.queue.keep_pending);
    }

    #[test]
    fn test_deep_merge_nested_mappings() {
        let mut target: Value =
            serde_yaml::from_str("a:\n  x: 1\n  y: 2\nb: keep\n").unwrap();
        let source: Value = serde_yaml::from_str("a:\n  y: 9\n  z: 3\n").unwrap();

        deep_merge(&mut target, source);

        let a = target.get("a").unwrap();
        assert_eq!(a.get("x").unwrap().as_i64(), Some(1));
        assert_eq!(a.get("y").unwrap().as_i64(), Some(9));
        assert_eq!(a.get("z").unwrap().as_i64(), Some(3));
        assert_eq!(target.get("b").unwrap().as_str(), Some("keep"));
    }

    #[test]
    fn test_env_var_resolution() {
        unsafe { std::env::set_var("ENERGY_BRIEFING_TEST_MODEL", "qwen-max") };
        let mut value: Value =
            serde_yaml::from_str("llm:\n  model: ${ENERGY_BRIEFING_TEST_MODEL}\n").unwrap();
        resolve_env_vars(&mut value);
        assert_eq!(
            value.get("llm").unwrap().get("model").unwrap().as_str(),
            Some("qwen-max")
        );
    }

    #[test]
    fn test_unset_env_var_keeps_placeholder() {
        let mut value: Value = serde_yaml::from_str("key: ${ENERGY_BRIEFING_UNSET_VAR}\n").unwrap();
        resolve_env_vars(&mut value);
        assert_eq!(
            value.get("key").unwrap().as_str(),
            Some("${ENERGY_BRIEFING_UNSET_VAR}")
        );
    }

    #[test]
    fn test_price_sources_deserialize() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("base.yaml"),
            r#"
prices:
  sources:
    - name: example
      url: https://example.com/prices
      selectors:
        item: "table tr"
        name: "td.name"
        price: "td.price"
"#,
        )
        .unwrap();

        let config = load_config(dir.path());
        assert_eq!(config.prices.sources.len(), 1);
        let source = &config.prices.sources[0];
        assert_eq!(source.name, "example");
        assert_eq!(source.selectors.item, "table tr");
        assert!(source.selectors.change.is_none());
    }

    #[test]
    fn test_derived_paths() {
        let paths = PathsConfig::default();
        assert_eq!(paths.queue_file(), PathBuf::from("data/incoming_urls.jsonl"));
        assert_eq!(
            paths.summary_cache_file(),
            PathBuf::from("data/news_ai/summary_cache.jsonl")
        );
    }
}
