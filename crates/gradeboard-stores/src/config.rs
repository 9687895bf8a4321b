//! Configuration loading and store factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use gradeboard_core::attribution::AdminGate;
use gradeboard_core::sync::SyncConfig;
use gradeboard_core::traits::LedgerStore;

use crate::file::FileStore;
use crate::memory::MemoryStore;
use crate::rest_kv::{RestKvStore, DEFAULT_KEY};

/// Which backend holds the shared ledger.
///
/// Note: Custom Debug impl masks the access token.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    File {
        #[serde(default = "default_grades_path")]
        path: PathBuf,
    },
    RestKv {
        url: String,
        #[serde(default)]
        token: String,
        #[serde(default = "default_key")]
        key: String,
    },
    Memory,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreConfig::File { path } => f.debug_struct("File").field("path", path).finish(),
            StoreConfig::RestKv { url, token: _, key } => f
                .debug_struct("RestKv")
                .field("url", url)
                .field("token", &"***")
                .field("key", key)
                .finish(),
            StoreConfig::Memory => f.write_str("Memory"),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_grades_path(),
        }
    }
}

fn default_grades_path() -> PathBuf {
    PathBuf::from("global_grades.json")
}

fn default_key() -> String {
    DEFAULT_KEY.to_string()
}

/// Sync timer settings in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_debounce")]
    pub debounce_ms: u64,
    #[serde(default = "default_edit_grace")]
    pub edit_grace_ms: u64,
}

fn default_poll_interval() -> u64 {
    5000
}
fn default_debounce() -> u64 {
    1000
}
fn default_edit_grace() -> u64 {
    5000
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            debounce_ms: default_debounce(),
            edit_grace_ms: default_edit_grace(),
        }
    }
}

impl SyncSettings {
    pub fn to_sync_config(&self) -> Result<SyncConfig> {
        anyhow::ensure!(self.poll_interval_ms > 0, "sync.poll_interval_ms must be positive");
        anyhow::ensure!(self.debounce_ms > 0, "sync.debounce_ms must be positive");
        anyhow::ensure!(
            self.edit_grace_ms >= self.debounce_ms,
            "sync.edit_grace_ms ({}) must not be shorter than sync.debounce_ms ({})",
            self.edit_grace_ms,
            self.debounce_ms
        );
        Ok(SyncConfig {
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            debounce: Duration::from_millis(self.debounce_ms),
            edit_grace: Duration::from_millis(self.edit_grace_ms),
        })
    }
}

/// Top-level gradeboard configuration.
///
/// Note: Custom Debug impl masks the admin PIN.
#[derive(Clone, Serialize, Deserialize)]
pub struct GradeboardConfig {
    /// Path to the question/answer corpus JSON.
    #[serde(default = "default_corpus_path")]
    pub corpus: PathBuf,
    /// Reviewer name used when none is given on the command line.
    #[serde(default)]
    pub reviewer: Option<String>,
    /// Shared PIN for administrative operations.
    #[serde(default)]
    pub admin_pin: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub sync: SyncSettings,
}

fn default_corpus_path() -> PathBuf {
    PathBuf::from("data/corpus.json")
}

impl Default for GradeboardConfig {
    fn default() -> Self {
        Self {
            corpus: default_corpus_path(),
            reviewer: None,
            admin_pin: None,
            store: StoreConfig::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl std::fmt::Debug for GradeboardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GradeboardConfig")
            .field("corpus", &self.corpus)
            .field("reviewer", &self.reviewer)
            .field("admin_pin", &self.admin_pin.as_ref().map(|_| "***"))
            .field("store", &self.store)
            .field("sync", &self.sync)
            .finish()
    }
}

impl GradeboardConfig {
    pub fn admin_gate(&self) -> AdminGate {
        AdminGate::new(self.admin_pin.clone())
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_store_config(config: &StoreConfig) -> StoreConfig {
    match config {
        StoreConfig::File { path } => StoreConfig::File {
            path: PathBuf::from(resolve_env_vars(&path.to_string_lossy())),
        },
        StoreConfig::RestKv { url, token, key } => StoreConfig::RestKv {
            url: resolve_env_vars(url),
            token: resolve_env_vars(token),
            key: resolve_env_vars(key),
        },
        StoreConfig::Memory => StoreConfig::Memory,
    }
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order without a path:
/// 1. `gradeboard.toml` in the current directory
/// 2. `~/.config/gradeboard/config.toml`
///
/// Environment variable overrides: `GRADEBOARD_ADMIN_PIN`,
/// `GRADEBOARD_KV_TOKEN`, `GRADEBOARD_REVIEWER`.
pub fn load_config_from(path: Option<&Path>) -> Result<GradeboardConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("gradeboard.toml");
        if local.exists() {
            Some(local)
        } else {
            config_dir()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => GradeboardConfig::default(),
    };

    if let Ok(pin) = std::env::var("GRADEBOARD_ADMIN_PIN") {
        config.admin_pin = Some(pin);
    }
    if let Ok(reviewer) = std::env::var("GRADEBOARD_REVIEWER") {
        config.reviewer = Some(reviewer);
    }
    if let Ok(key) = std::env::var("GRADEBOARD_KV_TOKEN") {
        if let StoreConfig::RestKv { token, .. } = &mut config.store {
            *token = key;
        }
    }

    Ok(config)
}

/// Parse a TOML string into a config, resolving `${VAR}` references.
pub fn parse_config(content: &str) -> Result<GradeboardConfig> {
    let mut config: GradeboardConfig = toml::from_str(content)?;
    config.store = resolve_store_config(&config.store);
    config.admin_pin = config
        .admin_pin
        .as_deref()
        .map(resolve_env_vars)
        .filter(|p| !p.is_empty());
    config.reviewer = config
        .reviewer
        .as_deref()
        .map(resolve_env_vars)
        .filter(|r| !r.trim().is_empty());
    Ok(config)
}

/// `~/.config/gradeboard`
pub fn config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("gradeboard"))
}

/// Remember the reviewer name for later sessions.
pub fn remember_reviewer(name: &str) -> Result<PathBuf> {
    let dir = config_dir().context("HOME is not set; cannot remember reviewer")?;
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create {}", dir.display()))?;
    let path = dir.join("reviewer");
    std::fs::write(&path, name.trim())
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(path)
}

/// The reviewer name saved by [`remember_reviewer`], if any.
pub fn recall_reviewer() -> Option<String> {
    let path = config_dir()?.join("reviewer");
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Result<Box<dyn LedgerStore>> {
    match config {
        StoreConfig::File { path } => Ok(Box::new(FileStore::new(path.clone()))),
        StoreConfig::RestKv { url, token, key } => {
            anyhow::ensure!(!url.is_empty(), "rest_kv store requires a url");
            Ok(Box::new(RestKvStore::new(url, token, key)?))
        }
        StoreConfig::Memory => {
            tracing::warn!("using in-memory store; grades will not outlive this process");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_GRADEBOARD_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_GRADEBOARD_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_GRADEBOARD_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        std::env::remove_var("_GRADEBOARD_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = GradeboardConfig::default();
        assert_eq!(config.corpus, PathBuf::from("data/corpus.json"));
        assert!(matches!(config.store, StoreConfig::File { .. }));
        assert_eq!(config.sync.poll_interval_ms, 5000);
        assert_eq!(config.sync.debounce_ms, 1000);
        assert!(!config.admin_gate().is_configured());
    }

    #[test]
    fn parse_rest_kv_config() {
        std::env::set_var("_GRADEBOARD_TEST_TOKEN", "tok-123");
        let toml_str = r#"
corpus = "corpus.json"
reviewer = "Alice"
admin_pin = "9999"

[store]
type = "rest_kv"
url = "https://kv.example.com"
token = "${_GRADEBOARD_TEST_TOKEN}"

[sync]
poll_interval_ms = 8000
"#;
        let config = parse_config(toml_str).unwrap();
        std::env::remove_var("_GRADEBOARD_TEST_TOKEN");

        assert_eq!(config.reviewer.as_deref(), Some("Alice"));
        match &config.store {
            StoreConfig::RestKv { url, token, key } => {
                assert_eq!(url, "https://kv.example.com");
                assert_eq!(token, "tok-123");
                assert_eq!(key, DEFAULT_KEY);
            }
            other => panic!("unexpected store: {other:?}"),
        }
        let sync = config.sync.to_sync_config().unwrap();
        assert_eq!(sync.poll_interval, Duration::from_secs(8));
        assert_eq!(sync.debounce, Duration::from_secs(1));
        assert!(config.admin_gate().authorize("9999").is_ok());
    }

    #[test]
    fn debug_masks_secrets() {
        let config = parse_config(
            r#"
admin_pin = "1357"

[store]
type = "rest_kv"
url = "https://kv.example.com"
token = "very-secret"
"#,
        )
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("1357"));
        assert!(!debug.contains("very-secret"));
    }

    #[test]
    fn zero_poll_interval_rejected() {
        let settings = SyncSettings {
            poll_interval_ms: 0,
            ..SyncSettings::default()
        };
        assert!(settings.to_sync_config().is_err());
    }

    #[test]
    fn edit_grace_shorter_than_debounce_rejected() {
        let settings = SyncSettings {
            debounce_ms: 1000,
            edit_grace_ms: 200,
            ..SyncSettings::default()
        };
        let err = settings.to_sync_config().unwrap_err();
        assert!(err.to_string().contains("edit_grace_ms"));

        let equal = SyncSettings {
            debounce_ms: 1000,
            edit_grace_ms: 1000,
            ..SyncSettings::default()
        };
        assert!(equal.to_sync_config().is_ok());
    }

    #[test]
    fn unknown_store_type_rejected() {
        assert!(parse_config("[store]\ntype = \"s3\"\n").is_err());
    }

    #[test]
    fn missing_explicit_config_fails() {
        let err = load_config_from(Some(Path::new("/nope/gradeboard.toml"))).unwrap_err();
        assert!(err.to_string().contains("config file not found"));
    }

    #[test]
    fn create_each_store() {
        assert_eq!(create_store(&StoreConfig::Memory).unwrap().name(), "memory");
        assert_eq!(create_store(&StoreConfig::default()).unwrap().name(), "file");
        let kv = StoreConfig::RestKv {
            url: "http://localhost:8079".into(),
            token: String::new(),
            key: "k".into(),
        };
        assert_eq!(create_store(&kv).unwrap().name(), "rest_kv");
    }
}
