//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `ragfuse.toml` + `ragfuse.<env>.toml` + `RAGFUSE_*`
//! env vars (`__` separates nested keys). Every setting has a default, so an
//! empty configuration is valid. Provides helpers to expand `~` and `${VAR}`
//! and to resolve relative paths against the project root.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};

pub const ENV_PREFIX: &str = "RAGFUSE_";

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("ragfuse.toml"))
    }

    /// Load `file`, its `<stem>.<env>.toml` sibling and the environment.
    pub fn load_from(file: &Path) -> Result<Self> {
        let env_name = env::var("RAGFUSE_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::file(file));
        let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("ragfuse");
        let sibling = |suffix: &str| file.with_file_name(format!("{stem}.{suffix}.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(sibling("dev"))),
            "prod" | "production" => figment = figment.merge(Toml::file(sibling("prod"))),
            "test" | "testing" => figment = figment.merge(Toml::file(sibling("test"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Build from an in-memory TOML document layered over the defaults.
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Settings::default())).merge(Toml::string(toml));
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| Error::InvalidConfig(format!("Failed to get '{key}': {e}")))
    }

    pub fn settings(&self) -> Result<Settings> {
        self.figment
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    fn validate(&self) -> Result<()> {
        let s = self.settings()?;
        if s.search.deadline_ms == 0 {
            return Err(Error::InvalidConfig("search.deadline_ms must be positive".into()));
        }
        if s.fusion.rrf_k <= 0.0 {
            return Err(Error::InvalidConfig("fusion.rrf_k must be positive".into()));
        }
        if s.confidence.high < s.confidence.medium {
            return Err(Error::InvalidConfig("confidence.high must be >= confidence.medium".into()));
        }
        if !(0.0..=1.0).contains(&s.cache.semantic_threshold) {
            return Err(Error::InvalidConfig("cache.semantic_threshold must be within [0, 1]".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub paths: PathSettings,
    pub search: SearchSettings,
    pub collectors: CollectorSettings,
    pub fusion: FusionSettings,
    pub confidence: ConfidenceSettings,
    pub cache: CacheSettings,
    pub vector: VectorSettings,
    pub embedding: EmbeddingSettings,
    pub rerank: RerankSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    pub project_root: String,
    /// Relative to `project_root`.
    pub context_dir: String,
    /// The remaining paths are relative to `context_dir`.
    pub canonical: String,
    pub tag_shards: Vec<String>,
    pub tag_legacy: String,
    pub sqlite_db: String,
    /// Program and leading arguments of the graph query command, relative
    /// paths resolved against `project_root`. Empty disables the collector.
    pub graph_command: Vec<String>,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            project_root: ".".to_string(),
            context_dir: ".context".to_string(),
            canonical: "CANONICAL.md".to_string(),
            tag_shards: vec!["TAG_INDEX_A-M.md".to_string(), "TAG_INDEX_N-Z.md".to_string()],
            tag_legacy: "TAG_INDEX.md".to_string(),
            sqlite_db: "inputs/index.db".to_string(),
            graph_command: Vec::new(),
        }
    }
}

impl PathSettings {
    pub fn root(&self) -> PathBuf {
        expand_path(&self.project_root)
    }

    pub fn context(&self) -> PathBuf {
        resolve_with_base(&self.root(), &self.context_dir)
    }

    pub fn canonical_path(&self) -> PathBuf {
        resolve_with_base(&self.context(), &self.canonical)
    }

    pub fn tag_shard_paths(&self) -> Vec<PathBuf> {
        let ctx = self.context();
        self.tag_shards.iter().map(|s| resolve_with_base(&ctx, s)).collect()
    }

    pub fn tag_legacy_path(&self) -> PathBuf {
        resolve_with_base(&self.context(), &self.tag_legacy)
    }

    pub fn sqlite_path(&self) -> PathBuf {
        resolve_with_base(&self.context(), &self.sqlite_db)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub default_limit: usize,
    pub deadline_ms: u64,
    pub max_workers: usize,
    pub rerank_candidates: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self { default_limit: 10, deadline_ms: 8_000, max_workers: 6, rerank_candidates: 25 }
    }
}

impl SearchSettings {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectorSettings {
    pub canonical_limit: usize,
    pub tags_timeout_ms: u64,
    pub tags_max_per_file: usize,
    pub graph_timeout_ms: u64,
    pub graph_limit: usize,
    pub filename_timeout_ms: u64,
    pub filename_limit: usize,
    pub excluded_dirs: Vec<String>,
    pub sqlite_timeout_ms: u64,
    pub sqlite_limit: usize,
}

impl Default for CollectorSettings {
    fn default() -> Self {
        Self {
            canonical_limit: 5,
            tags_timeout_ms: 5_000,
            tags_max_per_file: 10,
            graph_timeout_ms: 5_000,
            graph_limit: 5,
            filename_timeout_ms: 2_000,
            filename_limit: 5,
            excluded_dirs: [".git", "node_modules", "target", "__pycache__", ".venv"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            sqlite_timeout_ms: 3_000,
            sqlite_limit: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionSettings {
    pub rrf_k: f64,
    /// Overrides layered on top of the built-in weight table.
    pub weights: HashMap<String, f64>,
    pub fallback_weight: f64,
}

impl Default for FusionSettings {
    fn default() -> Self {
        Self { rrf_k: 60.0, weights: HashMap::new(), fallback_weight: 1.0 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceSettings {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceSettings {
    fn default() -> Self {
        Self { high: 0.03, medium: 0.02 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub semantic_threshold: f32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { semantic_threshold: 0.95 }
    }
}

/// One logical subtype queried by the vector collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorSubtype {
    pub label: String,
    /// Backing table; defaults to the label.
    #[serde(default)]
    pub table: Option<String>,
    pub limit: usize,
    pub threshold: f32,
}

impl VectorSubtype {
    pub fn new(label: &str, limit: usize, threshold: f32) -> Self {
        Self { label: label.to_string(), table: None, limit, threshold }
    }

    pub fn table_name(&self) -> &str {
        self.table.as_deref().unwrap_or(&self.label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorSettings {
    /// LanceDB URI; empty disables the vector collector.
    pub uri: String,
    pub subtypes: Vec<VectorSubtype>,
}

impl Default for VectorSettings {
    fn default() -> Self {
        Self { uri: String::new(), subtypes: default_vector_subtypes() }
    }
}

pub fn default_vector_subtypes() -> Vec<VectorSubtype> {
    vec![
        VectorSubtype::new("protocol", 10, 0.3),
        VectorSubtype::new("case_study", 10, 0.3),
        VectorSubtype::new("session", 5, 0.35),
        VectorSubtype::new("capability", 5, 0.3),
        VectorSubtype::new("playbook", 5, 0.3),
        VectorSubtype::new("workflow", 5, 0.3),
        VectorSubtype::new("entity", 5, 0.3),
        VectorSubtype::new("reference", 5, 0.3),
        VectorSubtype::new("framework", 5, 0.3),
        VectorSubtype::new("user_profile", 5, 0.3),
        VectorSubtype::new("system_doc", 5, 0.3),
    ]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// `hash` (deterministic, offline) or `bge-m3` (local candle model).
    pub provider: String,
    pub model_dir: Option<String>,
    pub dim: usize,
    pub max_len: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self { provider: "hash".to_string(), model_dir: None, dim: 1024, max_len: 256 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankSettings {
    /// Rerank endpoint URL; empty disables reranking.
    pub endpoint: String,
    pub model: Option<String>,
    pub api_key_env: Option<String>,
    pub timeout_ms: u64,
}

impl Default for RerankSettings {
    fn default() -> Self {
        Self { endpoint: String::new(), model: None, api_key_env: None, timeout_ms: 10_000 }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
