//! Configuration loader and typed settings sections.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `DOCQA_*`
//! env vars. Every threshold and pattern list the pipeline routes on is
//! configuration data here, never a hidden constant, so tests can pin
//! them explicitly.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("DOCQA_").split("__"));

        Ok(Self { figment })
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract a typed section, falling back to its defaults when the
    /// section is absent from every source.
    pub fn section<T>(&self, key: &str) -> T
    where
        T: serde::de::DeserializeOwned + Default,
    {
        self.figment.extract_inner(key).unwrap_or_default()
    }

    pub fn chunking(&self) -> ChunkingConfig {
        self.section("chunking")
    }

    pub fn embedding(&self) -> EmbeddingConfig {
        self.section("embedding")
    }

    pub fn retrieval(&self) -> RetrievalConfig {
        self.section("retrieval")
    }

    pub fn generation(&self) -> GenerationConfig {
        self.section("generation")
    }
}

/// Bounds for chunk packing and the overlap carried across a hard wrap.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub min_chars: usize,
    pub max_chars: usize,
    pub overlap_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { min_chars: 200, max_chars: 700, overlap_chars: 80 }
    }
}

/// Which embedding backend to run and where its weights live.
///
/// `backend` is `"model"` for the candle sentence encoder or `"hash"`
/// for the deterministic hashing embedder used in tests and offline runs.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub backend: String,
    pub model_dir: Option<String>,
    pub hash_dim: usize,
    pub max_len: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self { backend: "model".to_string(), model_dir: None, hash_dim: 384, max_len: 256 }
    }
}

/// Retrieval depth, routing thresholds and the small-talk pattern set.
///
/// `confidence_threshold` gates whether retrieval is trusted at all;
/// `inclusion_threshold` decides which of the retrieved chunks are kept
/// as corroborating context once it is.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub confidence_threshold: f32,
    pub inclusion_threshold: f32,
    pub smalltalk_patterns: Vec<String>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 6,
            confidence_threshold: 0.12,
            inclusion_threshold: 0.05,
            smalltalk_patterns: default_smalltalk_patterns(),
        }
    }
}

pub fn default_smalltalk_patterns() -> Vec<String> {
    [
        "hi",
        "hello",
        "hey",
        "sup",
        "yo",
        "hii+",
        "good (?:morning|afternoon|evening)",
        "how (?:are|r) (?:you|u)",
        "who are you",
        "help",
        "what can you do",
        "thanks",
        "thank you",
    ]
    .iter()
    .map(|s| (*s).to_string())
    .collect()
}

/// Remote completion endpoint settings. A missing `api_key` selects the
/// extractive fallback generator for the whole process lifetime.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_context_chars: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1".to_string(),
            api_key: None,
            model: "llama-3.1-8b-instant".to_string(),
            timeout_secs: 60,
            max_context_chars: 10_000,
        }
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

/// Resolve a possibly relative path against a given base directory after
/// expansion. If `p` is absolute, it's returned as-is.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() {
        p
    } else {
        base.join(p)
    }
}
