use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LexisError, Result};
use crate::types::ReloadPolicy;

/// Top-level configuration for Lexis.
///
/// Loaded from `~/.lexis/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LexisConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub index: IndexConfig,
}

impl LexisConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LexisConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject settings the pipeline and index cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.flush_every == 0 {
            return Err(LexisError::Config(
                "ingest.flush_every must be at least 1".to_string(),
            ));
        }
        if self.index.default_k == 0 {
            return Err(LexisError::Config(
                "index.default_k must be at least 1".to_string(),
            ));
        }
        if self.index.max_k < self.index.default_k {
            return Err(LexisError::Config(format!(
                "index.max_k ({}) must not be smaller than index.default_k ({})",
                self.index.max_k, self.index.default_k
            )));
        }
        if self.general.max_requests_per_sec == 0 {
            return Err(LexisError::Config(
                "general.max_requests_per_sec must be at least 1".to_string(),
            ));
        }
        if self.provider.mock_dimensions == 0 {
            return Err(LexisError::Config(
                "provider.mock_dimensions must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Data directory with a leading `~/` expanded to the home directory.
    pub fn data_dir(&self) -> PathBuf {
        expand_home(&self.general.data_dir)
    }

    /// Path of the newline-delimited word list.
    pub fn words_path(&self) -> PathBuf {
        self.resolve_in_data_dir(&self.ingest.words_file)
    }

    /// Path of the persisted embedding store.
    pub fn store_path(&self) -> PathBuf {
        self.resolve_in_data_dir(&self.ingest.store_file)
    }

    fn resolve_in_data_dir(&self, file: &str) -> PathBuf {
        let path = expand_home(file);
        if path.is_absolute() {
            path
        } else {
            self.data_dir().join(path)
        }
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/").or_else(|| raw.strip_prefix("~\\")) {
        #[cfg(target_os = "windows")]
        let home = std::env::var("USERPROFILE").unwrap_or_else(|_| ".".to_string());
        #[cfg(not(target_os = "windows"))]
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        return PathBuf::from(home).join(rest);
    }
    PathBuf::from(raw)
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the word list and the embedding store.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
    /// HTTP port for `lexis serve`.
    pub port: u16,
    /// Requests per second accepted by the HTTP API before answering 429.
    pub max_requests_per_sec: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            log_level: "info".to_string(),
            port: 3030,
            max_requests_per_sec: 100,
        }
    }
}

/// Ingestion pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Word list file, relative to `data_dir` unless absolute.
    pub words_file: String,
    /// Embedding store file, relative to `data_dir` unless absolute.
    pub store_file: String,
    /// Flush the store after this many successful embeddings.
    pub flush_every: usize,
    /// Delay after every provider call, in milliseconds.
    pub request_delay_ms: u64,
    /// Delay after a rate-limit response, in milliseconds.
    pub rate_limit_backoff_ms: u64,
}

impl IngestConfig {
    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn rate_limit_backoff(&self) -> Duration {
        Duration::from_millis(self.rate_limit_backoff_ms)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            words_file: "words.txt".to_string(),
            store_file: "vocab-embeddings.json".to_string(),
            flush_every: 50,
            request_delay_ms: 100,
            rate_limit_backoff_ms: 5_000,
        }
    }
}

/// Which embedding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Remote OpenAI-compatible `/embeddings` endpoint.
    OpenAi,
    /// Deterministic hash-based vectors, no network.
    Mock,
}

/// Embedding provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    /// Base URL; `/embeddings` is appended.
    pub api_base: String,
    pub model: String,
    /// Falls back to `OPENAI_API_KEY` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Falls back to `OPENAI_PROJECT_ID` when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Vector length produced by the mock provider.
    pub mock_dimensions: usize,
}

impl ProviderConfig {
    /// API key from config, else from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    /// Project id from config, else from the environment.
    pub fn resolve_project_id(&self) -> Option<String> {
        self.project_id
            .clone()
            .or_else(|| std::env::var("OPENAI_PROJECT_ID").ok())
            .filter(|p| !p.trim().is_empty())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::OpenAi,
            api_base: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            api_key: None,
            project_id: None,
            timeout_secs: 30,
            mock_dimensions: 384,
        }
    }
}

/// Neighbor index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub reload_policy: ReloadPolicy,
    /// Neighbors returned when a request does not say.
    pub default_k: usize,
    /// Upper bound on neighbors per request.
    pub max_k: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            reload_policy: ReloadPolicy::Once,
            default_k: 5,
            max_k: 100,
        }
    }
}
