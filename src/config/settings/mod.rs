
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::database::Metric;
use crate::embeddings::chunking::ChunkingConfig;

pub const DEFAULT_COLLECTION_NAME: &str = "finwhiz-index";
pub const DEFAULT_DIMENSION: usize = 1024;
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_TOP_K: usize = 5;

pub const REGION_ENV: &str = "PINECONE_ENV";
pub const COHERE_API_KEY_ENV: &str = "COHERE_API_KEY";
pub const PINECONE_API_KEY_ENV: &str = "PINECONE_API_KEY";

/// Cohere rejects embed requests carrying more texts than this
pub const MAX_EMBED_BATCH_SIZE: usize = 96;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub cohere: CohereConfig,
    #[serde(default)]
    pub pinecone: PineconeConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub export: ExportConfig,
    #[serde(skip)]
    pub base_dir: PathBuf,
}

/// How records of successive uploads share a collection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NamespacePolicy {
    /// Each indexed document gets its own namespace
    #[default]
    PerDocument,
    /// All documents write into the default namespace, overwriting chunk ids
    Shared,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IndexConfig {
    pub collection_name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
    pub namespace_policy: NamespacePolicy,
    pub top_k: usize,
    pub readiness_timeout_seconds: u64,
    pub readiness_poll_ms: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            collection_name: DEFAULT_COLLECTION_NAME.to_string(),
            dimension: DEFAULT_DIMENSION,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: DEFAULT_REGION.to_string(),
            namespace_policy: NamespacePolicy::PerDocument,
            top_k: DEFAULT_TOP_K,
            readiness_timeout_seconds: 120,
            readiness_poll_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CohereConfig {
    pub base_url: String,
    pub embed_model: String,
    pub chat_model: String,
    pub embed_batch_size: usize,
}

impl Default for CohereConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.cohere.com".to_string(),
            embed_model: "embed-english-v3.0".to_string(),
            chat_model: "command-r-plus".to_string(),
            embed_batch_size: MAX_EMBED_BATCH_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PineconeConfig {
    pub control_plane_url: String,
    pub api_version: String,
}

impl Default for PineconeConfig {
    fn default() -> Self {
        Self {
            control_plane_url: "https://api.pinecone.io".to_string(),
            api_version: "2024-07".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub retry_attempts: u32,
    pub initial_backoff_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            retry_attempts: 3,
            initial_backoff_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExportConfig {
    pub directory: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

/// Provider API keys, sourced from the environment only
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub cohere_api_key: String,
    pub pinecone_api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("cohere_api_key", &"<redacted>")
            .field("pinecone_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    /// Read both API keys from the process environment
    #[inline]
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read both API keys through `lookup`, failing on the first one that is absent or blank
    #[inline]
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            cohere_api_key: read_credential(&lookup, COHERE_API_KEY_ENV)?,
            pinecone_api_key: read_credential(&lookup, PINECONE_API_KEY_ENV)?,
        })
    }
}

/// Read one API key through `lookup`; blank values count as absent
#[inline]
pub fn read_credential<F>(lookup: F, name: &'static str) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .ok_or(ConfigError::MissingCredential(name))
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found or could not be created")]
    DirectoryError,
    #[error("Missing credential: set the {0} environment variable")]
    MissingCredential(&'static str),
    #[error("Invalid URL format: {0}")]
    InvalidUrl(String),
    #[error(
        "Invalid collection name: {0:?} (1 to 45 lowercase letters, digits or hyphens)"
    )]
    InvalidCollectionName(String),
    #[error("Invalid embedding dimension: {0} (must be between 1 and 20000)")]
    InvalidDimension(usize),
    #[error("Invalid top_k: {0} (must be between 1 and 100)")]
    InvalidTopK(usize),
    #[error("Invalid chunk size: {0} (must be between 1 and 100000)")]
    InvalidChunkSize(usize),
    #[error("Invalid model name: {0:?} (cannot be empty)")]
    InvalidModel(String),
    #[error("Invalid cloud/region: {0:?} (cannot be empty)")]
    InvalidRegion(String),
    #[error("Invalid embed batch size: {0} (must be between 1 and 96)")]
    InvalidBatchSize(usize),
    #[error("Invalid timeout: {0} (must be between 1 and 600 seconds)")]
    InvalidTimeout(u64),
    #[error("Invalid retry attempts: {0} (must be between 1 and 10)")]
    InvalidRetryAttempts(u32),
    #[error("Invalid initial backoff: {0} ms (must be at most 60000)")]
    InvalidBackoff(u64),
    #[error("Invalid readiness poll interval: {0} ms (must be between 100 and 60000)")]
    InvalidReadinessPoll(u64),
    #[error("Invalid readiness timeout: {0} (must be between 1 and 3600 seconds)")]
    InvalidReadinessTimeout(u64),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

impl Config {
    /// Default configuration directory, e.g. `~/.config/finwhiz`
    #[inline]
    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("finwhiz"))
            .ok_or(ConfigError::DirectoryError)
    }

    /// Load `config.toml` from `config_dir`, applying environment overrides
    #[inline]
    pub fn load<P: AsRef<Path>>(config_dir: P) -> Result<Self> {
        Self::load_with_env(config_dir, |name| std::env::var(name).ok())
    }

    #[inline]
    pub fn load_with_env<P, F>(config_dir: P, lookup: F) -> Result<Self>
    where
        P: AsRef<Path>,
        F: Fn(&str) -> Option<String>,
    {
        let config_path = config_dir.as_ref().join("config.toml");

        let mut config = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            toml::from_str::<Config>(&content).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            Self::default()
        };
        config.base_dir = config_dir.as_ref().to_path_buf();
        config.apply_env_overrides(lookup);

        config
            .validate()
            .with_context(|| "Configuration validation failed")?;

        Ok(config)
    }

    /// The region may be overridden from the environment; the file value stays the fallback
    #[inline]
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup(REGION_ENV).filter(|r| !r.trim().is_empty()) {
            self.index.region = region.trim().to_string();
        }
    }

    #[inline]
    pub fn save(&self) -> Result<()> {
        self.validate()
            .context("Configuration validation failed before saving")?;

        let config_dir = self.get_base_dir();

        fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        let config_path = self.config_file_path();
        let content = toml::to_string_pretty(self).context("Failed to serialize config to TOML")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    #[inline]
    pub fn get_base_dir(&self) -> &Path {
        &self.base_dir
    }

    #[inline]
    pub fn config_file_path(&self) -> PathBuf {
        self.get_base_dir().join("config.toml")
    }

    #[inline]
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.index.validate()?;
        self.cohere.validate()?;
        self.pinecone.validate()?;
        self.http.validate()?;

        if !(1..=100_000).contains(&self.chunking.chunk_size) {
            return Err(ConfigError::InvalidChunkSize(self.chunking.chunk_size));
        }

        Ok(())
    }
}

impl IndexConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_collection_name(&self.collection_name)?;

        if !(1..=20_000).contains(&self.dimension) {
            return Err(ConfigError::InvalidDimension(self.dimension));
        }

        if !(1..=100).contains(&self.top_k) {
            return Err(ConfigError::InvalidTopK(self.top_k));
        }

        if self.cloud.trim().is_empty() {
            return Err(ConfigError::InvalidRegion(self.cloud.clone()));
        }

        if self.region.trim().is_empty() {
            return Err(ConfigError::InvalidRegion(self.region.clone()));
        }

        if !(100..=60_000).contains(&self.readiness_poll_ms) {
            return Err(ConfigError::InvalidReadinessPoll(self.readiness_poll_ms));
        }

        if !(1..=3600).contains(&self.readiness_timeout_seconds) {
            return Err(ConfigError::InvalidReadinessTimeout(
                self.readiness_timeout_seconds,
            ));
        }

        Ok(())
    }

    pub fn set_collection_name(&mut self, name: String) -> Result<(), ConfigError> {
        validate_collection_name(&name)?;
        self.collection_name = name;
        Ok(())
    }

    pub fn set_region(&mut self, region: String) -> Result<(), ConfigError> {
        if region.trim().is_empty() {
            return Err(ConfigError::InvalidRegion(region));
        }
        self.region = region;
        Ok(())
    }

    pub fn set_top_k(&mut self, top_k: usize) -> Result<(), ConfigError> {
        if !(1..=100).contains(&top_k) {
            return Err(ConfigError::InvalidTopK(top_k));
        }
        self.top_k = top_k;
        Ok(())
    }
}

impl CohereConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))?;

        if self.embed_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.embed_model.clone()));
        }

        if self.chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(self.chat_model.clone()));
        }

        if !(1..=MAX_EMBED_BATCH_SIZE).contains(&self.embed_batch_size) {
            return Err(ConfigError::InvalidBatchSize(self.embed_batch_size));
        }

        Ok(())
    }

    pub fn base_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.base_url).map_err(|_| ConfigError::InvalidUrl(self.base_url.clone()))
    }

    pub fn set_embed_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.embed_model = model;
        Ok(())
    }

    pub fn set_chat_model(&mut self, model: String) -> Result<(), ConfigError> {
        if model.trim().is_empty() {
            return Err(ConfigError::InvalidModel(model));
        }
        self.chat_model = model;
        Ok(())
    }
}

impl PineconeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.control_plane_url().map(|_| ())
    }

    pub fn control_plane_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.control_plane_url)
            .map_err(|_| ConfigError::InvalidUrl(self.control_plane_url.clone()))
    }
}

impl HttpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=600).contains(&self.timeout_seconds) {
            return Err(ConfigError::InvalidTimeout(self.timeout_seconds));
        }

        if !(1..=10).contains(&self.retry_attempts) {
            return Err(ConfigError::InvalidRetryAttempts(self.retry_attempts));
        }

        if self.initial_backoff_ms > 60_000 {
            return Err(ConfigError::InvalidBackoff(self.initial_backoff_ms));
        }

        Ok(())
    }
}

/// Pinecone index names: lowercase alphanumerics and hyphens, at most 45 characters
pub fn validate_collection_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name.len() <= 45
        && !name.starts_with('-')
        && !name.ends_with('-')
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');

    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidCollectionName(name.to_string()))
    }
}
