//! Configuration management for PolicyQA.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.policyqa/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! The configuration is workspace-centric, with all state stored in `.policyqa/`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Chat providers the answer generator can talk to.
pub const CHAT_PROVIDERS: &[&str] = &["openai", "ollama"];

/// Embedding providers the embedder can talk to.
pub const EMBEDDING_PROVIDERS: &[&str] = &["openai", "ollama", "trigram"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .policyqa/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Chat provider ("openai" or "ollama")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Custom chat endpoint (base URL)
    pub endpoint: Option<String>,

    /// Embedding provider ("openai", "ollama" or "trigram")
    pub embedding_provider: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Fixed output dimension of the embedding model
    pub embedding_dimensions: usize,

    /// Custom embedding endpoint (base URL)
    pub embedding_endpoint: Option<String>,

    /// Environment variable holding the API key for hosted providers
    pub api_key_env: String,

    /// Explicit API key (takes precedence over `api_key_env`)
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Timeout applied to every embedding and chat request
    pub request_timeout_secs: u64,

    /// Vector index collection name
    pub collection: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    embedding: Option<EmbeddingSection>,
    logging: Option<LoggingSection>,
    collection: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    #[serde(rename = "apiKeyEnv")]
    api_key_env: Option<String>,
    #[serde(rename = "timeoutSecs")]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EmbeddingSection {
    provider: Option<String>,
    model: Option<String>,
    dimensions: Option<usize>,
    endpoint: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
    json: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            endpoint: None,
            embedding_provider: "openai".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            embedding_dimensions: 1536,
            embedding_endpoint: None,
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            request_timeout_secs: 60,
            collection: "policy_rag".to_string(),
            log_level: None,
            log_json: false,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, YAML config file,
    /// environment variables. CLI flags are applied afterwards with
    /// [`AppConfig::with_overrides`].
    ///
    /// Environment variables:
    /// - `POLICYQA_PROVIDER`: chat provider
    /// - `POLICYQA_MODEL`: chat model
    /// - `POLICYQA_API_KEY`: API key
    /// - `RUST_LOG`: log level
    /// - `NO_COLOR`: disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use policyqa_core::config::AppConfig;
    ///
    /// let config = AppConfig::load(None, None).expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }
        config.config_file = config_file;

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.policyqa_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        } else if config.config_file.is_some() {
            return Err(AppError::Config(format!(
                "Config file not found: {:?}",
                config_path
            )));
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("POLICYQA_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("POLICYQA_MODEL") {
            config.model = model;
        }

        if let Ok(key) = std::env::var("POLICYQA_API_KEY") {
            config.api_key = Some(key);
        }

        if config.log_level.is_none() {
            config.log_level = std::env::var("RUST_LOG").ok();
        }

        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge YAML configuration file into this config.
    fn merge_yaml(self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let config_file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge(config_file))
    }

    fn merge(mut self, file: ConfigFile) -> Self {
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                self.provider = provider;
            }
            if let Some(model) = llm.model {
                self.model = model;
            }
            if llm.endpoint.is_some() {
                self.endpoint = llm.endpoint;
            }
            if let Some(env) = llm.api_key_env {
                self.api_key_env = env;
            }
            if let Some(timeout) = llm.timeout_secs {
                self.request_timeout_secs = timeout;
            }
        }

        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                self.embedding_provider = provider;
            }
            if let Some(model) = embedding.model {
                self.embedding_model = model;
            }
            if let Some(dimensions) = embedding.dimensions {
                self.embedding_dimensions = dimensions;
            }
            if embedding.endpoint.is_some() {
                self.embedding_endpoint = embedding.endpoint;
            }
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                self.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                self.no_color = !color;
            }
            if let Some(json) = logging.json {
                self.log_json = json;
            }
        }

        if let Some(collection) = file.collection {
            self.collection = collection;
        }

        self
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// CLI flags take precedence over environment variables and the config file.
    pub fn with_overrides(
        mut self,
        provider: Option<String>,
        model: Option<String>,
        collection: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if let Some(collection) = collection {
            self.collection = collection;
        }

        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }

        if verbose {
            self.verbose = true;
            // Verbose mode implies debug logging
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .policyqa directory.
    pub fn policyqa_dir(&self) -> PathBuf {
        self.workspace.join(".policyqa")
    }

    /// Ensure the .policyqa directory exists.
    pub fn ensure_policyqa_dir(&self) -> AppResult<()> {
        let dir = self.policyqa_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create .policyqa directory: {}", e))
            })?;
        }
        Ok(())
    }

    /// Resolve the API key: explicit key first, then `api_key_env`.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Whether a provider is a hosted service that needs an API key.
    pub fn requires_api_key(provider: &str) -> bool {
        provider.eq_ignore_ascii_case("openai")
    }

    /// Validate provider names and embedding settings.
    pub fn validate(&self) -> AppResult<()> {
        if !CHAT_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown chat provider: {}. Supported: {}",
                self.provider,
                CHAT_PROVIDERS.join(", ")
            )));
        }

        if !EMBEDDING_PROVIDERS.contains(&self.embedding_provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown embedding provider: {}. Supported: {}",
                self.embedding_provider,
                EMBEDDING_PROVIDERS.join(", ")
            )));
        }

        if self.embedding_dimensions == 0 {
            return Err(AppError::Config(
                "Embedding dimensions must be a positive integer".to_string(),
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "Request timeout must be a positive number of seconds".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate that an API key is available for any hosted provider in use.
    pub fn validate_credentials(&self) -> AppResult<()> {
        let needs_key = Self::requires_api_key(&self.provider)
            || Self::requires_api_key(&self.embedding_provider);

        if needs_key && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found. Set {} or POLICYQA_API_KEY.",
                self.api_key_env
            )));
        }

        Ok(())
    }
}
