//! Collection configuration management.

use policyqa_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Smallest accepted Top-K.
pub const MIN_TOP_K: usize = 1;

/// Largest accepted Top-K.
pub const MAX_TOP_K: usize = 20;

/// Tunable parameters for one collection's pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PipelineConfig {
    /// Collection name
    pub collection: String,

    /// Chunk size in tokens
    pub chunk_size: usize,

    /// Tokens shared by consecutive chunks of a page
    pub chunk_overlap: usize,

    /// Number of chunks retrieved per question
    pub top_k: usize,

    /// Texts per embedding request
    pub embed_batch_size: usize,

    /// Embedding requests in flight at once
    pub embed_concurrency: usize,

    /// Entries inserted per index write
    pub insert_batch_size: usize,

    /// Sampling temperature for answer generation
    pub temperature: f32,

    /// Optional cap on generated tokens
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            collection: "policy_rag".to_string(),
            chunk_size: 700,
            chunk_overlap: 120,
            top_k: 5,
            embed_batch_size: 64,
            embed_concurrency: 4,
            insert_batch_size: 256,
            temperature: 0.2,
            max_tokens: None,
        }
    }
}

impl PipelineConfig {
    /// Default parameters for a named collection.
    pub fn for_collection(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            ..Default::default()
        }
    }

    /// Check every parameter, rejecting values the pipeline can't run with.
    pub fn validate(&self) -> AppResult<()> {
        if self.collection.trim().is_empty() {
            return Err(AppError::Config("collection name must not be empty".to_string()));
        }
        if self
            .collection
            .contains(|c: char| c == '/' || c == '\\' || c == '.')
        {
            return Err(AppError::Config(format!(
                "collection name '{}' must not contain path separators or dots",
                self.collection
            )));
        }
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be at least 1".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        validate_top_k(self.top_k).map_err(|_| {
            AppError::Config(format!(
                "topK must be between {} and {}, got {}",
                MIN_TOP_K, MAX_TOP_K, self.top_k
            ))
        })?;
        if self.embed_batch_size == 0 || self.embed_concurrency == 0 || self.insert_batch_size == 0 {
            return Err(AppError::Config(
                "embedBatchSize, embedConcurrency and insertBatchSize must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(AppError::Config(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        Ok(())
    }
}

/// Check a Top-K value against the accepted range.
pub fn validate_top_k(top_k: usize) -> AppResult<()> {
    if (MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        Ok(())
    } else {
        Err(AppError::invalid_input(
            policyqa_core::Stage::Retrieval,
            format!(
                "top-k must be between {} and {}, got {}",
                MIN_TOP_K, MAX_TOP_K, top_k
            ),
        ))
    }
}

/// Load collection configuration.
///
/// Loads from `.policyqa/collections/<collection>/config.yaml` if it exists,
/// otherwise returns defaults for the collection.
pub fn load_config(workspace: &Path, collection: &str) -> AppResult<PipelineConfig> {
    let config_path = get_config_path(workspace, collection);

    if !config_path.exists() {
        tracing::debug!(
            "Using default pipeline config for '{}' (no config file found)",
            collection
        );
        return Ok(PipelineConfig::for_collection(collection));
    }

    let content = fs::read_to_string(&config_path).map_err(|e| {
        AppError::Config(format!("Failed to read config at {:?}: {}", config_path, e))
    })?;

    let mut config: PipelineConfig = serde_yaml::from_str(&content).map_err(|e| {
        AppError::Config(format!("Failed to parse config at {:?}: {}", config_path, e))
    })?;

    // The directory name wins over whatever the file says
    config.collection = collection.to_string();
    config.validate()?;

    tracing::debug!("Loaded pipeline config for '{}'", collection);
    Ok(config)
}

/// Save collection configuration.
pub fn save_config(workspace: &Path, config: &PipelineConfig) -> AppResult<()> {
    config.validate()?;
    let config_path = get_config_path(workspace, &config.collection);

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml = serde_yaml::to_string(config)?;
    fs::write(&config_path, yaml)?;

    tracing::debug!("Saved pipeline config for '{}'", config.collection);
    Ok(())
}

/// Get the directory holding a collection's files.
pub fn get_collection_dir(workspace: &Path, collection: &str) -> PathBuf {
    workspace
        .join(".policyqa")
        .join("collections")
        .join(collection)
}

/// Get the path to a collection's config file.
pub fn get_config_path(workspace: &Path, collection: &str) -> PathBuf {
    get_collection_dir(workspace, collection).join("config.yaml")
}

/// Get the SQLite index path for a collection.
pub fn get_index_path(workspace: &Path, collection: &str) -> PathBuf {
    get_collection_dir(workspace, collection).join("index.sqlite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let config = load_config(temp.path(), "hr").unwrap();

        assert_eq!(config.collection, "hr");
        assert_eq!(config.chunk_size, 700);
        assert_eq!(config.chunk_overlap, 120);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let mut config = PipelineConfig::for_collection("hr");
        config.chunk_size = 400;
        config.top_k = 8;

        save_config(temp.path(), &config).unwrap();
        assert!(get_config_path(temp.path(), "hr").exists());

        let loaded = load_config(temp.path(), "hr").unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let temp = TempDir::new().unwrap();
        let path = get_config_path(temp.path(), "hr");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "topK: 3\n").unwrap();

        let loaded = load_config(temp.path(), "hr").unwrap();
        assert_eq!(loaded.top_k, 3);
        assert_eq!(loaded.chunk_size, 700);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        let mut config = PipelineConfig::default();
        config.chunk_overlap = config.chunk_size;
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_top_k_bounds() {
        assert!(validate_top_k(1).is_ok());
        assert!(validate_top_k(20).is_ok());
        assert!(validate_top_k(0).is_err());
        assert!(validate_top_k(21).is_err());
    }

    #[test]
    fn test_collection_name_rejects_separators() {
        let config = PipelineConfig::for_collection("../etc");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_index_path_layout() {
        let path = get_index_path(Path::new("/ws"), "hr");
        assert_eq!(path, PathBuf::from("/ws/.policyqa/collections/hr/index.sqlite"));
    }
}
