use serde::{Deserialize, Serialize};

use super::format::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:11411";
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 4;
pub const DEFAULT_BATCH_SIZE: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn config_path() -> Option<std::path::PathBuf> {
        dirs::config_dir().map(|p| p.join("vstream").join("config.toml"))
    }

    pub fn load() -> Result<Self, ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            return Self::load_from(&path);
        }
        Ok(Self::default())
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::config_path()
            .ok_or_else(|| ConfigError::PathError("could not determine config directory".to_string()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Rejects values that would make a run impossible before any work starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.batch_size < 1 {
            return Err(ConfigError::ValidationError(
                "pipeline.batch_size must be at least 1".to_string(),
            ));
        }
        if self.embedding.concurrency_limit < 1 {
            return Err(ConfigError::ValidationError(
                "embedding.concurrency_limit must be at least 1".to_string(),
            ));
        }
        if self.embedding.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "embedding.url must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets a value by dotted key, e.g. `pipeline.batch_size`.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |e: String| ConfigError::ValidationError(format!("{key}: {e}"));
        match key {
            "embedding.url" => self.embedding.url = value.to_string(),
            "embedding.timeout_secs" => {
                self.embedding.timeout_secs = value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            "embedding.concurrency_limit" => {
                self.embedding.concurrency_limit =
                    value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            "embedding.max_attempts" => {
                self.embedding.max_attempts = value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            "pipeline.batch_size" => {
                self.pipeline.batch_size = value.parse().map_err(|e| invalid(format!("{e}")))?
            }
            "pipeline.mode" => self.pipeline.mode = value.parse().map_err(invalid)?,
            "pipeline.stage" => self.pipeline.stage = value.parse().map_err(invalid)?,
            "output.default_format" => self.output.default_format = value.parse().map_err(invalid)?,
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "unknown config key: {key}"
                )));
            }
        }
        self.validate()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Maximum number of batches in flight against the provider.
    #[serde(default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_timeout() -> u64 {
    120
}

fn default_concurrency_limit() -> usize {
    DEFAULT_CONCURRENCY_LIMIT
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            timeout_secs: default_timeout(),
            concurrency_limit: default_concurrency_limit(),
            max_attempts: default_max_attempts(),
        }
    }
}

/// How failures are scoped during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingMode {
    /// One provider call per batch; any failure aborts the run.
    #[default]
    Batch,
    /// One provider call per unit; failures are reported per unit.
    PerItem,
}

impl std::str::FromStr for ProcessingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "batch" => Ok(ProcessingMode::Batch),
            "per_item" | "item" => Ok(ProcessingMode::PerItem),
            _ => Err(format!("unknown processing mode: {}", s)),
        }
    }
}

/// Purpose of the vectors being requested from the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingStage {
    /// Vectors for stored documents
    #[default]
    Index,
    /// Vectors for search queries
    Query,
}

impl std::str::FromStr for EmbeddingStage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "index" | "document" => Ok(EmbeddingStage::Index),
            "query" => Ok(EmbeddingStage::Query),
            _ => Err(format!("unknown embedding stage: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default)]
    pub mode: ProcessingMode,

    #[serde(default)]
    pub stage: EmbeddingStage,
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            mode: ProcessingMode::default(),
            stage: EmbeddingStage::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub default_format: OutputFormat,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.url, DEFAULT_EMBEDDING_URL);
        assert_eq!(config.embedding.concurrency_limit, DEFAULT_CONCURRENCY_LIMIT);
        assert_eq!(config.pipeline.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.pipeline.mode, ProcessingMode::Batch);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_path() {
        let path = Config::config_path();
        assert!(path.is_some());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let mut config = Config::default();
        config.pipeline.batch_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let mut config = Config::default();
        config.embedding.concurrency_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [pipeline]
            batch_size = 2
            mode = "per_item"
            "#,
        )
        .unwrap();
        assert_eq!(config.pipeline.batch_size, 2);
        assert_eq!(config.pipeline.mode, ProcessingMode::PerItem);
        assert_eq!(config.pipeline.stage, EmbeddingStage::Index);
        assert_eq!(config.embedding.timeout_secs, 120);
    }

    #[test]
    fn test_set_by_key() {
        let mut config = Config::default();
        config.set("pipeline.batch_size", "8").unwrap();
        config.set("pipeline.mode", "per-item").unwrap();
        config.set("embedding.concurrency_limit", "2").unwrap();
        assert_eq!(config.pipeline.batch_size, 8);
        assert_eq!(config.pipeline.mode, ProcessingMode::PerItem);
        assert_eq!(config.embedding.concurrency_limit, 2);

        assert!(config.set("pipeline.batch_size", "0").is_err());
        assert!(config.set("pipeline.batch_size", "many").is_err());
        assert!(config.set("nope", "1").is_err());
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.pipeline.batch_size = 5;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.pipeline.batch_size, 5);
    }
}
