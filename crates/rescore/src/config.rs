//! Engine configuration via `ltrank.toml`
//!
//! On first start a commented default `ltrank.toml` can be written next to
//! the definition files. To change settings, edit the file and restart.

use crate::request::DEFAULT_RERANK_DOCS;
use ltrank_concurrency::ThreadModuleConfig;
use ltrank_core::{LtrError, LtrResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file name
pub const CONFIG_FILE_NAME: &str = "ltrank.toml";

/// Default number of cached feature vectors
pub const DEFAULT_FEATURE_VECTOR_CACHE_SIZE: usize = 4096;

/// Engine configuration loaded from `ltrank.toml`.
///
/// # Example
///
/// ```toml
/// default_rerank_docs = 200
/// feature_vector_cache_size = 4096
/// definitions_dir = "/var/lib/ltrank"
///
/// [thread_module]
/// max_threads = 8
/// max_query_threads = 4
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LtrConfig {
    /// Rerank window when a request does not set `reRankDocs`
    #[serde(default = "default_rerank_docs")]
    pub default_rerank_docs: usize,
    /// Capacity of the feature vector cache
    #[serde(default = "default_cache_size")]
    pub feature_vector_cache_size: usize,
    /// Directory holding `features.json` and `models.json`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions_dir: Option<PathBuf>,
    /// Parallel scoring limits
    #[serde(default)]
    pub thread_module: ThreadModuleConfig,
}

fn default_rerank_docs() -> usize {
    DEFAULT_RERANK_DOCS
}

fn default_cache_size() -> usize {
    DEFAULT_FEATURE_VECTOR_CACHE_SIZE
}

impl Default for LtrConfig {
    fn default() -> Self {
        Self {
            default_rerank_docs: default_rerank_docs(),
            feature_vector_cache_size: default_cache_size(),
            definitions_dir: None,
            thread_module: ThreadModuleConfig::default(),
        }
    }
}

impl LtrConfig {
    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# ltrank configuration
#
# Number of first-pass documents reranked when a request does not set
# reRankDocs (default: 200)
default_rerank_docs = 200

# Number of logged feature vectors kept in memory (default: 4096)
feature_vector_cache_size = 4096

# Directory holding features.json and models.json.
# definitions_dir = "/var/lib/ltrank"

# Parallel segment scoring. With max_threads = 1 (default) rescoring runs
# on the calling thread.
[thread_module]
max_threads = 1
max_query_threads = 1
thread_name_prefix = "ltrExecutor"
"#
    }

    /// Parse and validate config text
    ///
    /// # Errors
    ///
    /// `Config` if the text does not parse, invalid limits as reported by
    /// `validate`.
    pub fn from_toml_str(content: &str) -> LtrResult<Self> {
        let config: LtrConfig = toml::from_str(content)
            .map_err(|e| LtrError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> LtrResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            LtrError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            LtrError::Config(msg) => {
                LtrError::Config(format!("{} (in '{}')", msg, path.display()))
            }
            other => other,
        })
    }

    /// Write the default config file if it does not already exist.
    ///
    /// Returns `Ok(())` whether the file was created or already existed.
    pub fn write_default_if_missing(path: &Path) -> LtrResult<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                LtrError::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> LtrResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| LtrError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            LtrError::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Check the settings
    ///
    /// # Errors
    ///
    /// `Config` for a zero rerank window, `ThreadModuleConfig` for invalid
    /// thread limits.
    pub fn validate(&self) -> LtrResult<()> {
        if self.default_rerank_docs == 0 {
            return Err(LtrError::Config(
                "default_rerank_docs must be at least 1".to_string(),
            ));
        }
        self.thread_module.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_toml_matches_default() {
        let config = LtrConfig::from_toml_str(LtrConfig::default_toml()).unwrap();
        assert_eq!(config, LtrConfig::default());
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config = LtrConfig::from_toml_str("").unwrap();
        assert_eq!(config.default_rerank_docs, 200);
        assert_eq!(config.feature_vector_cache_size, DEFAULT_FEATURE_VECTOR_CACHE_SIZE);
        assert_eq!(config.thread_module.max_threads, 1);
        assert!(config.definitions_dir.is_none());
    }

    #[test]
    fn thread_module_section() {
        let config = LtrConfig::from_toml_str(
            "[thread_module]\nmax_threads = 8\nmax_query_threads = 4\n",
        )
        .unwrap();
        assert_eq!(config.thread_module.max_threads, 8);
        assert_eq!(config.thread_module.max_query_threads, 4);
        assert_eq!(config.thread_module.thread_name_prefix, "ltrExecutor");
    }

    #[test]
    fn invalid_thread_limits_rejected() {
        let err = LtrConfig::from_toml_str("[thread_module]\nmax_threads = 2\nmax_query_threads = 3\n")
            .unwrap_err();
        assert!(matches!(err, LtrError::ThreadModuleConfig(_)));
    }

    #[test]
    fn zero_rerank_docs_rejected() {
        let err = LtrConfig::from_toml_str("default_rerank_docs = 0").unwrap_err();
        assert!(matches!(err, LtrError::Config(_)));
    }

    #[test]
    fn unparsable_config_rejected() {
        let err = LtrConfig::from_toml_str("default_rerank_docs = \"many\"").unwrap_err();
        assert!(matches!(err, LtrError::Config(_)));
    }

    #[test]
    fn write_default_creates_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        assert!(!path.exists());

        LtrConfig::write_default_if_missing(&path).unwrap();
        assert!(path.exists());
        assert_eq!(LtrConfig::from_file(&path).unwrap(), LtrConfig::default());
    }

    #[test]
    fn write_default_does_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "default_rerank_docs = 50\n").unwrap();

        LtrConfig::write_default_if_missing(&path).unwrap();
        assert_eq!(LtrConfig::from_file(&path).unwrap().default_rerank_docs, 50);
    }

    #[test]
    fn write_to_file_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let config = LtrConfig {
            default_rerank_docs: 100,
            feature_vector_cache_size: 10,
            definitions_dir: Some(dir.path().to_path_buf()),
            thread_module: ThreadModuleConfig::default().with_threads(4, 2),
        };

        config.write_to_file(&path).unwrap();
        assert_eq!(LtrConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn missing_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let err = LtrConfig::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, LtrError::Config(_)));
    }
}
