//! Configuration for agentrank
//!
//! Settings are layered with the `config` crate: built-in defaults, then an
//! optional TOML file, then `AGENTRANK__*` environment variables
//! (e.g. `AGENTRANK__SELECTION__MIN_SCORE=30`).

use crate::error::{AgentRankError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix
const ENV_PREFIX: &str = "AGENTRANK";

/// Models the local embedding backend knows how to load, with their dimensions
pub const SUPPORTED_MODELS: &[(&str, usize)] = &[
    ("all-MiniLM-L6-v2", 384),
    ("all-MiniLM-L12-v2", 384),
    ("bge-small-en-v1.5", 384),
    ("bge-base-en-v1.5", 768),
    ("bge-large-en-v1.5", 1024),
    ("nomic-embed-text-v1.5", 768),
];

/// Upper bound of `history.recent_window_days` (about a century)
pub const MAX_RECENT_WINDOW_DAYS: i64 = 36_500;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentRankConfig {
    pub selection: SelectionConfig,
    pub semantic: SemanticTiers,
    pub embedding: EmbeddingConfig,
    pub index: IndexConfig,
    pub history: HistoryConfig,
}

impl AgentRankConfig {
    /// Load configuration from an optional TOML file plus the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            debug!("Reading configuration from {:?}", path);
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(false));
        }

        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AgentRankConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file location inside a project
    pub fn default_path(project_root: &Path) -> PathBuf {
        project_root
            .join(IndexConfig::default().index_dir)
            .join("config.toml")
    }

    pub fn validate(&self) -> Result<()> {
        self.embedding.validate()?;
        self.semantic.validate()?;
        if self.selection.max_agents == 0 {
            return Err(AgentRankError::Validation(
                "selection.max_agents must be at least 1".to_string(),
            ));
        }
        if self.selection.min_score > 100 {
            return Err(AgentRankError::Validation(format!(
                "selection.min_score must be within 0-100, got {}",
                self.selection.min_score
            )));
        }
        if !(1..=MAX_RECENT_WINDOW_DAYS).contains(&self.history.recent_window_days) {
            return Err(AgentRankError::Validation(format!(
                "history.recent_window_days must be within 1-{}, got {}",
                MAX_RECENT_WINDOW_DAYS, self.history.recent_window_days
            )));
        }
        Ok(())
    }
}

/// Defaults for selection calls
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub max_agents: usize,
    pub min_score: u32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_agents: 5,
            min_score: 20,
        }
    }
}

/// Similarity thresholds for the semantic tiers
///
/// Calibrated for a short-text sentence model; retune per model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticTiers {
    pub high: f32,
    pub medium: f32,
    pub low: f32,
}

impl Default for SemanticTiers {
    fn default() -> Self {
        Self {
            high: 0.50,
            medium: 0.35,
            low: 0.25,
        }
    }
}

impl SemanticTiers {
    pub fn validate(&self) -> Result<()> {
        if !(self.low <= self.medium && self.medium <= self.high) {
            return Err(AgentRankError::Validation(format!(
                "semantic tiers must satisfy low <= medium <= high, got {} / {} / {}",
                self.low, self.medium, self.high
            )));
        }
        Ok(())
    }
}

/// Embedding backend settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Model name (see [`SUPPORTED_MODELS`])
    pub model: String,

    /// Where downloaded model files are cached
    pub cache_dir: PathBuf,

    pub show_download_progress: bool,

    /// Records embedded concurrently per background batch
    pub batch_size: usize,

    /// Hard wait for a task embedding before scoring proceeds without one
    pub task_timeout_ms: u64,

    /// Readiness polling interval
    pub poll_interval_ms: u64,

    /// Hard wait for the backend in the background index job
    pub ready_timeout_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        let cache_dir = dirs::cache_dir()
            .unwrap_or_else(|| PathBuf::from(".cache"))
            .join("agentrank")
            .join("models");

        Self {
            model: "all-MiniLM-L6-v2".to_string(),
            cache_dir,
            show_download_progress: false,
            batch_size: 10,
            task_timeout_ms: 3_000,
            poll_interval_ms: 100,
            ready_timeout_ms: 30_000,
        }
    }
}

impl EmbeddingConfig {
    pub fn validate(&self) -> Result<()> {
        if !SUPPORTED_MODELS.iter().any(|(name, _)| *name == self.model) {
            let names: Vec<&str> = SUPPORTED_MODELS.iter().map(|(name, _)| *name).collect();
            return Err(AgentRankError::Validation(format!(
                "Unsupported embedding model '{}'. Supported: {}",
                self.model,
                names.join(", ")
            )));
        }
        if self.batch_size == 0 {
            return Err(AgentRankError::Validation(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(AgentRankError::Validation(
                "embedding.poll_interval_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Vector length produced by the configured model
    pub fn dimensions(&self) -> usize {
        SUPPORTED_MODELS
            .iter()
            .find(|(name, _)| *name == self.model)
            .map(|(_, dims)| *dims)
            .unwrap_or(384)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_millis(self.ready_timeout_ms)
    }
}

/// Where the capability index lives inside a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub index_dir: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            index_dir: ".agentrank".to_string(),
        }
    }
}

impl IndexConfig {
    pub fn index_path(&self, project_root: &Path) -> PathBuf {
        project_root
            .join(&self.index_dir)
            .join("capabilities-index.json")
    }
}

/// History aggregation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub recent_window_days: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            recent_window_days: crate::history::DEFAULT_RECENT_WINDOW_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_validate() {
        let config = AgentRankConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.selection.max_agents, 5);
        assert_eq!(config.selection.min_score, 20);
        assert_eq!(config.embedding.dimensions(), 384);
    }

    #[test]
    fn test_unknown_model_rejected() {
        let config = EmbeddingConfig {
            model: "word2vec".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_history_window_bounds() {
        let mut config = AgentRankConfig::default();
        for days in [0, -1, MAX_RECENT_WINDOW_DAYS + 1, 1_000_000_000] {
            config.history.recent_window_days = days;
            assert!(config.validate().is_err(), "{} days should be rejected", days);
        }
        config.history.recent_window_days = MAX_RECENT_WINDOW_DAYS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_inverted_tiers_rejected() {
        let tiers = SemanticTiers {
            high: 0.2,
            medium: 0.35,
            low: 0.25,
        };
        assert!(tiers.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[selection]
max_agents = 3

[semantic]
high = 0.6
"#,
        )
        .unwrap();

        let config = AgentRankConfig::load(Some(&path)).unwrap();
        assert_eq!(config.selection.max_agents, 3);
        assert_eq!(config.selection.min_score, 20);
        assert!((config.semantic.high - 0.6).abs() < f32::EPSILON);
        assert!((config.semantic.medium - 0.35).abs() < f32::EPSILON);
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let config = AgentRankConfig::load(Some(&dir.path().join("absent.toml"))).unwrap();
        assert_eq!(config.index.index_dir, ".agentrank");
    }

    #[test]
    fn test_index_path() {
        let path = IndexConfig::default().index_path(Path::new("/work/app"));
        assert_eq!(
            path,
            PathBuf::from("/work/app/.agentrank/capabilities-index.json")
        );
    }
}
