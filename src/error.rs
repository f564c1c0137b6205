//! Error types for agentrank
//!
//! This module provides comprehensive error handling using thiserror for
//! structured error definitions and anyhow for error propagation.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for agentrank operations
#[derive(Error, Debug)]
pub enum AgentRankError {
    /// The agent definition directory is missing or unreadable
    #[error("Agent source unavailable at {path:?}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Embedding backend failed to load or to embed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// History store query failed
    #[error("History store error: {0}")]
    HistoryStore(String),

    /// Project profile detection failed
    #[error("Profile detection error: {0}")]
    Profile(String),

    /// Input failed validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A matching pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

/// Result type alias for agentrank operations
pub type Result<T> = std::result::Result<T, AgentRankError>;

/// Convert anyhow::Error to AgentRankError
impl From<anyhow::Error> for AgentRankError {
    fn from(err: anyhow::Error) -> Self {
        AgentRankError::Other(err.to_string())
    }
}
