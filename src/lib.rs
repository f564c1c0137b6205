//! agentrank - Explainable Agent Relevance Ranking
//!
//! Given a free-text task and a catalog of specialized agent definitions,
//! produces a bounded, score-sorted shortlist of the most relevant agents:
//! - Whole-word keyword matching over extracted capabilities
//! - Optional semantic similarity from a lazily loaded local embedding model
//! - Project context (tech stack, project type) and usage history boosts
//! - A transparent per-signal breakdown for every result
//!
//! # Architecture
//!
//! The system is organized into several layers:
//! - **Vocabulary**: Immutable keyword, technology and stopword tables
//! - **Capabilities**: Agent sources, extraction and the two-phase index
//! - **Embeddings**: Lazy embedding provider with a per-agent cache
//! - **History / Profile**: External usage records and project context
//! - **Scoring / Selector**: Multi-signal scoring and the ranking pipeline
//!
//! # Example
//!
//! ```ignore
//! use agentrank_core::{AgentSelector, SelectionOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let selector = AgentSelector::builder(".", "./agents").build();
//!
//!     let result = selector
//!         .select("Audit the auth service for vulnerabilities", &SelectionOptions::default())
//!         .await?;
//!
//!     for scored in &result.agents {
//!         println!("{} {}", scored.score, scored.agent.name);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod capabilities;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod history;
pub mod profile;
pub mod scoring;
pub mod selector;
pub mod types;
pub mod vocabulary;

// Re-export commonly used types
pub use capabilities::{
    AgentSource, CapabilityExtractor, CapabilityIndexStore, GenerationHandle, GenerationOutcome,
    MarkdownAgentSource, INDEX_VERSION,
};
pub use config::AgentRankConfig;
pub use embeddings::{EmbeddingBackendLoader, EmbeddingProvider, EmbeddingService};
pub use error::{AgentRankError, Result};
pub use history::{HistoryRecord, HistoryStore, HistoryTracker, InMemoryHistoryStore, JsonFileHistoryStore};
pub use profile::{ProjectProfileSource, StaticProfileSource};
pub use scoring::Scorer;
pub use selector::{quick_select, AgentSelector, QuickMatch};
pub use types::{
    AgentDefinition, AgentSuccessHistory, CapabilitiesIndex, CapabilityRecord, ProjectProfile,
    ProjectType, ScoreBreakdown, ScoredAgent, SelectionOptions, SelectionResult, TimeRange,
};
pub use vocabulary::Vocabulary;
