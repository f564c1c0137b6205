//! Core data types for agentrank
//!
//! This module defines the fundamental data structures used throughout the
//! crate: raw agent definitions, capability records, the persisted index,
//! project profiles, usage history and the scored selection output. The
//! serialized field names of the index and of [`ScoreBreakdown`] are relied on
//! by reporting layers, so they are pinned with `rename_all = "camelCase"`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

/// Structural classification of a codebase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProjectType {
    /// Several packages managed in one repository
    Monorepo,

    /// A single package
    Single,

    /// Server-side service
    Backend,

    /// Client-side application
    Frontend,

    /// Frontend and backend in one codebase
    Fullstack,
}

impl ProjectType {
    /// Get the lowercase name used in config files and CLI flags
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectType::Monorepo => "monorepo",
            ProjectType::Single => "single",
            ProjectType::Backend => "backend",
            ProjectType::Frontend => "frontend",
            ProjectType::Fullstack => "fullstack",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ProjectType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "monorepo" => Ok(ProjectType::Monorepo),
            "single" => Ok(ProjectType::Single),
            "backend" => Ok(ProjectType::Backend),
            "frontend" => Ok(ProjectType::Frontend),
            "fullstack" | "full-stack" => Ok(ProjectType::Fullstack),
            other => Err(format!("unknown project type: '{}'", other)),
        }
    }
}

/// Raw agent definition handed over by an [`AgentSource`](crate::capabilities::AgentSource)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub description: String,
    pub category: String,
    pub plugin_id: String,
    pub file_path: PathBuf,
    pub model: Option<String>,

    /// Prompt body below the frontmatter
    #[serde(default)]
    pub body: String,
}

/// Structured summary of an agent's declared expertise used for matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilityRecord {
    pub name: String,
    pub description: String,
    pub category: String,
    pub plugin_id: String,

    /// Domain keywords found in the agent text
    pub keywords: Vec<String>,

    /// Technologies the agent text mentions
    pub tech_stack: Vec<String>,

    /// Project shapes the agent is suited for
    pub project_types: Vec<ProjectType>,

    /// Preferred model, if the definition declares one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    pub file_path: PathBuf,

    /// Precomputed embedding; `None` means keyword-only matching for this record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl CapabilityRecord {
    /// Text embedded for semantic matching
    pub fn embedding_text(&self) -> String {
        format!("{}: {}", self.name, self.description)
    }
}

/// Persisted, versioned catalog of capability records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapabilitiesIndex {
    pub version: String,
    pub generated_at: DateTime<Utc>,
    pub agents_path: String,
    pub total_agents: usize,
    pub agents: Vec<CapabilityRecord>,
}

impl CapabilitiesIndex {
    /// Number of records that carry an embedding
    pub fn embedded_count(&self) -> usize {
        self.agents.iter().filter(|a| a.embedding.is_some()).count()
    }
}

/// External summary of a codebase's technology stack and structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectProfile {
    /// Lowercase technology names
    pub tech_stack: BTreeSet<String>,

    /// `None` when the detector could not classify the project
    pub project_type: Option<ProjectType>,
}

impl ProjectProfile {
    pub fn new<I, S>(tech_stack: I, project_type: Option<ProjectType>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            tech_stack: tech_stack
                .into_iter()
                .map(|t| t.as_ref().trim().to_lowercase())
                .filter(|t| !t.is_empty())
                .collect(),
            project_type,
        }
    }
}

/// Aggregated usage statistics of one agent on one project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSuccessHistory {
    pub agent_name: String,
    pub total_uses: u32,

    /// Uses inside the recent window (30 days by default)
    pub recent_uses: u32,

    /// Sorted feature tags seen alongside this agent
    pub features: Vec<String>,

    /// Derived score in [0, 100]
    pub success_score: u32,

    /// Whether the requested feature filter matched this agent's features
    #[serde(default)]
    pub feature_matched: bool,
}

/// Inclusive time window for history queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.since.map_or(true, |s| at >= s) && self.until.map_or(true, |u| at <= u)
    }
}

/// Transparent per-signal score explanation
///
/// Field names are a stable contract for human and machine readable reports.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    /// 0-40
    pub keyword_match: u32,
    /// 0-15
    pub semantic_match: u32,
    /// 0-30
    pub context_boost: u32,
    /// 0-20
    pub history_boost: u32,
    /// 0-10
    pub freshness_bonus: u32,
    /// 0-100, normalized
    pub total: u32,
    pub matched_keywords: Vec<String>,
    pub matched_tech: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

/// Capability record together with its score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredAgent {
    pub agent: CapabilityRecord,
    pub score: u32,
    pub breakdown: ScoreBreakdown,
}

/// Bounded, ranked output of one selection call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionResult {
    pub agents: Vec<ScoredAgent>,
    pub profile: ProjectProfile,

    /// Number of candidates scored before filtering
    pub total_candidates: usize,

    #[serde(with = "serde_duration_millis")]
    pub elapsed: Duration,

    pub used_semantic_matching: bool,
}

/// Knobs for one selection call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionOptions {
    pub max_agents: usize,
    pub min_score: u32,

    /// Feature the task belongs to, used for history affinity
    pub feature: Option<String>,

    /// Restrict history to this window
    pub time_range: TimeRange,

    /// Ignore any cached index and rebuild it
    pub force_regenerate: bool,
}

impl Default for SelectionOptions {
    fn default() -> Self {
        Self {
            max_agents: 5,
            min_score: 20,
            feature: None,
            time_range: TimeRange::default(),
            force_regenerate: false,
        }
    }
}

// Serialize/deserialize Duration as milliseconds
mod serde_duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
