//! Agent selection
//!
//! [`AgentSelector::select`] runs the full pipeline: load the capability
//! index, gather the project profile, usage history and task embedding, score
//! every candidate, then filter, deduplicate and rank. [`quick_select`] is a
//! separate cheap substring ranking with no thresholds, context or embeddings.

use crate::capabilities::{AgentSource, CapabilityExtractor, CapabilityIndexStore, GenerationOutcome, MarkdownAgentSource};
use crate::config::AgentRankConfig;
use crate::embeddings::{EmbeddingProvider, LocalModelLoader};
use crate::error::Result;
use crate::history::{HistoryStore, HistoryTracker, InMemoryHistoryStore};
use crate::profile::{ProjectProfileSource, StaticProfileSource};
use crate::scoring::{keyword, Scorer, ScoringContext};
use crate::types::{CapabilitiesIndex, CapabilityRecord, ProjectProfile, ScoredAgent, SelectionOptions, SelectionResult};
use crate::vocabulary::Vocabulary;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

const QUICK_KEYWORD_POINTS: u32 = 10;
const QUICK_NAME_PART_POINTS: u32 = 5;
const QUICK_DESCRIPTION_POINTS: u32 = 2;

/// Result entry of [`quick_select`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickMatch {
    pub agent: CapabilityRecord,
    pub score: u32,
}

/// Ranks a project's agents for free-text tasks
pub struct AgentSelector {
    project_root: PathBuf,
    project_name: String,
    agents_dir: PathBuf,
    config: AgentRankConfig,
    index: Arc<CapabilityIndexStore>,
    provider: Arc<EmbeddingProvider>,
    history: HistoryTracker,
    profiles: Arc<dyn ProjectProfileSource>,
    scorer: Scorer,
}

impl AgentSelector {
    pub fn builder(project_root: impl Into<PathBuf>, agents_dir: impl Into<PathBuf>) -> AgentSelectorBuilder {
        AgentSelectorBuilder {
            project_root: project_root.into(),
            agents_dir: agents_dir.into(),
            config: AgentRankConfig::default(),
            vocabulary: Vocabulary::standard(),
            source: None,
            provider: None,
            history_store: None,
            profiles: None,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn agents_dir(&self) -> &Path {
        &self.agents_dir
    }

    pub fn index_store(&self) -> &CapabilityIndexStore {
        &self.index
    }

    pub fn provider(&self) -> &EmbeddingProvider {
        &self.provider
    }

    /// Options seeded from the configured selection defaults
    pub fn default_options(&self) -> SelectionOptions {
        SelectionOptions {
            max_agents: self.config.selection.max_agents,
            min_score: self.config.selection.min_score,
            ..Default::default()
        }
    }

    /// Rank agents for `task`
    pub async fn select(&self, task: &str, options: &SelectionOptions) -> Result<SelectionResult> {
        let started = Instant::now();

        let index = self
            .index
            .load(&self.agents_dir, options.force_regenerate)
            .await?;

        let (profile, history, task_embedding) = tokio::join!(
            self.project_profile(),
            self.history.agent_history(
                &self.project_name,
                options.feature.as_deref(),
                options.time_range,
            ),
            self.provider.get_task_embedding(task),
        );

        let context = ScoringContext {
            task,
            task_embedding: task_embedding.as_deref(),
            profile: &profile,
            history: &history,
        };
        let scored = self.scorer.score_all(&index.agents, &context).await;
        let agents = rank(scored, options.min_score, options.max_agents);

        let result = SelectionResult {
            agents,
            profile,
            total_candidates: index.agents.len(),
            elapsed: started.elapsed(),
            used_semantic_matching: task_embedding.is_some(),
        };

        info!(
            "Selected {} of {} agents in {:?} (semantic: {})",
            result.agents.len(),
            result.total_candidates,
            result.elapsed,
            result.used_semantic_matching
        );
        Ok(result)
    }

    /// Load the capability index, building it when missing or stale
    pub async fn load_index(&self, force_regenerate: bool) -> Result<CapabilitiesIndex> {
        self.index.load(&self.agents_dir, force_regenerate).await
    }

    /// Cheap substring ranking over the cached index
    pub async fn quick_select(&self, task: &str, limit: usize) -> Result<Vec<QuickMatch>> {
        let index = self.index.load(&self.agents_dir, false).await?;
        Ok(quick_select(task, &index.agents, limit))
    }

    /// Wait for the background embedding job, if one was scheduled
    pub async fn wait_for_embeddings(&self) -> Option<GenerationOutcome> {
        self.index.wait_for_generation().await
    }

    async fn project_profile(&self) -> ProjectProfile {
        match self.profiles.profile(&self.project_root).await {
            Ok(profile) => profile,
            Err(e) => {
                debug!("Project profile unavailable, using an empty profile: {}", e);
                ProjectProfile::default()
            }
        }
    }
}

/// Builder for [`AgentSelector`]
///
/// Unset collaborators default to the markdown agent source, a local fastembed
/// model loaded on first use, an empty history store and an empty profile.
pub struct AgentSelectorBuilder {
    project_root: PathBuf,
    agents_dir: PathBuf,
    config: AgentRankConfig,
    vocabulary: Arc<Vocabulary>,
    source: Option<Arc<dyn AgentSource>>,
    provider: Option<Arc<EmbeddingProvider>>,
    history_store: Option<Arc<dyn HistoryStore>>,
    profiles: Option<Arc<dyn ProjectProfileSource>>,
}

impl AgentSelectorBuilder {
    pub fn config(mut self, config: AgentRankConfig) -> Self {
        self.config = config;
        self
    }

    pub fn vocabulary(mut self, vocabulary: Arc<Vocabulary>) -> Self {
        self.vocabulary = vocabulary;
        self
    }

    pub fn source(mut self, source: Arc<dyn AgentSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn provider(mut self, provider: Arc<EmbeddingProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn history_store(mut self, store: Arc<dyn HistoryStore>) -> Self {
        self.history_store = Some(store);
        self
    }

    pub fn profile_source(mut self, profiles: Arc<dyn ProjectProfileSource>) -> Self {
        self.profiles = Some(profiles);
        self
    }

    pub fn build(self) -> AgentSelector {
        let config = self.config;

        let provider = self.provider.unwrap_or_else(|| {
            Arc::new(EmbeddingProvider::new(
                Arc::new(LocalModelLoader::new(config.embedding.clone())),
                &config.embedding,
            ))
        });
        let source = self
            .source
            .unwrap_or_else(|| Arc::new(MarkdownAgentSource::new()));
        let history_store = self
            .history_store
            .unwrap_or_else(|| Arc::new(InMemoryHistoryStore::default()));
        let profiles = self
            .profiles
            .unwrap_or_else(|| Arc::new(StaticProfileSource::default()));

        let index = CapabilityIndexStore::new(
            config.index.index_path(&self.project_root),
            source,
            CapabilityExtractor::new(Arc::clone(&self.vocabulary)),
            Arc::clone(&provider),
        )
        .with_batch_size(config.embedding.batch_size)
        .with_ready_timeout(config.embedding.ready_timeout());

        let project_name = self
            .project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.project_root.display().to_string());

        AgentSelector {
            history: HistoryTracker::new(history_store, config.history.recent_window_days),
            scorer: Scorer::new(self.vocabulary, Arc::clone(&provider), config.semantic),
            project_root: self.project_root,
            project_name,
            agents_dir: self.agents_dir,
            index: Arc::new(index),
            provider,
            profiles,
            config,
        }
    }
}

/// Filter by `min_score`, keep the best entry per name, then take the top `max_agents`
///
/// Ties break by name so the ranking is fully deterministic.
pub fn rank(scored: Vec<ScoredAgent>, min_score: u32, max_agents: usize) -> Vec<ScoredAgent> {
    let mut best: HashMap<String, ScoredAgent> = HashMap::new();
    for candidate in scored.into_iter().filter(|s| s.score >= min_score) {
        match best.get(&candidate.agent.name) {
            Some(existing) if existing.score >= candidate.score => {}
            _ => {
                best.insert(candidate.agent.name.clone(), candidate);
            }
        }
    }

    let mut ranked: Vec<ScoredAgent> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.agent.name.cmp(&b.agent.name))
    });
    ranked.truncate(max_agents);
    ranked
}

/// Substring ranking: +10 per keyword, +5 per name part, +2 per description word
///
/// Zero scores are omitted and ties break by name.
pub fn quick_select(task: &str, records: &[CapabilityRecord], limit: usize) -> Vec<QuickMatch> {
    let task = task.to_lowercase();
    if task.trim().is_empty() {
        return Vec::new();
    }

    let mut best: HashMap<&str, QuickMatch> = HashMap::new();
    for record in records {
        let keyword_hits = record
            .keywords
            .iter()
            .filter(|k| task.contains(&k.to_lowercase()))
            .count() as u32;
        let name_hits = keyword::name_parts(&record.name)
            .iter()
            .filter(|p| task.contains(p.as_str()))
            .count() as u32;
        let description_hits = keyword::description_words(&record.description)
            .iter()
            .filter(|w| w.chars().count() > 3 && task.contains(w.as_str()))
            .count() as u32;

        let score = keyword_hits * QUICK_KEYWORD_POINTS
            + name_hits * QUICK_NAME_PART_POINTS
            + description_hits * QUICK_DESCRIPTION_POINTS;
        if score == 0 {
            continue;
        }
        match best.get(record.name.as_str()) {
            Some(existing) if existing.score >= score => {}
            _ => {
                best.insert(
                    record.name.as_str(),
                    QuickMatch {
                        agent: record.clone(),
                        score,
                    },
                );
            }
        }
    }

    let mut matches: Vec<QuickMatch> = best.into_values().collect();
    matches.sort_by_key(|m| (Reverse(m.score), m.agent.name.clone()));
    matches.truncate(limit);
    matches
}
