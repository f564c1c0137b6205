//! Multi-signal candidate scoring
//!
//! Five capped components are summed and rescaled to 0-100:
//!
//! | signal    | cap |
//! |-----------|-----|
//! | keyword   | 40  |
//! | semantic  | 15  |
//! | context   | 30  |
//! | history   | 20  |
//! | freshness | 10  |
//!
//! `total = round(min(raw / 115, 1) * 100)`

pub mod keyword;
pub mod signals;

pub use keyword::{contains_whole_word, keyword_match, KeywordMatch};
pub use signals::{context_boost, freshness_bonus, history_boost, semantic_tier};

use crate::config::SemanticTiers;
use crate::embeddings::EmbeddingProvider;
use crate::error::{AgentRankError, Result};
use crate::types::{AgentSuccessHistory, CapabilityRecord, ProjectProfile, ScoreBreakdown, ScoredAgent};
use crate::vocabulary::Vocabulary;
use futures::future::join_all;
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::debug;

/// Sum of all component caps
pub const RAW_MAX: u32 = 115;

/// Rescale a raw component sum to 0-100
pub fn normalize(raw: u32) -> u32 {
    let ratio = (raw as f64 / RAW_MAX as f64).min(1.0);
    (ratio * 100.0).round() as u32
}

/// Snapshot every candidate is scored against
#[derive(Debug, Clone, Copy)]
pub struct ScoringContext<'a> {
    pub task: &'a str,
    pub task_embedding: Option<&'a [f32]>,
    pub profile: &'a ProjectProfile,
    pub history: &'a HashMap<String, AgentSuccessHistory>,
}

/// Scores capability records against a task
#[derive(Clone)]
pub struct Scorer {
    vocabulary: Arc<Vocabulary>,
    provider: Arc<EmbeddingProvider>,
    tiers: SemanticTiers,
}

impl Scorer {
    pub fn new(vocabulary: Arc<Vocabulary>, provider: Arc<EmbeddingProvider>, tiers: SemanticTiers) -> Self {
        Self {
            vocabulary,
            provider,
            tiers,
        }
    }

    /// Score a single candidate
    pub async fn score_candidate(
        &self,
        record: &CapabilityRecord,
        context: &ScoringContext<'_>,
    ) -> Result<ScoredAgent> {
        if record.name.trim().is_empty() {
            return Err(AgentRankError::Validation(format!(
                "capability record without a name ({:?})",
                record.file_path
            )));
        }

        let keywords = keyword_match(context.task, record, &self.vocabulary);

        let similarity = match context.task_embedding {
            Some(task_vector) => self
                .candidate_embedding(record)
                .await
                .map(|vector| crate::embeddings::cosine_similarity(task_vector, &vector)),
            None => None,
        };
        let semantic_match = similarity.map_or(0, |s| semantic_tier(s, &self.tiers));

        let (context_boost, matched_tech) = context_boost(record, context.profile);
        let history = context.history.get(&record.name);

        let mut breakdown = ScoreBreakdown {
            keyword_match: keywords.score,
            semantic_match,
            context_boost,
            history_boost: history_boost(history),
            freshness_bonus: freshness_bonus(history),
            total: 0,
            matched_keywords: keywords.matched,
            matched_tech,
            similarity,
        };

        let raw = breakdown.keyword_match
            + breakdown.semantic_match
            + breakdown.context_boost
            + breakdown.history_boost
            + breakdown.freshness_bonus;
        breakdown.total = normalize(raw);

        Ok(ScoredAgent {
            agent: record.clone(),
            score: breakdown.total,
            breakdown,
        })
    }

    /// Score all candidates concurrently, dropping any that fail or panic
    pub async fn score_all(
        &self,
        records: &[CapabilityRecord],
        context: &ScoringContext<'_>,
    ) -> Vec<ScoredAgent> {
        let outcomes = join_all(
            records
                .iter()
                .map(|record| AssertUnwindSafe(self.score_candidate(record, context)).catch_unwind()),
        )
        .await;

        records
            .iter()
            .zip(outcomes)
            .filter_map(|(record, outcome)| match outcome {
                Ok(Ok(scored)) => Some(scored),
                Ok(Err(e)) => {
                    debug!("Dropping candidate {:?}: {}", record.name, e);
                    None
                }
                Err(_) => {
                    debug!("Scoring panicked for candidate {:?}", record.name);
                    None
                }
            })
            .collect()
    }

    /// Precomputed vector first, then the provider
    async fn candidate_embedding(&self, record: &CapabilityRecord) -> Option<Arc<Vec<f32>>> {
        if let Some(vector) = record.embedding.as_ref().filter(|v| !v.is_empty()) {
            return Some(Arc::new(vector.clone()));
        }
        self.provider
            .get_embedding(&record.name, &record.embedding_text())
            .await
    }
}
