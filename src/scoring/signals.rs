//! Semantic, context, history and freshness signals

use crate::config::SemanticTiers;
use crate::types::{AgentSuccessHistory, CapabilityRecord, ProjectProfile, ProjectType};

pub const SEMANTIC_CAP: u32 = 15;
pub const CONTEXT_CAP: u32 = 30;
pub const HISTORY_CAP: u32 = 20;
pub const FRESHNESS_CAP: u32 = 10;

const TECH_MATCH_POINTS: u32 = 5;
const MAX_TECH_MATCHES: usize = 3;
const PROJECT_TYPE_POINTS: u32 = 15;
const FULLSTACK_PARTIAL_POINTS: u32 = 8;
const FEATURE_MATCH_POINTS: f64 = 5.0;
const HISTORY_WEIGHT: f64 = 0.15;

/// Discretize a cosine similarity; every threshold is exclusive
pub fn semantic_tier(similarity: f32, tiers: &SemanticTiers) -> u32 {
    if !similarity.is_finite() {
        0
    } else if similarity > tiers.high {
        SEMANTIC_CAP
    } else if similarity > tiers.medium {
        10
    } else if similarity > tiers.low {
        5
    } else {
        0
    }
}

/// Context boost and the tech tags that produced it
pub fn context_boost(record: &CapabilityRecord, profile: &ProjectProfile) -> (u32, Vec<String>) {
    let matched_tech: Vec<String> = record
        .tech_stack
        .iter()
        .filter(|tech| profile.tech_stack.contains(&tech.to_lowercase()))
        .cloned()
        .collect();

    let mut boost = TECH_MATCH_POINTS * matched_tech.len().min(MAX_TECH_MATCHES) as u32;

    if let Some(project_type) = profile.project_type {
        if record.project_types.contains(&project_type) {
            boost += PROJECT_TYPE_POINTS;
        } else if record.project_types.contains(&ProjectType::Fullstack) {
            boost += FULLSTACK_PARTIAL_POINTS;
        }
    }

    (boost.min(CONTEXT_CAP), matched_tech)
}

pub fn history_boost(history: Option<&AgentSuccessHistory>) -> u32 {
    let Some(history) = history else {
        return 0;
    };

    let feature = if history.feature_matched {
        FEATURE_MATCH_POINTS
    } else {
        0.0
    };
    let boost = history.success_score as f64 * HISTORY_WEIGHT + feature;
    (boost.round() as u32).min(HISTORY_CAP)
}

pub fn freshness_bonus(history: Option<&AgentSuccessHistory>) -> u32 {
    match history.map_or(0, |h| h.recent_uses) {
        n if n > 5 => FRESHNESS_CAP,
        n if n > 2 => 7,
        n if n > 0 => 4,
        _ => 0,
    }
}
